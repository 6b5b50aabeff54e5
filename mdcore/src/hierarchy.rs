//! Operations on group hierarchies.
//!
//! Objects are addressed by full names such as `/group/sub/array`, which are resolved from the root group.
//! [`resolve_array`] additionally finds an array by its bare name, searching outward from a starting group.
//!
//! [`copy_into`] copies a whole group tree into another group, possibly of a different backend.
//! [`tree`] renders a hierarchy as an indented string.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::array::{ArrayError, ArrayRef, MdArray, copy_array_data};
use crate::data_type::copy_value;
use crate::dimension::Dimension;
use crate::group::{GroupError, GroupRef, MdGroup};
use crate::options::CopyOptions;
use crate::progress::Progress;
use crate::join_full_name;

/// The fixed copy cost of an object (group, dimension, array or attribute) in bytes.
pub const COPY_COST: u64 = 1000;

/// Split a full name into its non-empty path components.
fn components(full_name: &str) -> Result<Vec<&str>, GroupError> {
    if !full_name.starts_with('/') {
        return Err(GroupError::InvalidName(full_name.to_string()));
    }
    Ok(full_name.split('/').filter(|c| !c.is_empty()).collect())
}

/// Split a full name into the full name of its group and its name.
fn split_full_name(full_name: &str) -> Result<(&str, &str), GroupError> {
    match full_name.rsplit_once('/') {
        Some((parent, name)) if full_name.starts_with('/') && !name.is_empty() => {
            Ok((if parent.is_empty() { "/" } else { parent }, name))
        }
        _ => Err(GroupError::InvalidName(full_name.to_string())),
    }
}

/// Open the group with full name `full_name` below `root`.
///
/// # Errors
/// Returns [`GroupError::NotFound`] if any group along the path does not exist, or [`GroupError::InvalidName`] if `full_name` is not absolute.
pub fn open_group_from_full_name(root: &GroupRef, full_name: &str) -> Result<GroupRef, GroupError> {
    let mut group = root.clone();
    for component in components(full_name)? {
        group = group
            .open_group(component)?
            .ok_or_else(|| GroupError::NotFound(full_name.to_string()))?;
    }
    Ok(group)
}

/// Open the array with full name `full_name` below `root`.
///
/// # Errors
/// Returns [`GroupError::NotFound`] if the array or any group along its path does not exist.
pub fn open_array_from_full_name(root: &GroupRef, full_name: &str) -> Result<ArrayRef, GroupError> {
    let (group, name) = split_full_name(full_name)?;
    open_group_from_full_name(root, group)
        .map_err(|_| GroupError::NotFound(full_name.to_string()))?
        .open_array(name)?
        .ok_or_else(|| GroupError::NotFound(full_name.to_string()))
}

/// Open the dimension with full name `full_name` below `root`.
///
/// # Errors
/// Returns [`GroupError::NotFound`] if the dimension or any group along its path does not exist.
pub fn open_dimension_from_full_name(
    root: &GroupRef,
    full_name: &str,
) -> Result<Arc<Dimension>, GroupError> {
    let (group, name) = split_full_name(full_name)?;
    open_group_from_full_name(root, group)
        .map_err(|_| GroupError::NotFound(full_name.to_string()))?
        .dimensions()?
        .into_iter()
        .find(|dimension| dimension.name() == name)
        .ok_or_else(|| GroupError::NotFound(full_name.to_string()))
}

/// Search `start` and its descendants breadth-first for the array `name`, skipping groups in `visited`.
fn search_descendants(
    start: GroupRef,
    name: &str,
    visited: &mut HashSet<String>,
) -> Result<Option<ArrayRef>, GroupError> {
    let mut queue = VecDeque::from([start]);
    while let Some(group) = queue.pop_front() {
        if !visited.insert(group.full_name()) {
            continue;
        }
        if let Some(array) = group.open_array(name)? {
            return Ok(Some(array));
        }
        for group_name in group.group_names()? {
            if let Some(child) = group.open_group(&group_name)? {
                queue.push_back(child);
            }
        }
    }
    Ok(None)
}

/// Find the array `name`, starting from the group with full name `starting_path`.
///
/// A full name (starting with `/`) is opened directly.
/// Otherwise the starting group and its descendants are searched breadth-first, then those of each ancestor in turn up to the root.
/// The first match is returned.
///
/// # Errors
/// Returns a [`GroupError`] if `starting_path` does not name a group or a group cannot be enumerated.
pub fn resolve_array(
    root: &GroupRef,
    name: &str,
    starting_path: &str,
) -> Result<Option<ArrayRef>, GroupError> {
    if name.starts_with('/') {
        return match open_array_from_full_name(root, name) {
            Ok(array) => Ok(Some(array)),
            Err(GroupError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        };
    }

    let mut path = components(starting_path)?;
    let mut visited = HashSet::new();
    loop {
        let full_name = format!("/{}", path.join("/"));
        let group = open_group_from_full_name(root, &full_name)?;
        let found = if let Some((relative_path, array_name)) = name.rsplit_once('/') {
            // a relative path is looked up from each group without a descendant search
            let group_full_name = join_full_name(&full_name, relative_path);
            open_group_from_full_name(root, &group_full_name)
                .ok()
                .map(|group| group.open_array(array_name))
                .transpose()?
                .flatten()
        } else {
            search_descendants(group, name, &mut visited)?
        };
        if found.is_some() {
            return Ok(found);
        }
        if path.pop().is_none() {
            return Ok(None);
        }
    }
}

/// The full names of all arrays in `group` and its descendants, depth-first.
///
/// # Errors
/// Returns a [`GroupError`] if a group cannot be enumerated.
pub fn array_full_names_recursive(group: &dyn MdGroup) -> Result<Vec<String>, GroupError> {
    let mut full_names = Vec::new();
    for name in group.array_names()? {
        if let Some(array) = group.open_array(&name)? {
            full_names.push(array.full_name());
        }
    }
    for name in group.group_names()? {
        if let Some(child) = group.open_group(&name)? {
            full_names.extend(array_full_names_recursive(child.as_ref())?);
        }
    }
    Ok(full_names)
}

/// Create a string representation of the hierarchy below `group`.
///
/// Each line holds an object name indented by its depth, arrays followed by their shape and value type.
///
/// # Errors
/// Returns a [`GroupError`] if a group cannot be enumerated.
pub fn tree(group: &dyn MdGroup) -> Result<String, GroupError> {
    fn tree_of(group: &dyn MdGroup, depth: usize, s: &mut String) -> Result<(), GroupError> {
        enum Child {
            Array(ArrayRef),
            Group(GroupRef),
        }
        let mut children = BTreeMap::new();
        for name in group.array_names()? {
            if let Some(array) = group.open_array(&name)? {
                children.insert(name, Child::Array(array));
            }
        }
        for name in group.group_names()? {
            if let Some(child) = group.open_group(&name)? {
                children.insert(name, Child::Group(child));
            }
        }
        for (name, child) in children {
            s.push_str(&" ".repeat(depth * 2));
            match child {
                Child::Array(array) => {
                    s.push_str(&format!(
                        "{} {:?} {}\n",
                        name,
                        array.shape(),
                        array.value_type()
                    ));
                }
                Child::Group(child) => {
                    s.push_str(&name);
                    s.push('\n');
                    tree_of(child.as_ref(), depth + 1, s)?;
                }
            }
        }
        Ok(())
    }

    let mut s = group.full_name();
    s.push('\n');
    tree_of(group, 1, &mut s)?;
    Ok(s)
}

fn array_copy_cost(array: &dyn MdArray) -> u64 {
    let attributes = u64::try_from(array.attributes().len()).unwrap_or(u64::MAX);
    let size = u64::try_from(array.value_type().size()).unwrap_or(u64::MAX);
    COPY_COST
        .saturating_add(attributes.saturating_mul(COPY_COST))
        .saturating_add(array.total_elements().saturating_mul(size))
}

/// The estimated cost of copying `group` and its descendants with [`copy_into`].
///
/// The cost is the number of bytes of array data plus [`COPY_COST`] per group, dimension, array and attribute.
///
/// # Errors
/// Returns a [`GroupError`] if a group cannot be enumerated.
pub fn total_copy_cost(group: &dyn MdGroup) -> Result<u64, GroupError> {
    let objects = u64::try_from(group.dimensions()?.len() + group.attributes().len())
        .unwrap_or(u64::MAX);
    let mut cost = COPY_COST.saturating_add(objects.saturating_mul(COPY_COST));
    for name in group.array_names()? {
        if let Some(array) = group.open_array(&name)? {
            cost = cost.saturating_add(array_copy_cost(array.as_ref()));
        }
    }
    for name in group.group_names()? {
        if let Some(child) = group.open_group(&name)? {
            cost = cost.saturating_add(total_copy_cost(child.as_ref())?);
        }
    }
    Ok(cost)
}

/// Copy the metadata and data of `src` into `dst`.
///
/// Attributes, nodata, scale, offset, unit and spatial reference are copied before the data.
///
/// # Errors
/// Returns an [`ArrayError`] if any metadata or data cannot be copied, or `progress` aborts the copy.
pub fn copy_array_into(
    dst: &dyn MdArray,
    src: &dyn MdArray,
    options: &CopyOptions,
    progress: &mut Progress,
) -> Result<(), ArrayError> {
    for (name, value) in src.attributes() {
        dst.set_attribute(&name, value)?;
    }
    if let Some(nodata) = src.raw_nodata() {
        let mut dst_nodata = vec![0; dst.value_type().size()];
        copy_value(&nodata, src.value_type(), &mut dst_nodata, dst.value_type())?;
        dst.set_raw_nodata(Some(&dst_nodata))?;
    }
    if let Some(scale) = src.scale() {
        dst.set_scale(Some(scale))?;
    }
    if let Some(offset) = src.offset() {
        dst.set_offset(Some(offset))?;
    }
    let unit = src.unit();
    if !unit.is_empty() {
        dst.set_unit(&unit)?;
    }
    if let Some(spatial_ref) = src.spatial_ref() {
        dst.set_spatial_ref(Some(spatial_ref))?;
    }
    copy_array_data(dst, src, options, progress)
}

/// The running state of a tree copy.
struct TreeCopy<'a, 'p> {
    options: &'a CopyOptions,
    progress: &'a mut Progress<'p>,
    /// The destination dimensions, keyed by their source full name.
    dimensions: BTreeMap<String, Arc<Dimension>>,
    done: u64,
    total: u64,
}

impl TreeCopy<'_, '_> {
    #[allow(clippy::cast_precision_loss)]
    fn fraction(&self, done: u64) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            done as f64 / self.total as f64
        }
    }

    /// Account for `cost` copied bytes and report progress.
    fn advance(&mut self, cost: u64) -> Result<(), GroupError> {
        self.done = self.done.saturating_add(cost);
        if self.progress.report(self.fraction(self.done), "copying hierarchy") {
            Ok(())
        } else {
            Err(GroupError::Aborted)
        }
    }

    /// Handle the failure to copy a child: fail in strict mode, otherwise warn and continue.
    fn skip(&self, what: &str, err: GroupError) -> Result<(), GroupError> {
        if self.options.strict || matches!(err, GroupError::Aborted) {
            Err(err)
        } else {
            log::warn!("skipping {what}: {err}");
            Ok(())
        }
    }

    fn copy_group(&mut self, dst: &GroupRef, src: &GroupRef) -> Result<(), GroupError> {
        src.check_valid()?;
        dst.check_valid()?;

        let src_full_name = src.full_name();
        let mut indexing_variables: BTreeMap<String, String> = BTreeMap::new();
        for dimension in src.dimensions()? {
            if let Some(variable) = dimension.indexing_variable()
                && variable.full_name() == join_full_name(&src_full_name, &variable.name())
            {
                indexing_variables.insert(variable.name(), dimension.full_name());
            }
            match dst.create_dimension(
                &dimension.name(),
                dimension.dimension_type(),
                dimension.direction(),
                dimension.size(),
            ) {
                Ok(dst_dimension) => {
                    self.dimensions
                        .insert(dimension.full_name(), dst_dimension);
                }
                Err(err) => {
                    self.skip(
                        &format!("dimension {} of {src_full_name}", dimension.name()),
                        err,
                    )?;
                    // arrays fall back to a compatible dimension already in the destination
                }
            }
            self.advance(COPY_COST)?;
        }

        for (name, value) in src.attributes() {
            if let Err(err) = dst.set_attribute(&name, value) {
                self.skip(&format!("attribute {name} of {src_full_name}"), err)?;
            }
            self.advance(COPY_COST)?;
        }

        let array_names = src.array_names()?;
        let (indexing, others): (Vec<&String>, Vec<&String>) = array_names
            .iter()
            .partition(|name| indexing_variables.contains_key(*name));
        let mut failures = 0;
        for name in indexing.iter().chain(&others) {
            let Some(array) = src.open_array(name)? else {
                continue;
            };
            let cost = array_copy_cost(array.as_ref());
            let result = self.copy_array(dst, &array, cost).and_then(
                |dst_array| {
                    if let Some(dimension) = indexing_variables
                        .get(*name)
                        .and_then(|full_name| self.dimensions.get(full_name))
                    {
                        dimension.set_indexing_variable(Some(&dst_array))?;
                    }
                    Ok(())
                },
            );
            if let Err(err) = result {
                failures += 1;
                if dst.open_array(name).ok().flatten().is_some()
                    && let Err(delete_err) = dst.delete_array(name)
                {
                    log::warn!("failed to delete partially copied array {name}: {delete_err}");
                }
                self.skip(&format!("array {}", array.full_name()), err)?;
            }
            self.done = self.done.saturating_add(cost);
        }
        if failures > 0 && failures == array_names.len() {
            return Err(GroupError::CopyFailed(format!(
                "every array of {src_full_name}"
            )));
        }

        for name in src.group_names()? {
            let Some(src_child) = src.open_group(&name)? else {
                continue;
            };
            let result = dst
                .create_group_with_options(&name, &self.options.extensions)
                .and_then(|dst_child| self.copy_group(&dst_child, &src_child));
            if let Err(err) = result {
                self.skip(&format!("group {}", src_child.full_name()), err)?;
            }
        }
        self.advance(COPY_COST)
    }

    fn copy_array(
        &mut self,
        dst: &GroupRef,
        src: &ArrayRef,
        cost: u64,
    ) -> Result<ArrayRef, GroupError> {
        let mut dst_dimensions = Vec::new();
        for dimension in src.dimensions() {
            let dst_dimension = match self.dimensions.get(&dimension.full_name()) {
                Some(dst_dimension) => dst_dimension.clone(),
                None => {
                    // a dimension declared outside of the copied group
                    let existing = dst
                        .dimensions()?
                        .into_iter()
                        .find(|d| d.name() == dimension.name() && d.size() == dimension.size());
                    let dst_dimension = match existing {
                        Some(existing) => existing,
                        None => dst.create_dimension(
                            &dimension.name(),
                            dimension.dimension_type(),
                            dimension.direction(),
                            dimension.size(),
                        )?,
                    };
                    self.dimensions
                        .insert(dimension.full_name(), dst_dimension.clone());
                    dst_dimension
                }
            };
            dst_dimensions.push(dst_dimension);
        }

        let dst_array = dst.create_array_with_options(
            &src.name(),
            &dst_dimensions,
            src.value_type().clone(),
            &self.options.extensions,
        )?;
        let start = self.fraction(self.done);
        let end = self.fraction(self.done.saturating_add(cost));
        let mut progress = self.progress.scaled(start, end);
        match copy_array_into(dst_array.as_ref(), src.as_ref(), self.options, &mut progress) {
            Ok(()) => Ok(dst_array),
            Err(ArrayError::Aborted) => Err(GroupError::Aborted),
            Err(err) => Err(err.into()),
        }
    }
}

/// Copy the dimensions, attributes, arrays and sub-groups of `src` into `dst`, recursively.
///
/// Within each group, dimensions are copied first, then attributes, then the arrays indexing a dimension of the group, then the other arrays, then sub-groups.
/// Progress is reported as the fraction of the [total copy cost](total_copy_cost) copied so far.
///
/// If [`CopyOptions::strict`] is false, children that fail to copy are logged, removed from `dst` and skipped.
/// A dimension that cannot be created is skipped too; arrays using it reuse a destination dimension with the same name and size.
/// The copy still fails if no array of a group could be copied.
///
/// # Errors
/// Returns a [`GroupError`] if
///  - a copy fails in strict mode,
///  - every array of a group fails to copy,
///  - `progress` aborts the copy ([`GroupError::Aborted`]).
///
/// `dst` may be partially populated on error.
pub fn copy_into(
    dst: &GroupRef,
    src: &GroupRef,
    options: &CopyOptions,
    progress: &mut Progress,
) -> Result<(), GroupError> {
    let total = total_copy_cost(src.as_ref())?;
    let mut copy = TreeCopy {
        options,
        progress,
        dimensions: BTreeMap::new(),
        done: 0,
        total,
    };
    copy.copy_group(dst, src)?;
    if copy.progress.report(1.0, "copying hierarchy") {
        Ok(())
    } else {
        Err(GroupError::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use crate::data_type::NumericKind;
    use crate::memory::MemoryGroup;

    use super::*;

    fn hierarchy() -> GroupRef {
        let root: GroupRef = MemoryGroup::new_root();
        let x = root.create_dimension("x", "", "", 4).unwrap();
        root.create_array("a", &[x.clone()], NumericKind::Float32.into())
            .unwrap();
        let group = root.create_group("group").unwrap();
        let sub = group.create_group("sub").unwrap();
        sub.create_array("b", &[x.clone(), x], NumericKind::UInt8.into())
            .unwrap();
        root
    }

    #[test]
    fn hierarchy_open_from_full_name() {
        let root = hierarchy();
        assert_eq!(
            open_group_from_full_name(&root, "/group/sub")
                .unwrap()
                .full_name(),
            "/group/sub"
        );
        assert_eq!(open_group_from_full_name(&root, "/").unwrap().full_name(), "/");
        assert_eq!(
            open_array_from_full_name(&root, "/group/sub/b")
                .unwrap()
                .full_name(),
            "/group/sub/b"
        );
        assert_eq!(
            open_dimension_from_full_name(&root, "/x").unwrap().size(),
            4
        );
        assert!(matches!(
            open_array_from_full_name(&root, "/missing/b"),
            Err(GroupError::NotFound(_))
        ));
        assert!(matches!(
            open_group_from_full_name(&root, "group"),
            Err(GroupError::InvalidName(_))
        ));
    }

    #[test]
    fn hierarchy_array_full_names() {
        let root = hierarchy();
        assert_eq!(
            array_full_names_recursive(root.as_ref()).unwrap(),
            vec!["/a", "/group/sub/b"]
        );
    }

    #[test]
    fn hierarchy_tree() {
        let root = hierarchy();
        assert_eq!(
            tree(root.as_ref()).unwrap(),
            "/\n  a [4] float32\n  group\n    sub\n      b [4, 4] uint8\n"
        );
    }

    #[test]
    fn hierarchy_total_copy_cost() {
        let root = hierarchy();
        root.set_attribute("title", "t".into()).unwrap();
        // 3 groups, 1 dimension, 1 attribute, 2 arrays
        assert_eq!(
            total_copy_cost(root.as_ref()).unwrap(),
            7 * COPY_COST + 4 * 4 + 16
        );
    }
}
