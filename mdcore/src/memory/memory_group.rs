//! An in-memory group.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::array::{ArrayRef, MdArray};
use crate::data_type::ValueType;
use crate::dimension::Dimension;
use crate::group::{GroupError, GroupRef, MdGroup, validate_name};
use crate::options::ExtensionOptions;
use crate::storage::SidecarStorage;
use crate::{Attributes, join_full_name};

use super::MemoryArray;

#[derive(Debug, Default)]
struct MemoryGroupChildren {
    groups: BTreeMap<String, Arc<MemoryGroup>>,
    arrays: BTreeMap<String, ArrayRef>,
    dimensions: Vec<Arc<Dimension>>,
}

impl MemoryGroupChildren {
    fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name) || self.arrays.contains_key(name)
    }
}

/// An in-memory group.
///
/// Sub-groups and arrays share one namespace per group. Dimensions have their own.
/// Deleting a group invalidates every group, array and dimension below it.
#[derive(Debug)]
pub struct MemoryGroup {
    this: Weak<MemoryGroup>,
    parent: Weak<MemoryGroup>,
    name: RwLock<String>,
    full_name: RwLock<String>,
    attributes: RwLock<Attributes>,
    children: RwLock<MemoryGroupChildren>,
    sidecar: Option<SidecarStorage>,
    valid: AtomicBool,
}

impl MemoryGroup {
    fn new_child(
        parent: Weak<MemoryGroup>,
        name: &str,
        full_name: String,
        sidecar: Option<SidecarStorage>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            parent,
            name: RwLock::new(name.to_string()),
            full_name: RwLock::new(full_name),
            attributes: RwLock::default(),
            children: RwLock::default(),
            sidecar,
            valid: AtomicBool::new(true),
        })
    }

    /// Create a new root group.
    #[must_use]
    pub fn new_root() -> Arc<Self> {
        Self::new_child(Weak::new(), "/", "/".to_string(), None)
    }

    /// Create a new root group whose arrays cache statistics and spatial references in `sidecar`.
    #[must_use]
    pub fn new_root_with_sidecar(sidecar: SidecarStorage) -> Arc<Self> {
        Self::new_child(Weak::new(), "/", "/".to_string(), Some(sidecar))
    }

    /// Add an existing array to the group under its own name.
    ///
    /// The array is shared, not copied. Its full name is not changed.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the group is not valid, the name of `array` is invalid, or an object with the same name exists.
    pub fn add_array(&self, array: ArrayRef) -> Result<(), GroupError> {
        self.check_valid()?;
        let name = array.name();
        validate_name(&name)?;
        let mut children = self.children.write();
        if children.contains(&name) {
            return Err(GroupError::AlreadyExists(join_full_name(
                &self.full_name(),
                &name,
            )));
        }
        children.arrays.insert(name, array);
        Ok(())
    }

    /// Move the array entry `name` to `new_name`.
    pub(super) fn rename_array_entry(&self, name: &str, new_name: &str) -> Result<(), GroupError> {
        self.check_valid()?;
        validate_name(new_name)?;
        if name == new_name {
            return Ok(());
        }
        let mut children = self.children.write();
        if children.contains(new_name) {
            return Err(GroupError::AlreadyExists(join_full_name(
                &self.full_name(),
                new_name,
            )));
        }
        let array = children
            .arrays
            .remove(name)
            .ok_or_else(|| GroupError::NotFound(join_full_name(&self.full_name(), name)))?;
        children.arrays.insert(new_name.to_string(), array);
        Ok(())
    }

    /// Update the full names of the group and everything below it.
    fn parent_renamed(&self, parent_full_name: &str) {
        let full_name = join_full_name(parent_full_name, &self.name());
        *self.full_name.write() = full_name.clone();
        let children = self.children.read();
        for dimension in &children.dimensions {
            dimension.parent_renamed(&full_name);
        }
        for array in children.arrays.values() {
            array.parent_renamed(&full_name);
        }
        for group in children.groups.values() {
            group.parent_renamed(&full_name);
        }
    }

    /// Invalidate the group and everything below it.
    fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
        let children = self.children.read();
        for dimension in &children.dimensions {
            dimension.invalidate();
        }
        for array in children.arrays.values() {
            array.parent_deleted();
        }
        for group in children.groups.values() {
            group.invalidate();
        }
    }
}

impl MdGroup for MemoryGroup {
    fn name(&self) -> String {
        self.name.read().clone()
    }

    fn full_name(&self) -> String {
        self.full_name.read().clone()
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn attributes(&self) -> Attributes {
        self.attributes.read().clone()
    }

    fn set_attribute(&self, name: &str, value: serde_json::Value) -> Result<(), GroupError> {
        self.check_valid()?;
        self.attributes.write().insert(name.to_string(), value);
        Ok(())
    }

    fn delete_attribute(&self, name: &str) -> Result<(), GroupError> {
        self.check_valid()?;
        self.attributes.write().remove(name);
        Ok(())
    }

    fn group_names(&self) -> Result<Vec<String>, GroupError> {
        self.check_valid()?;
        Ok(self.children.read().groups.keys().cloned().collect())
    }

    fn open_group(&self, name: &str) -> Result<Option<GroupRef>, GroupError> {
        self.check_valid()?;
        Ok(self
            .children
            .read()
            .groups
            .get(name)
            .map(|group| -> GroupRef { group.clone() }))
    }

    fn array_names(&self) -> Result<Vec<String>, GroupError> {
        self.check_valid()?;
        Ok(self.children.read().arrays.keys().cloned().collect())
    }

    fn open_array(&self, name: &str) -> Result<Option<ArrayRef>, GroupError> {
        self.check_valid()?;
        Ok(self.children.read().arrays.get(name).cloned())
    }

    fn dimensions(&self) -> Result<Vec<Arc<Dimension>>, GroupError> {
        self.check_valid()?;
        Ok(self.children.read().dimensions.clone())
    }

    fn create_group_with_options(
        &self,
        name: &str,
        _options: &ExtensionOptions,
    ) -> Result<GroupRef, GroupError> {
        self.check_valid()?;
        validate_name(name)?;
        let full_name = join_full_name(&self.full_name(), name);
        let mut children = self.children.write();
        if children.contains(name) {
            return Err(GroupError::AlreadyExists(full_name));
        }
        let group = Self::new_child(self.this.clone(), name, full_name, self.sidecar.clone());
        children.groups.insert(name.to_string(), group.clone());
        Ok(group)
    }

    fn delete_group(&self, name: &str) -> Result<(), GroupError> {
        self.check_valid()?;
        let group = self
            .children
            .write()
            .groups
            .remove(name)
            .ok_or_else(|| GroupError::NotFound(join_full_name(&self.full_name(), name)))?;
        group.invalidate();
        Ok(())
    }

    fn create_dimension(
        &self,
        name: &str,
        dimension_type: &str,
        direction: &str,
        size: u64,
    ) -> Result<Arc<Dimension>, GroupError> {
        self.check_valid()?;
        validate_name(name)?;
        let full_name = self.full_name();
        let mut children = self.children.write();
        if children
            .dimensions
            .iter()
            .any(|dimension| dimension.name() == name)
        {
            return Err(GroupError::AlreadyExists(join_full_name(&full_name, name)));
        }
        let dimension = Dimension::new(&full_name, name, dimension_type, direction, size);
        children.dimensions.push(dimension.clone());
        Ok(dimension)
    }

    fn rename_dimension(&self, name: &str, new_name: &str) -> Result<(), GroupError> {
        self.check_valid()?;
        validate_name(new_name)?;
        let children = self.children.read();
        if name != new_name
            && children
                .dimensions
                .iter()
                .any(|dimension| dimension.name() == new_name)
        {
            return Err(GroupError::AlreadyExists(join_full_name(
                &self.full_name(),
                new_name,
            )));
        }
        let dimension = children
            .dimensions
            .iter()
            .find(|dimension| dimension.name() == name)
            .ok_or_else(|| GroupError::NotFound(join_full_name(&self.full_name(), name)))?;
        dimension.rename(new_name)?;
        Ok(())
    }

    fn create_array_with_options(
        &self,
        name: &str,
        dimensions: &[Arc<Dimension>],
        value_type: ValueType,
        _options: &ExtensionOptions,
    ) -> Result<ArrayRef, GroupError> {
        self.check_valid()?;
        validate_name(name)?;
        let full_name = self.full_name();
        let mut children = self.children.write();
        if children.contains(name) {
            return Err(GroupError::AlreadyExists(join_full_name(&full_name, name)));
        }
        let array: ArrayRef = MemoryArray::new_in_group(
            self.this.clone(),
            &full_name,
            name,
            dimensions,
            value_type,
            self.sidecar.clone(),
        )?;
        children.arrays.insert(name.to_string(), array.clone());
        Ok(array)
    }

    fn delete_array(&self, name: &str) -> Result<(), GroupError> {
        self.check_valid()?;
        let array = self
            .children
            .write()
            .arrays
            .remove(name)
            .ok_or_else(|| GroupError::NotFound(join_full_name(&self.full_name(), name)))?;
        array.parent_deleted();
        Ok(())
    }

    fn rename(&self, new_name: &str) -> Result<(), GroupError> {
        self.check_valid()?;
        validate_name(new_name)?;
        let Some(parent) = self.parent.upgrade() else {
            return Err(GroupError::UnsupportedMethod("rename of the root group"));
        };
        let old_name = self.name();
        if old_name != new_name {
            let mut siblings = parent.children.write();
            if siblings.contains(new_name) {
                return Err(GroupError::AlreadyExists(join_full_name(
                    &parent.full_name(),
                    new_name,
                )));
            }
            if let Some(group) = siblings.groups.remove(&old_name) {
                siblings.groups.insert(new_name.to_string(), group);
            }
        }
        *self.name.write() = new_name.to_string();
        self.parent_renamed(&parent.full_name());
        Ok(())
    }

    fn sidecar(&self) -> Option<SidecarStorage> {
        self.sidecar.clone()
    }
}
