use std::sync::Arc;

use itertools::Itertools;

use crate::chunk_grid::{ArrayRegion, CheckedRegion};
use crate::data_type::ValueType;
use crate::dimension::Dimension;
use crate::options::AdviseReadOptions;
use crate::storage::SpatialRef;

use super::{ViewSelection, forward_parent_metadata, view_dimension};
use crate::array::{ArrayError, ArrayRef, MdArray};

/// The selection of a sliced view along one parent axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ParentRange {
    start: u64,
    /// The step between consecutive view indices, `0` if the axis is collapsed to `start`.
    step: i64,
}

/// A view selecting a strided sub-rectangle of a parent array.
///
/// Each view axis maps to a parent axis (or to none for an inserted `newaxis`).
/// Parent axes selected by a single index are collapsed and pinned to that index.
#[derive(Debug)]
pub struct SlicedArray {
    parent: ArrayRef,
    full_name: String,
    dimensions: Vec<Arc<Dimension>>,
    /// The parent axis of each view axis.
    axis_map: Vec<Option<usize>>,
    /// The selection along each parent axis.
    parent_ranges: Vec<ParentRange>,
}

/// Resolve a possibly negative `index` along an axis of `size`.
fn resolve_index(index: i64, size: u64) -> Option<u64> {
    let size = i64::try_from(size).ok()?;
    let index = if index < 0 { index.checked_add(size)? } else { index };
    u64::try_from(index).ok().filter(|&index| index < size.unsigned_abs())
}

/// Resolve a `numpy` style range along an axis of `size` to `(start, step, count)`.
fn resolve_range(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
    size: u64,
) -> Result<(u64, i64, u64), String> {
    let size = i64::try_from(size).map_err(|_| "axis too large".to_string())?;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err("the step of a range cannot be zero".to_string());
    }
    let normalise = |index: i64, lower: i64, upper: i64| {
        let index = if index < 0 {
            index.saturating_add(size)
        } else {
            index
        };
        index.clamp(lower, upper)
    };
    let (start, stop) = if step > 0 {
        (
            start.map_or(0, |start| normalise(start, 0, size)),
            stop.map_or(size, |stop| normalise(stop, 0, size)),
        )
    } else {
        (
            start.map_or(size - 1, |start| normalise(start, -1, size - 1)),
            stop.map_or(-1, |stop| normalise(stop, -1, size - 1)),
        )
    };
    let distance = if step > 0 { stop - start } else { start - stop };
    if distance <= 0 {
        return Err("the range is empty".to_string());
    }
    let step_abs = step.unsigned_abs();
    let count = distance.unsigned_abs().div_ceil(step_abs);
    Ok((start.unsigned_abs(), step, count))
}

impl SlicedArray {
    /// Create a new sliced view of `parent` from per-axis `selections`.
    ///
    /// Parent axes not covered by `selections` are selected entirely.
    /// A `...` selects entirely as many axes as needed so the remaining selections cover the trailing axes.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidViewExpression`] if there are more selections than parent axes, an index is out of bounds, or a range is empty.
    pub fn new(parent: ArrayRef, selections: &[ViewSelection]) -> Result<Self, ArrayError> {
        parent.check_valid()?;
        let expression = format!("[{}]", selections.iter().join(","));
        let invalid = |reason: String| ArrayError::InvalidViewExpression {
            expression: expression.clone(),
            reason,
        };

        let parent_dimensions = parent.dimensions();
        let num_axis_selections = selections
            .iter()
            .filter(|selection| {
                matches!(
                    selection,
                    ViewSelection::Index(_) | ViewSelection::Range { .. }
                )
            })
            .count();
        if num_axis_selections > parent_dimensions.len() {
            return Err(invalid(format!(
                "{num_axis_selections} axes selected in an array of dimensionality {}",
                parent_dimensions.len()
            )));
        }
        if selections
            .iter()
            .filter(|selection| **selection == ViewSelection::Ellipsis)
            .count()
            > 1
        {
            return Err(invalid("more than one `...`".to_string()));
        }
        let num_unselected = parent_dimensions.len() - num_axis_selections;
        let full_range = ViewSelection::Range {
            start: None,
            stop: None,
            step: None,
        };
        let mut expanded: Vec<ViewSelection> = Vec::new();
        for selection in selections {
            if *selection == ViewSelection::Ellipsis {
                expanded.extend(std::iter::repeat_n(full_range.clone(), num_unselected));
            } else {
                expanded.push(selection.clone());
            }
        }
        if !selections.contains(&ViewSelection::Ellipsis) {
            expanded.extend(std::iter::repeat_n(full_range, num_unselected));
        }

        let mut dimensions = Vec::new();
        let mut axis_map = Vec::new();
        let mut parent_ranges = Vec::with_capacity(parent_dimensions.len());
        let mut parent_axis = 0;
        for selection in expanded {
            match selection {
                ViewSelection::Index(index) => {
                    let dimension = &parent_dimensions[parent_axis];
                    let start = resolve_index(index, dimension.size()).ok_or_else(|| {
                        invalid(format!(
                            "index {index} is out of bounds for axis {parent_axis} of size {}",
                            dimension.size()
                        ))
                    })?;
                    parent_ranges.push(ParentRange { start, step: 0 });
                    parent_axis += 1;
                }
                ViewSelection::Range { start, stop, step } => {
                    let dimension = &parent_dimensions[parent_axis];
                    let size = dimension.size();
                    let (start, step, count) = resolve_range(start, stop, step, size)
                        .map_err(|reason| invalid(format!("axis {parent_axis}: {reason}")))?;
                    if start == 0 && step == 1 && count == size {
                        dimensions.push(Arc::clone(dimension));
                    } else {
                        dimensions.push(view_dimension(
                            format!("subset_{}_{start}_{step}_{count}", dimension.name()),
                            count,
                        ));
                    }
                    axis_map.push(Some(parent_axis));
                    parent_ranges.push(ParentRange { start, step });
                    parent_axis += 1;
                }
                ViewSelection::NewAxis => {
                    dimensions.push(view_dimension("newaxis".to_string(), 1));
                    axis_map.push(None);
                }
                ViewSelection::Ellipsis => {}
            }
        }

        Ok(Self {
            full_name: format!("{}{expression}", parent.full_name()),
            parent,
            dimensions,
            axis_map,
            parent_ranges,
        })
    }

    /// The parent array.
    #[must_use]
    pub fn parent(&self) -> &ArrayRef {
        &self.parent
    }

    /// Map a validated view region to the parent region, keeping the caller buffer layout.
    fn parent_region(&self, region: &CheckedRegion) -> Result<ArrayRegion, ArrayError> {
        let overflow = || ArrayError::Other(format!("index overflow in view {}", self.full_name));
        let dimensionality = self.parent_ranges.len();
        let mut start = vec![0; dimensionality];
        let mut count = vec![1; dimensionality];
        let mut step = vec![1; dimensionality];
        let mut buffer_stride = vec![0; dimensionality];
        for (range, parent_start) in std::iter::zip(&self.parent_ranges, &mut start) {
            *parent_start = range.start;
        }
        for (axis, parent_axis) in self.axis_map.iter().enumerate() {
            let Some(parent_axis) = *parent_axis else {
                continue;
            };
            let range = self.parent_ranges[parent_axis];
            let offset = i64::try_from(region.start()[axis])
                .ok()
                .and_then(|start| start.checked_mul(range.step))
                .and_then(|offset| i64::try_from(range.start).ok()?.checked_add(offset))
                .and_then(|start| u64::try_from(start).ok())
                .ok_or_else(overflow)?;
            start[parent_axis] = offset;
            count[parent_axis] = region.count()[axis];
            step[parent_axis] = region.step()[axis]
                .checked_mul(range.step)
                .ok_or_else(overflow)?;
            buffer_stride[parent_axis] = region.buffer_stride()[axis];
        }
        Ok(ArrayRegion::new(start, count)
            .with_step(step)
            .with_buffer_stride(buffer_stride)
            .with_buffer_offset(region.buffer_offset()))
    }
}

impl MdArray for SlicedArray {
    fn name(&self) -> String {
        self.parent.name()
    }

    fn full_name(&self) -> String {
        self.full_name.clone()
    }

    fn value_type(&self) -> &ValueType {
        self.parent.value_type()
    }

    fn dimensions(&self) -> Vec<Arc<Dimension>> {
        self.dimensions.clone()
    }

    fn block_size(&self) -> Vec<u64> {
        let parent_block_size = self.parent.block_size();
        self.axis_map
            .iter()
            .map(|parent_axis| match parent_axis {
                Some(parent_axis) if self.parent_ranges[*parent_axis].step == 1 => {
                    parent_block_size.get(*parent_axis).copied().unwrap_or(0)
                }
                _ => 0,
            })
            .collect()
    }

    forward_parent_metadata!();

    fn raw_nodata(&self) -> Option<Vec<u8>> {
        self.parent.raw_nodata()
    }

    fn scale(&self) -> Option<f64> {
        self.parent.scale()
    }

    fn offset(&self) -> Option<f64> {
        self.parent.offset()
    }

    fn spatial_ref(&self) -> Option<SpatialRef> {
        let spatial_ref = self.parent.spatial_ref()?;
        let parent_mapping = spatial_ref.data_axis_to_srs_axis_mapping();
        let mapping = self
            .axis_map
            .iter()
            .map(|parent_axis| {
                parent_axis
                    .and_then(|parent_axis| parent_mapping.get(parent_axis).copied())
                    .unwrap_or(0)
            })
            .collect();
        Some(spatial_ref.with_axis_mapping(mapping))
    }

    fn is_writable(&self) -> bool {
        self.parent.is_writable()
    }

    fn read_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        self.parent
            .read(&self.parent_region(region)?, buffer_type, buffer)
    }

    fn write_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &[u8],
    ) -> Result<(), ArrayError> {
        self.parent
            .write(&self.parent_region(region)?, buffer_type, buffer)
    }

    fn advise_read_impl(
        &self,
        region: &CheckedRegion,
        options: &AdviseReadOptions,
    ) -> Result<(), ArrayError> {
        let parent_region = self.parent_region(region)?;
        // The advised region is the bounding box of the strided selection.
        let (start, count): (Vec<u64>, Vec<usize>) = itertools::izip!(
            parent_region.start(),
            parent_region.count(),
            parent_region.step().unwrap_or_default()
        )
        .map(|(&start, &count, &step)| {
            let span = (count as u64 - 1).saturating_mul(step.unsigned_abs());
            let first = if step < 0 {
                start.saturating_sub(span)
            } else {
                start
            };
            (first, usize::try_from(span + 1).unwrap_or(usize::MAX))
        })
        .unzip();
        self.parent
            .advise_read(Some(start.as_slice()), Some(count.as_slice()), options)
    }
}
