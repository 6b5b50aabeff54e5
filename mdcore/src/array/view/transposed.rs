use std::sync::Arc;

use itertools::Itertools;

use crate::chunk_grid::{ArrayRegion, CheckedRegion};
use crate::data_type::ValueType;
use crate::dimension::Dimension;
use crate::options::AdviseReadOptions;
use crate::storage::SpatialRef;

use super::{forward_parent_metadata, view_dimension};
use crate::array::{ArrayError, ArrayRef, MdArray};

/// A view permuting the axes of a parent array.
///
/// The mapping gives, for each view axis, the parent axis it presents, or `-1` to insert an axis of size `1`.
/// Every parent axis must appear exactly once.
///
/// Transposing a 2x3 array `[[0, 1, 2], [4, 5, 6]]` with the mapping `[1, 0]` gives the 3x2 array `[[0, 4], [1, 5], [2, 6]]`.
#[derive(Debug)]
pub struct TransposedArray {
    parent: ArrayRef,
    full_name: String,
    dimensions: Vec<Arc<Dimension>>,
    mapping: Vec<Option<usize>>,
}

impl TransposedArray {
    /// Create a new transposed view of `parent`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidTransposeMapping`] if `mapping` is not a permutation of the parent axes with optional inserted axes.
    pub fn new(parent: ArrayRef, mapping: &[i32]) -> Result<Self, ArrayError> {
        parent.check_valid()?;
        let parent_dimensions = parent.dimensions();
        let invalid = || ArrayError::InvalidTransposeMapping {
            mapping: mapping.to_vec(),
            dimensionality: parent_dimensions.len(),
        };
        let axis_mapping = mapping
            .iter()
            .map(|&axis| match axis {
                -1 => Ok(None),
                axis => usize::try_from(axis)
                    .ok()
                    .filter(|&axis| axis < parent_dimensions.len())
                    .map(Some)
                    .ok_or_else(invalid),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen = vec![false; parent_dimensions.len()];
        for &axis in axis_mapping.iter().flatten() {
            if std::mem::replace(&mut seen[axis], true) {
                return Err(invalid());
            }
        }
        if seen.contains(&false) {
            return Err(invalid());
        }

        let dimensions = axis_mapping
            .iter()
            .map(|axis| match axis {
                Some(axis) => Arc::clone(&parent_dimensions[*axis]),
                None => view_dimension("newaxis".to_string(), 1),
            })
            .collect();
        Ok(Self {
            full_name: format!(
                "{}.transpose([{}])",
                parent.full_name(),
                mapping.iter().join(",")
            ),
            parent,
            dimensions,
            mapping: axis_mapping,
        })
    }

    /// The parent array.
    #[must_use]
    pub fn parent(&self) -> &ArrayRef {
        &self.parent
    }

    /// Permute a validated view region to the parent region, keeping the caller buffer layout.
    fn parent_region(&self, region: &CheckedRegion) -> ArrayRegion {
        let dimensionality = self.parent.dimensionality();
        let mut start = vec![0; dimensionality];
        let mut count = vec![1; dimensionality];
        let mut step = vec![1; dimensionality];
        let mut buffer_stride = vec![0; dimensionality];
        for (axis, parent_axis) in self.mapping.iter().enumerate() {
            if let Some(parent_axis) = *parent_axis {
                start[parent_axis] = region.start()[axis];
                count[parent_axis] = region.count()[axis];
                step[parent_axis] = region.step()[axis];
                buffer_stride[parent_axis] = region.buffer_stride()[axis];
            }
        }
        ArrayRegion::new(start, count)
            .with_step(step)
            .with_buffer_stride(buffer_stride)
            .with_buffer_offset(region.buffer_offset())
    }
}

impl MdArray for TransposedArray {
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
        self.mapping
            .iter()
            .map(|axis| axis.and_then(|axis| parent_block_size.get(axis).copied()).unwrap_or(0))
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
            .mapping
            .iter()
            .map(|axis| {
                axis.and_then(|axis| parent_mapping.get(axis).copied())
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
            .read(&self.parent_region(region), buffer_type, buffer)
    }

    fn write_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &[u8],
    ) -> Result<(), ArrayError> {
        self.parent
            .write(&self.parent_region(region), buffer_type, buffer)
    }

    fn advise_read_impl(
        &self,
        region: &CheckedRegion,
        options: &AdviseReadOptions,
    ) -> Result<(), ArrayError> {
        let parent_region = self.parent_region(region);
        self.parent.advise_read(
            Some(parent_region.start()),
            Some(parent_region.count()),
            options,
        )
    }
}
