//! An in-memory array.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::array::{ArrayError, MdArray};
use crate::chunk_grid::iterators::OffsetPairs;
use crate::chunk_grid::{CheckedRegion, row_major_strides};
use crate::data_type::{ValueType, copy_value};
use crate::dimension::Dimension;
use crate::group::MdGroup;
use crate::storage::{SidecarKey, SidecarStorage, SpatialRef};
use crate::{Attributes, join_full_name};

use super::MemoryGroup;

#[derive(Debug, Default)]
struct MemoryArrayMetadata {
    nodata: Option<Vec<u8>>,
    scale: Option<f64>,
    offset: Option<f64>,
    unit: String,
    spatial_ref: Option<SpatialRef>,
}

/// The elements of a [`MemoryArray`] in row-major order.
#[derive(Debug)]
struct MemoryArrayData {
    shape: Vec<u64>,
    bytes: Vec<u8>,
}

/// An in-memory array.
///
/// Elements are stored contiguously in row-major order and are initialised to zero.
#[derive(Debug)]
pub struct MemoryArray {
    group: Weak<MemoryGroup>,
    name: RwLock<String>,
    full_name: RwLock<String>,
    value_type: ValueType,
    dimensions: Vec<Arc<Dimension>>,
    data: RwLock<MemoryArrayData>,
    attributes: RwLock<Attributes>,
    metadata: RwLock<MemoryArrayMetadata>,
    sidecar: Option<SidecarStorage>,
    valid: AtomicBool,
}

fn storage_len(shape: &[u64], element_size: usize) -> Result<usize, ArrayError> {
    shape
        .iter()
        .try_fold(element_size, |acc, &size| {
            usize::try_from(size).ok().and_then(|size| acc.checked_mul(size))
        })
        .ok_or_else(|| ArrayError::Other(format!("an array of shape {shape:?} is too large")))
}

/// The sidecar context of the spatial reference of an array.
pub const SPATIAL_REF_CONTEXT: &str = "spatial_ref";

fn out_of_bounds() -> ArrayError {
    ArrayError::Other("element outside of the array storage".to_string())
}

impl MemoryArray {
    /// Create a new standalone in-memory array.
    ///
    /// The array registers itself as a user of `dimensions` so it is resized with them.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array storage size exceeds [`usize::MAX`].
    pub fn new(
        name: &str,
        dimensions: &[Arc<Dimension>],
        value_type: ValueType,
    ) -> Result<Arc<Self>, ArrayError> {
        Self::new_in_group(Weak::new(), "", name, dimensions, value_type, None)
    }

    pub(super) fn new_in_group(
        group: Weak<MemoryGroup>,
        group_full_name: &str,
        name: &str,
        dimensions: &[Arc<Dimension>],
        value_type: ValueType,
        sidecar: Option<SidecarStorage>,
    ) -> Result<Arc<Self>, ArrayError> {
        let shape: Vec<u64> = dimensions.iter().map(|dim| dim.size()).collect();
        let bytes = vec![0; storage_len(&shape, value_type.size())?];
        let array = Arc::new(Self {
            group,
            name: RwLock::new(name.to_string()),
            full_name: RwLock::new(join_full_name(group_full_name, name)),
            value_type,
            dimensions: dimensions.to_vec(),
            data: RwLock::new(MemoryArrayData { shape, bytes }),
            attributes: RwLock::default(),
            metadata: RwLock::default(),
            sidecar,
            valid: AtomicBool::new(true),
        });
        let weak: Weak<Self> = Arc::downgrade(&array);
        let user: Weak<dyn MdArray> = weak;
        for dimension in dimensions {
            dimension.register_user(user.clone());
        }
        Ok(array)
    }

    /// Reallocate the storage for `new_shape`, keeping the elements in the overlap of the old and new shapes.
    ///
    /// New elements are set to the nodata value if there is one, otherwise to zero.
    fn reallocate(&self, new_shape: Vec<u64>) -> Result<(), ArrayError> {
        let element_size = self.value_type.size();
        let mut bytes = vec![0; storage_len(&new_shape, element_size)?];
        if let Some(nodata) = self.metadata.read().nodata.as_ref() {
            for element in bytes.chunks_exact_mut(element_size) {
                element.copy_from_slice(nodata);
            }
        }

        let mut data = self.data.write();
        let overlap: Vec<usize> = std::iter::zip(&data.shape, &new_shape)
            .map(|(&old, &new)| usize::try_from(old.min(new)).unwrap_or(usize::MAX))
            .collect();
        let signed_strides = |shape: &[u64]| -> Result<Vec<i64>, ArrayError> {
            row_major_strides(shape)
                .ok_or_else(out_of_bounds)?
                .into_iter()
                .map(|stride| i64::try_from(stride).map_err(|_| out_of_bounds()))
                .collect()
        };
        let pairs = OffsetPairs::new(
            overlap,
            (0, signed_strides(&data.shape)?),
            (0, signed_strides(&new_shape)?),
        );
        for (old, new) in pairs {
            let old = usize::try_from(old).map_err(|_| out_of_bounds())? * element_size;
            let new = usize::try_from(new).map_err(|_| out_of_bounds())? * element_size;
            bytes[new..new + element_size]
                .copy_from_slice(data.bytes.get(old..old + element_size).ok_or_else(out_of_bounds)?);
        }
        *data = MemoryArrayData {
            shape: new_shape,
            bytes,
        };
        Ok(())
    }
}

impl MdArray for MemoryArray {
    fn name(&self) -> String {
        self.name.read().clone()
    }

    fn full_name(&self) -> String {
        self.full_name.read().clone()
    }

    fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    fn dimensions(&self) -> Vec<Arc<Dimension>> {
        self.dimensions.clone()
    }

    fn shape(&self) -> Vec<u64> {
        self.data.read().shape.clone()
    }

    fn attributes(&self) -> Attributes {
        self.attributes.read().clone()
    }

    fn set_attribute(&self, name: &str, value: serde_json::Value) -> Result<(), ArrayError> {
        self.check_valid()?;
        self.attributes.write().insert(name.to_string(), value);
        Ok(())
    }

    fn delete_attribute(&self, name: &str) -> Result<(), ArrayError> {
        self.check_valid()?;
        self.attributes.write().remove(name);
        Ok(())
    }

    fn raw_nodata(&self) -> Option<Vec<u8>> {
        self.metadata.read().nodata.clone()
    }

    fn set_raw_nodata(&self, nodata: Option<&[u8]>) -> Result<(), ArrayError> {
        self.check_valid()?;
        if let Some(nodata) = nodata
            && nodata.len() != self.value_type.size()
        {
            return Err(ArrayError::Other(format!(
                "nodata of {} bytes does not match the value type {}",
                nodata.len(),
                self.value_type
            )));
        }
        self.metadata.write().nodata = nodata.map(<[u8]>::to_vec);
        Ok(())
    }

    fn scale(&self) -> Option<f64> {
        self.metadata.read().scale
    }

    fn set_scale(&self, scale: Option<f64>) -> Result<(), ArrayError> {
        self.check_valid()?;
        self.metadata.write().scale = scale;
        Ok(())
    }

    fn offset(&self) -> Option<f64> {
        self.metadata.read().offset
    }

    fn set_offset(&self, offset: Option<f64>) -> Result<(), ArrayError> {
        self.check_valid()?;
        self.metadata.write().offset = offset;
        Ok(())
    }

    fn unit(&self) -> String {
        self.metadata.read().unit.clone()
    }

    fn set_unit(&self, unit: &str) -> Result<(), ArrayError> {
        self.check_valid()?;
        self.metadata.write().unit = unit.to_string();
        Ok(())
    }

    fn spatial_ref(&self) -> Option<SpatialRef> {
        if let Some(sidecar) = &self.sidecar {
            match sidecar.get_spatial_ref(&SidecarKey::new(self.full_name(), SPATIAL_REF_CONTEXT)) {
                Ok(Some(spatial_ref)) => return Some(spatial_ref),
                Ok(None) => {}
                Err(err) => log::warn!(
                    "failed to read the spatial reference of {} from the sidecar: {err}",
                    self.full_name()
                ),
            }
        }
        self.metadata.read().spatial_ref.clone()
    }

    fn set_spatial_ref(&self, spatial_ref: Option<SpatialRef>) -> Result<(), ArrayError> {
        self.check_valid()?;
        if let Some(spatial_ref) = &spatial_ref {
            let mapping = spatial_ref.data_axis_to_srs_axis_mapping();
            if mapping.len() != self.dimensions.len() {
                return Err(ArrayError::IncompatibleDimensionalityError(
                    crate::chunk_grid::IncompatibleDimensionalityError::new(
                        mapping.len(),
                        self.dimensions.len(),
                    ),
                ));
            }
        }
        if let Some(sidecar) = &self.sidecar {
            sidecar.set_spatial_ref(
                &SidecarKey::new(self.full_name(), SPATIAL_REF_CONTEXT),
                spatial_ref.clone(),
            )?;
        }
        self.metadata.write().spatial_ref = spatial_ref;
        Ok(())
    }

    fn sidecar(&self) -> Option<SidecarStorage> {
        self.sidecar.clone()
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn read_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        let data = self.data.read();
        let element_size = self.value_type.size();
        for (index, offset) in region.element_offsets(&data.shape, buffer_type.size()) {
            let element = index
                .checked_mul(element_size)
                .and_then(|start| data.bytes.get(start..))
                .ok_or_else(out_of_bounds)?;
            copy_value(
                element,
                &self.value_type,
                &mut buffer[offset..],
                buffer_type,
            )?;
        }
        Ok(())
    }

    fn write_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &[u8],
    ) -> Result<(), ArrayError> {
        let mut data = self.data.write();
        let element_size = self.value_type.size();
        let offsets = region.element_offsets(&data.shape, buffer_type.size());
        for (index, offset) in offsets {
            let element = index
                .checked_mul(element_size)
                .and_then(|start| data.bytes.get_mut(start..))
                .ok_or_else(out_of_bounds)?;
            copy_value(&buffer[offset..], buffer_type, element, &self.value_type)?;
        }
        Ok(())
    }

    fn resize(&self, new_shape: &[u64]) -> Result<(), ArrayError> {
        self.check_valid()?;
        if new_shape.len() != self.dimensions.len() {
            return Err(crate::chunk_grid::IncompatibleDimensionalityError::new(
                new_shape.len(),
                self.dimensions.len(),
            )
            .into());
        }
        for (dimension, &size) in std::iter::zip(&self.dimensions, new_shape) {
            if dimension.size() != size {
                dimension.resize(size)?;
            }
        }
        Ok(())
    }

    fn on_dimension_resize(&self, dimension: &Dimension, new_size: u64) -> Result<(), ArrayError> {
        self.check_valid()?;
        let mut new_shape = self.shape();
        for (axis, dim) in self.dimensions.iter().enumerate() {
            if std::ptr::eq(Arc::as_ptr(dim), dimension) {
                new_shape[axis] = new_size;
            }
        }
        self.reallocate(new_shape)
    }

    fn rename(&self, new_name: &str) -> Result<(), ArrayError> {
        self.check_valid()?;
        let old_name = self.name();
        if let Some(group) = self.group.upgrade() {
            group
                .rename_array_entry(&old_name, new_name)
                .map_err(|err| ArrayError::Other(err.to_string()))?;
            *self.full_name.write() = join_full_name(&group.full_name(), new_name);
        } else {
            *self.full_name.write() = join_full_name("", new_name);
        }
        *self.name.write() = new_name.to_string();
        Ok(())
    }

    fn parent_renamed(&self, parent_full_name: &str) {
        *self.full_name.write() = join_full_name(parent_full_name, &self.name());
    }

    fn parent_deleted(&self) {
        self.valid.store(false, Ordering::Release);
    }
}
