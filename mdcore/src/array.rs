//! Multidimensional arrays.
//!
//! An [`MdArray`] is a typed, N-dimensional, named entity with attributes.
//! Backends implement a small set of required methods, most importantly [`read_impl`](MdArray::read_impl) (and [`write_impl`](MdArray::write_impl) if writable).
//! The provided [`read`](MdArray::read) and [`write`](MdArray::write) methods validate every request before it reaches the backend:
//!  - the array must still be valid (not deleted),
//!  - the array and buffer value types must be convertible, and
//!  - the region must be in bounds of the array and of the caller buffer (see [`check_region`]).
//!
//! Views are arrays wrapping a parent array and transforming access to it without copying data, see [`ArrayViewExt`].
//!
//! [`MdArrayExt`] adds typed convenience methods for reading and writing [`Element`]s.

mod array_errors;
mod copy;
mod element;
mod regular_spacing;
mod view;

use std::fmt::Debug;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub use array_errors::ArrayError;
pub use copy::copy_array_data;
pub use element::Element;
pub use regular_spacing::is_regularly_spaced;
pub use view::{
    ArrayViewExt, FieldExtractArray, MaskedArray, SlicedArray, TransposedArray, UnscaledArray,
    ViewExpression, ViewSelection,
};

use crate::chunk_grid::{
    ArrayRegion, ArrayShape, CheckedRegion, ChunkShape, check_region, chunk_size_for_budget,
};
use crate::config::global_config;
use crate::data_type::{NumericKind, NumericValue, ValueType, copy_value};
use crate::dimension::Dimension;
use crate::options::AdviseReadOptions;
use crate::storage::{SidecarStorage, SpatialRef};
use crate::Attributes;

/// [`Arc`] wrapped array.
pub type ArrayRef = Arc<dyn MdArray>;

/// The slot size of strings formatted from non-string arrays by [`MdArrayExt::read_strings`].
const FORMATTED_STRING_LEN: NonZeroUsize = NonZeroUsize::MIN.saturating_add(63);

/// A multidimensional array.
///
/// Methods with default implementations describe optional capabilities.
/// Mutating capabilities default to [`ArrayError::UnsupportedMethod`] and metadata defaults to absent.
pub trait MdArray: Debug + Send + Sync {
    /// The name of the array.
    fn name(&self) -> String;

    /// The full name of the array, including the path of its group.
    fn full_name(&self) -> String;

    /// The value type of the array elements.
    fn value_type(&self) -> &ValueType;

    /// The dimensions of the array, slowest varying first.
    fn dimensions(&self) -> Vec<Arc<Dimension>>;

    /// The shape of the array.
    fn shape(&self) -> ArrayShape {
        self.dimensions().iter().map(|dim| dim.size()).collect()
    }

    /// The dimensionality of the array.
    fn dimensionality(&self) -> usize {
        self.dimensions().len()
    }

    /// The total number of elements, saturating at [`u64::MAX`].
    fn total_elements(&self) -> u64 {
        self.shape()
            .iter()
            .try_fold(1u64, |acc, &size| acc.checked_mul(size))
            .unwrap_or(u64::MAX)
    }

    /// The natural block shape of the backend, where `0` means unknown along an axis.
    fn block_size(&self) -> Vec<u64> {
        vec![0; self.dimensionality()]
    }

    /// A processing chunk shape holding at most `max_bytes`, aligned on the [`block_size`](MdArray::block_size).
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the block size does not match the array dimensionality.
    fn processing_chunk_size(&self, max_bytes: usize) -> Result<ChunkShape, ArrayError> {
        Ok(chunk_size_for_budget(
            &self.shape(),
            &self.block_size(),
            self.value_type().size(),
            max_bytes,
            global_config().default_block_size(),
        )?)
    }

    /// The attributes of the array.
    fn attributes(&self) -> Attributes {
        Attributes::new()
    }

    /// The attribute `name`, if present.
    fn attribute(&self, name: &str) -> Option<serde_json::Value> {
        self.attributes().get(name).cloned()
    }

    /// Set the attribute `name`.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if attributes cannot be set.
    fn set_attribute(&self, _name: &str, _value: serde_json::Value) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("set_attribute"))
    }

    /// Delete the attribute `name`.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if attributes cannot be deleted.
    fn delete_attribute(&self, _name: &str) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("delete_attribute"))
    }

    /// The nodata value as raw bytes of the array value type.
    fn raw_nodata(&self) -> Option<Vec<u8>> {
        None
    }

    /// Set (or clear) the nodata value as raw bytes of the array value type.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the nodata value cannot be set.
    fn set_raw_nodata(&self, _nodata: Option<&[u8]>) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("set_raw_nodata"))
    }

    /// The nodata value as a [`f64`], if the array is numeric and has a nodata value.
    fn nodata_as_f64(&self) -> Option<f64> {
        let kind = self.value_type().numeric_kind()?;
        let nodata = self.raw_nodata()?;
        NumericValue::read(kind, &nodata).ok().map(NumericValue::to_f64)
    }

    /// Set the nodata value from a [`f64`], converted to the array value type.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the value cannot be converted or the nodata value cannot be set.
    fn set_nodata_f64(&self, nodata: f64) -> Result<(), ArrayError> {
        let value_type = self.value_type();
        let mut bytes = vec![0; value_type.size()];
        copy_value(
            &nodata.to_ne_bytes(),
            &ValueType::Numeric(NumericKind::Float64),
            &mut bytes,
            value_type,
        )?;
        self.set_raw_nodata(Some(&bytes))
    }

    /// The scale applied to raw values: `physical = raw * scale + offset`.
    fn scale(&self) -> Option<f64> {
        None
    }

    /// Set (or clear) the scale.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the scale cannot be set.
    fn set_scale(&self, _scale: Option<f64>) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("set_scale"))
    }

    /// The offset added to scaled raw values: `physical = raw * scale + offset`.
    fn offset(&self) -> Option<f64> {
        None
    }

    /// Set (or clear) the offset.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the offset cannot be set.
    fn set_offset(&self, _offset: Option<f64>) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("set_offset"))
    }

    /// The unit of the (physical) values, empty if unknown.
    fn unit(&self) -> String {
        String::new()
    }

    /// Set the unit.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the unit cannot be set.
    fn set_unit(&self, _unit: &str) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("set_unit"))
    }

    /// The spatial reference of the array.
    fn spatial_ref(&self) -> Option<SpatialRef> {
        None
    }

    /// Set (or clear) the spatial reference.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the spatial reference cannot be set.
    fn set_spatial_ref(&self, _spatial_ref: Option<SpatialRef>) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("set_spatial_ref"))
    }

    /// The sidecar storage holding derived metadata (e.g. cached statistics) of the array.
    fn sidecar(&self) -> Option<SidecarStorage> {
        None
    }

    /// Returns true if [`write`](MdArray::write) is supported.
    fn is_writable(&self) -> bool {
        false
    }

    /// Returns false if the array, or the group holding it, has been deleted.
    fn is_valid(&self) -> bool {
        true
    }

    /// Check that the array is valid.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidHandle`] if the array has been deleted.
    fn check_valid(&self) -> Result<(), ArrayError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ArrayError::InvalidHandle(self.full_name()))
        }
    }

    /// Read the elements of the validated `region` into `buffer` as `buffer_type`.
    ///
    /// The region has been checked against the array shape and the buffer, and `buffer_type` is convertible from the array value type.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the backend fails.
    fn read_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError>;

    /// Write the elements of the validated `region` from `buffer` holding `buffer_type`.
    ///
    /// The region has been checked against the array shape and the buffer, and `buffer_type` is convertible to the array value type.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the array is not writable, or another [`ArrayError`] if the backend fails.
    fn write_impl(
        &self,
        _region: &CheckedRegion,
        _buffer_type: &ValueType,
        _buffer: &[u8],
    ) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("write"))
    }

    /// Hint that the validated `region` will be read soon.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the backend fails.
    fn advise_read_impl(
        &self,
        _region: &CheckedRegion,
        _options: &AdviseReadOptions,
    ) -> Result<(), ArrayError> {
        Ok(())
    }

    /// Read `region` into `buffer` as elements of `buffer_type`.
    ///
    /// Implementations should not override this method.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array is not valid,
    ///  - the array value type is not convertible to `buffer_type`,
    ///  - the region is out of bounds of the array or `buffer` (see [`check_region`]), or
    ///  - the backend fails.
    fn read(
        &self,
        region: &ArrayRegion,
        buffer_type: &ValueType,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        self.check_valid()?;
        if !self.value_type().can_convert_to(buffer_type) {
            return Err(ArrayError::incompatible_value_types(
                self.value_type(),
                buffer_type,
            ));
        }
        let region = check_region(&self.shape(), region, buffer_type.size(), buffer.len())?;
        self.read_impl(&region, buffer_type, buffer)
    }

    /// Write `region` from `buffer` holding elements of `buffer_type`.
    ///
    /// Implementations should not override this method.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array is not valid,
    ///  - `buffer_type` is not convertible to the array value type,
    ///  - the region is out of bounds of the array or `buffer` (see [`check_region`]), or
    ///  - the array is not writable or the backend fails.
    fn write(
        &self,
        region: &ArrayRegion,
        buffer_type: &ValueType,
        buffer: &[u8],
    ) -> Result<(), ArrayError> {
        self.check_valid()?;
        if !buffer_type.can_convert_to(self.value_type()) {
            return Err(ArrayError::incompatible_value_types(
                buffer_type,
                self.value_type(),
            ));
        }
        let region = check_region(&self.shape(), region, buffer_type.size(), buffer.len())?;
        self.write_impl(&region, buffer_type, buffer)
    }

    /// Hint that the region at `start` with `count` elements per axis will be read soon.
    ///
    /// `start` defaults to the array origin and `count` to the remainder of the array from `start`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array is not valid, the region is out of bounds, or the backend fails.
    fn advise_read(
        &self,
        start: Option<&[u64]>,
        count: Option<&[usize]>,
        options: &AdviseReadOptions,
    ) -> Result<(), ArrayError> {
        self.check_valid()?;
        let shape = self.shape();
        if shape.contains(&0) {
            return Ok(());
        }
        let start = start.map_or_else(|| vec![0; shape.len()], <[u64]>::to_vec);
        let count = match count {
            Some(count) => count.to_vec(),
            None => std::iter::zip(&shape, &start)
                .map(|(&size, &start)| {
                    usize::try_from(size.saturating_sub(start)).unwrap_or(usize::MAX)
                })
                .collect(),
        };
        let region = ArrayRegion::new(start, count).with_buffer_stride(vec![0; shape.len()]);
        let region = check_region(&shape, &region, 1, 1)?;
        self.advise_read_impl(&region, options)
    }

    /// Resize the array by resizing its dimensions.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the array cannot be resized.
    fn resize(&self, _new_shape: &[u64]) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("resize"))
    }

    /// Called by [`Dimension::resize`] for every array using the dimension, before the dimension size changes.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the array cannot be resized.
    fn on_dimension_resize(&self, _dimension: &Dimension, _new_size: u64) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("resize"))
    }

    /// Rename the array.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedMethod`] if the array cannot be renamed.
    fn rename(&self, _new_name: &str) -> Result<(), ArrayError> {
        Err(ArrayError::UnsupportedMethod("rename"))
    }

    /// Called by the group holding the array after the group was renamed.
    fn parent_renamed(&self, _parent_full_name: &str) {}

    /// Called by the group holding the array after the array or the group was deleted.
    fn parent_deleted(&self) {}
}

/// Typed convenience methods of [`MdArray`].
pub trait MdArrayExt: MdArray {
    /// Read the elements of `region` with a dense row-major buffer.
    ///
    /// # Errors
    /// See [`MdArray::read`].
    fn read_elements<T: Element>(&self, region: &ArrayRegion) -> Result<Vec<T>, ArrayError> {
        let num_elements = region
            .num_elements()
            .ok_or_else(|| ArrayError::Other("region has too many elements".to_string()))?;
        let mut elements = vec![T::zeroed(); num_elements];
        self.read(
            region,
            &T::value_type(),
            bytemuck::cast_slice_mut(&mut elements),
        )?;
        Ok(elements)
    }

    /// Read all elements of the array in row-major order.
    ///
    /// # Errors
    /// See [`MdArray::read`].
    fn read_all_elements<T: Element>(&self) -> Result<Vec<T>, ArrayError> {
        self.check_valid()?;
        let shape = self.shape();
        if shape.contains(&0) {
            return Ok(Vec::new());
        }
        self.read_elements(&ArrayRegion::new_with_shape(&shape)?)
    }

    /// Write `elements` to `region` from a dense row-major buffer.
    ///
    /// # Errors
    /// See [`MdArray::write`].
    fn write_elements<T: Element>(
        &self,
        region: &ArrayRegion,
        elements: &[T],
    ) -> Result<(), ArrayError> {
        self.write(region, &T::value_type(), bytemuck::cast_slice(elements))
    }

    /// Read the elements of `region` as strings.
    ///
    /// String arrays are read in their own slot size, other arrays are formatted (see [`copy_value`]).
    ///
    /// # Errors
    /// See [`MdArray::read`].
    fn read_strings(&self, region: &ArrayRegion) -> Result<Vec<String>, ArrayError> {
        let buffer_type = match self.value_type() {
            ValueType::String(max_len) => ValueType::String(*max_len),
            _ => ValueType::String(FORMATTED_STRING_LEN),
        };
        let slot = buffer_type.size();
        let buffer_len = region
            .num_elements()
            .and_then(|num_elements| num_elements.checked_mul(slot))
            .ok_or_else(|| ArrayError::Other("region has too many elements".to_string()))?;
        let mut buffer = vec![0u8; buffer_len];
        self.read(region, &buffer_type, &mut buffer)?;
        Ok(buffer
            .chunks_exact(slot)
            .map(|bytes| buffer_type.read_string(bytes).unwrap_or_default())
            .collect())
    }
}

impl<T: MdArray + ?Sized> MdArrayExt for T {}
