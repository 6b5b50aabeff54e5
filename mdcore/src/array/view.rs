//! Lazy array views.
//!
//! A view is an [`MdArray`] that holds a strong reference to a parent array and transforms access to it without copying data.
//! Reads and writes on a view are remapped through the view's index transform and forwarded to the parent, recursively down to a backend array.
//! Views compose, e.g. `array.view("[1:]")?.transpose(&[1, 0])?.view("[0]")`.

mod field_extract;
mod masked;
mod sliced;
mod transposed;
mod unscaled;
mod view_expression;

use std::sync::Arc;

pub use field_extract::FieldExtractArray;
pub use masked::MaskedArray;
pub use sliced::SlicedArray;
pub use transposed::TransposedArray;
pub use unscaled::UnscaledArray;
pub use view_expression::{ViewExpression, ViewSelection};

use crate::chunk_grid::{ArrayRegion, CheckedRegion};
use crate::data_type::{ValueType, copy_value};
use crate::dimension::Dimension;
use crate::options::{MaskOptions, UnscaleOptions};

use super::{ArrayError, ArrayRef, MdArray};

/// View constructors for [`ArrayRef`].
pub trait ArrayViewExt {
    /// Create a view from a [view expression](ViewExpression), e.g. `[2:6:2, ..., newaxis]` or `["field"]`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the expression is malformed or does not apply to the array.
    fn view(&self, expression: &str) -> Result<ArrayRef, ArrayError>;

    /// Create a [`TransposedArray`] view.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidTransposeMapping`] if `mapping` is not a permutation of the array axes.
    fn transpose(&self, mapping: &[i32]) -> Result<ArrayRef, ArrayError>;

    /// Create an [`UnscaledArray`] view.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedValueType`] if the array is not numeric.
    fn unscaled(&self, options: &UnscaleOptions) -> Result<ArrayRef, ArrayError>;

    /// Create a [`MaskedArray`] view.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array is not real numeric or its flag attributes do not match `options`.
    fn mask(&self, options: &MaskOptions) -> Result<ArrayRef, ArrayError>;

    /// Create a [`FieldExtractArray`] view.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnknownField`] if the array value type has no field `field`.
    fn field(&self, field: &str) -> Result<ArrayRef, ArrayError>;
}

impl ArrayViewExt for ArrayRef {
    fn view(&self, expression: &str) -> Result<ArrayRef, ArrayError> {
        let mut array = Arc::clone(self);
        for bracket in ViewExpression::parse(expression)? {
            array = match bracket {
                ViewExpression::Slice(selections) => {
                    Arc::new(SlicedArray::new(array, &selections)?)
                }
                ViewExpression::Field(field) => Arc::new(FieldExtractArray::new(array, &field)?),
            };
        }
        Ok(array)
    }

    fn transpose(&self, mapping: &[i32]) -> Result<ArrayRef, ArrayError> {
        Ok(Arc::new(TransposedArray::new(Arc::clone(self), mapping)?))
    }

    fn unscaled(&self, options: &UnscaleOptions) -> Result<ArrayRef, ArrayError> {
        Ok(Arc::new(UnscaledArray::new(Arc::clone(self), options)?))
    }

    fn mask(&self, options: &MaskOptions) -> Result<ArrayRef, ArrayError> {
        Ok(Arc::new(MaskedArray::new(Arc::clone(self), options)?))
    }

    fn field(&self, field: &str) -> Result<ArrayRef, ArrayError> {
        Ok(Arc::new(FieldExtractArray::new(Arc::clone(self), field)?))
    }
}

/// A dimension owned by a view, outside of any group.
fn view_dimension(name: String, size: u64) -> Arc<Dimension> {
    Dimension::new("", name, "", "", size)
}

/// The region of `region` with a dense row-major buffer.
fn dense_region(region: &CheckedRegion) -> ArrayRegion {
    ArrayRegion::new(region.start().to_vec(), region.count().to_vec())
        .with_step(region.step().to_vec())
}

/// The size in bytes of a dense buffer holding the elements of `region`.
fn dense_len(region: &CheckedRegion, value_type: &ValueType) -> Result<usize, ArrayError> {
    region
        .num_elements()
        .checked_mul(value_type.size())
        .ok_or_else(|| ArrayError::Other("temporary buffer size overflow".to_string()))
}

/// Copy the dense buffer `dense` of `dense_type` elements into the caller `buffer` laid out as `region`.
fn scatter(
    region: &CheckedRegion,
    dense: &[u8],
    dense_type: &ValueType,
    buffer: &mut [u8],
    buffer_type: &ValueType,
) -> Result<(), ArrayError> {
    let dense_size = dense_type.size();
    for (index, offset) in region.dense_offsets(buffer_type.size()) {
        copy_value(
            &dense[index * dense_size..],
            dense_type,
            &mut buffer[offset..],
            buffer_type,
        )?;
    }
    Ok(())
}

/// Copy the caller `buffer` laid out as `region` into the dense buffer `dense` of `dense_type` elements.
fn gather(
    region: &CheckedRegion,
    buffer: &[u8],
    buffer_type: &ValueType,
    dense: &mut [u8],
    dense_type: &ValueType,
) -> Result<(), ArrayError> {
    let dense_size = dense_type.size();
    for (index, offset) in region.dense_offsets(buffer_type.size()) {
        copy_value(
            &buffer[offset..],
            buffer_type,
            &mut dense[index * dense_size..],
            dense_type,
        )?;
    }
    Ok(())
}

/// Forwards the metadata that a view shares with its parent.
macro_rules! forward_parent_metadata {
    () => {
        fn attributes(&self) -> $crate::Attributes {
            self.parent.attributes()
        }

        fn unit(&self) -> String {
            self.parent.unit()
        }

        fn is_valid(&self) -> bool {
            self.parent.is_valid()
        }
    };
}

use forward_parent_metadata;
