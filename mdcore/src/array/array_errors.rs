use thiserror::Error;

use crate::chunk_grid::{IncompatibleDimensionalityError, RegionError};
use crate::data_type::{CompoundTypeError, ValueConversionError, ValueType};
use crate::dimension::DimensionError;
use crate::storage::StorageError;

/// An array error.
#[derive(Clone, Debug, Error)]
pub enum ArrayError {
    /// The array, or the group holding it, has been deleted.
    #[error("array {0} has been deleted")]
    InvalidHandle(String),
    /// An invalid read or write region.
    #[error(transparent)]
    RegionError(#[from] RegionError),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// The array value type and the buffer value type are not convertible.
    #[error("cannot convert values of type {from} to {to}")]
    IncompatibleValueTypes {
        /// The source value type.
        from: Box<ValueType>,
        /// The destination value type.
        to: Box<ValueType>,
    },
    /// A value conversion error.
    #[error(transparent)]
    ValueConversionError(#[from] ValueConversionError),
    /// An invalid compound type.
    #[error(transparent)]
    CompoundTypeError(#[from] CompoundTypeError),
    /// A malformed view expression.
    #[error("invalid view expression `{expression}`: {reason}")]
    InvalidViewExpression {
        /// The view expression.
        expression: String,
        /// The reason it is invalid.
        reason: String,
    },
    /// An axis mapping that is not a permutation of the array axes.
    #[error("invalid transpose mapping {mapping:?} for an array of dimensionality {dimensionality}")]
    InvalidTransposeMapping {
        /// The mapping.
        mapping: Vec<i32>,
        /// The dimensionality of the transposed array.
        dimensionality: usize,
    },
    /// A compound value type has no such field.
    #[error("value type {value_type} has no field `{field}`")]
    UnknownField {
        /// The field name.
        field: String,
        /// The value type.
        value_type: Box<ValueType>,
    },
    /// The mask of the array cannot be built.
    #[error("invalid mask: {0}")]
    InvalidMask(String),
    /// The scale of an unscaled view must be finite and non-zero.
    #[error("invalid unscale scale {0}, the scale must be finite and non-zero")]
    InvalidScale(f64),
    /// The operation requires a real numeric value type.
    #[error("the operation requires a real numeric value type, got {0}")]
    UnsupportedValueType(Box<ValueType>),
    /// An optional capability the array does not implement.
    #[error("{0} is not supported by this array")]
    UnsupportedMethod(&'static str),
    /// The progress callback aborted the operation.
    #[error("the operation was aborted")]
    Aborted,
    /// The array holds no valid element.
    #[error("the array holds no valid element")]
    NoValidData,
    /// A sidecar storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Array shapes that should match do not.
    #[error("array shape {got:?} does not match {expected:?}")]
    ShapeMismatch {
        /// The shape.
        got: Vec<u64>,
        /// The expected shape.
        expected: Vec<u64>,
    },
    /// A dimension error.
    #[error(transparent)]
    DimensionError(Box<DimensionError>),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<DimensionError> for ArrayError {
    fn from(err: DimensionError) -> Self {
        Self::DimensionError(Box::new(err))
    }
}

impl ArrayError {
    pub(crate) fn incompatible_value_types(from: &ValueType, to: &ValueType) -> Self {
        Self::IncompatibleValueTypes {
            from: Box::new(from.clone()),
            to: Box::new(to.clone()),
        }
    }
}
