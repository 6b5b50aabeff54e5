//! The value type model for the [`mdcore`](https://docs.rs/mdcore/latest/mdcore/index.html) crate.
//!
//! A [`ValueType`] describes the in-memory layout of a single array element:
//!  - a [`Numeric`](ValueType::Numeric) primitive ([`NumericKind`]),
//!  - a [`String`](ValueType::String) stored in a fixed-width, NUL-padded UTF-8 slot, or
//!  - a [`Compound`](ValueType::Compound) (struct-like) type built from named, offset-located [`CompoundComponent`]s.
//!
//! Values are converted between value types with [`copy_value`] and [`copy_values`].
//! All numeric values are stored in native endianness.
//!
//! ## Licence
//! `mdcore_data_type` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod convert;
mod format;
mod numeric_kind;
mod value_type;

pub use convert::{NumericValue, ValueConversionError, copy_value, copy_values};
pub use format::format_significant;
pub use numeric_kind::NumericKind;
pub use value_type::{CompoundComponent, CompoundType, CompoundTypeError, ValueType};
