use std::fmt::Display;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NumericKind;

/// The layout of a single array element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// A numeric primitive.
    Numeric(NumericKind),
    /// A string held in a fixed-width slot of the given number of bytes.
    ///
    /// The slot holds UTF-8 bytes padded with trailing NUL bytes.
    /// An all-NUL slot is the null (empty) string.
    String(NonZeroUsize),
    /// A compound (struct-like) type.
    Compound(CompoundType),
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(kind) => write!(f, "{kind}"),
            Self::String(max_len) => write!(f, "string({max_len})"),
            Self::Compound(compound) => {
                write!(f, "compound {}{{", compound.name)?;
                for (i, component) in compound.components.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(
                        f,
                        "{}@{}: {}",
                        component.name, component.offset, component.value_type
                    )?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<NumericKind> for ValueType {
    fn from(kind: NumericKind) -> Self {
        Self::Numeric(kind)
    }
}

impl From<CompoundType> for ValueType {
    fn from(compound: CompoundType) -> Self {
        Self::Compound(compound)
    }
}

impl ValueType {
    /// Create a string value type with a slot of `max_len` bytes.
    #[must_use]
    pub const fn string(max_len: NonZeroUsize) -> Self {
        Self::String(max_len)
    }

    /// The size of an element in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Numeric(kind) => kind.size(),
            Self::String(max_len) => max_len.get(),
            Self::Compound(compound) => compound.size,
        }
    }

    /// Return the numeric kind if this is a numeric value type.
    #[must_use]
    pub const fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            Self::Numeric(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Return the compound type if this is a compound value type.
    #[must_use]
    pub const fn as_compound(&self) -> Option<&CompoundType> {
        match self {
            Self::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    /// Returns true if this is a numeric value type.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Returns true if values of this type can be converted to values of `other`.
    ///
    /// - numeric to numeric, numeric to string, string to numeric and string to string are always defined,
    /// - compound to compound is defined if every component of `other` has a same-named component in `self` that is itself convertible.
    #[must_use]
    pub fn can_convert_to(&self, other: &ValueType) -> bool {
        match (self, other) {
            (Self::Numeric(_) | Self::String(_), Self::Numeric(_) | Self::String(_)) => true,
            (Self::Compound(src), Self::Compound(dst)) => dst.components.iter().all(|dst_comp| {
                src.component(&dst_comp.name)
                    .is_some_and(|src_comp| src_comp.value_type.can_convert_to(&dst_comp.value_type))
            }),
            _ => false,
        }
    }

    /// Read the string held in `bytes` if this is a string value type.
    ///
    /// The string is copied out of the slot; the caller owns the returned value.
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    #[must_use]
    pub fn read_string(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::String(max_len) => {
                let slot = &bytes[..max_len.get().min(bytes.len())];
                let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
                Some(String::from_utf8_lossy(&slot[..end]).into_owned())
            }
            _ => None,
        }
    }

    /// Write `value` into the string slot `bytes`, truncating at a character boundary if it does not fit.
    ///
    /// Returns false if this is not a string value type or `bytes` is smaller than the slot.
    pub fn write_string(&self, bytes: &mut [u8], value: &str) -> bool {
        let Self::String(max_len) = self else {
            return false;
        };
        let max_len = max_len.get();
        if bytes.len() < max_len {
            return false;
        }
        let mut len = value.len().min(max_len);
        while !value.is_char_boundary(len) {
            len -= 1;
        }
        bytes[..len].copy_from_slice(&value.as_bytes()[..len]);
        bytes[len..max_len].fill(0);
        true
    }
}

/// A compound type invariant violation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompoundTypeError {
    /// A compound type needs at least one component.
    #[error("compound type `{0}` has no components")]
    NoComponents(String),
    /// A compound type needs a non-zero size.
    #[error("compound type `{0}` has a zero size")]
    ZeroSize(String),
    /// Component offsets must be non-decreasing.
    #[error("component `{component}` of compound type `{name}` has offset {offset} before the previous component")]
    DecreasingOffset {
        /// The compound type name.
        name: String,
        /// The offending component.
        component: String,
        /// The component offset.
        offset: usize,
    },
    /// A component extends past the end of the compound type.
    #[error("component `{component}` of compound type `{name}` ends at {end}, beyond the type size {size}")]
    ComponentOutOfBounds {
        /// The compound type name.
        name: String,
        /// The offending component.
        component: String,
        /// The end offset of the component.
        end: usize,
        /// The compound type size.
        size: usize,
    },
    /// Component names must be unique.
    #[error("compound type `{name}` has duplicate component `{component}`")]
    DuplicateComponent {
        /// The compound type name.
        name: String,
        /// The duplicated component name.
        component: String,
    },
}

/// A named, offset-located member of a [`CompoundType`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompoundComponent {
    name: String,
    offset: usize,
    value_type: ValueType,
}

impl CompoundComponent {
    /// Create a new compound component.
    #[must_use]
    pub fn new(name: impl Into<String>, offset: usize, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            offset,
            value_type,
        }
    }

    /// The component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The byte offset of the component within the compound element.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// The component value type.
    #[must_use]
    pub const fn value_type(&self) -> &ValueType {
        &self.value_type
    }
}

/// A struct-like value type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompoundType {
    name: String,
    size: usize,
    components: Vec<CompoundComponent>,
}

impl CompoundType {
    /// Create a new compound type.
    ///
    /// # Errors
    /// Returns a [`CompoundTypeError`] if
    ///  - `components` is empty or `size` is zero,
    ///  - component offsets are decreasing,
    ///  - a component extends beyond `size`, or
    ///  - component names are not unique.
    pub fn new(
        name: impl Into<String>,
        size: usize,
        components: Vec<CompoundComponent>,
    ) -> Result<Self, CompoundTypeError> {
        let name = name.into();
        if components.is_empty() {
            return Err(CompoundTypeError::NoComponents(name));
        }
        if size == 0 {
            return Err(CompoundTypeError::ZeroSize(name));
        }
        let mut previous_offset = 0;
        for (i, component) in components.iter().enumerate() {
            if component.offset < previous_offset {
                return Err(CompoundTypeError::DecreasingOffset {
                    name,
                    component: component.name.clone(),
                    offset: component.offset,
                });
            }
            previous_offset = component.offset;
            let end = component.offset.saturating_add(component.value_type.size());
            if end > size {
                return Err(CompoundTypeError::ComponentOutOfBounds {
                    name,
                    component: component.name.clone(),
                    end,
                    size,
                });
            }
            if components[..i].iter().any(|c| c.name == component.name) {
                return Err(CompoundTypeError::DuplicateComponent {
                    name,
                    component: component.name.clone(),
                });
            }
        }
        Ok(Self {
            name,
            size,
            components,
        })
    }

    /// Create a compound type with a single component `field` of `value_type` at offset zero.
    ///
    /// The compound type is exactly the size of `value_type`, so a buffer of `value_type` elements is also a buffer of these compound elements.
    #[must_use]
    pub fn single_field(field: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: String::new(),
            size: value_type.size(),
            components: vec![CompoundComponent::new(field, 0, value_type)],
        }
    }

    /// The compound type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The size of a compound element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// The components of the compound type.
    #[must_use]
    pub fn components(&self) -> &[CompoundComponent] {
        &self.components
    }

    /// Return the component named `name`.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&CompoundComponent> {
        self.components.iter().find(|c| c.name == name)
    }
}
