use std::sync::Arc;

use serde_json::Value;

use crate::chunk_grid::CheckedRegion;
use crate::data_type::{NumericKind, NumericValue, ValueType, copy_value};
use crate::dimension::Dimension;
use crate::options::{AdviseReadOptions, MaskOptions};
use crate::storage::SpatialRef;
use crate::Attributes;

use super::{dense_len, dense_region, scatter};
use crate::array::{ArrayError, ArrayRef, MdArray};

/// A flag test: `(v & mask) == value`, `v == value` or `(v & mask) == mask` depending on which parts are present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FlagRule {
    value: Option<u64>,
    mask: Option<u64>,
}

impl FlagRule {
    fn matches(self, bits: u64) -> bool {
        match (self.value, self.mask) {
            (Some(value), Some(mask)) => bits & mask == value,
            (Some(value), None) => bits == value,
            (None, Some(mask)) => bits & mask == mask,
            (None, None) => false,
        }
    }
}

/// The predicates an element must satisfy to be valid.
#[derive(Clone, Debug, Default, PartialEq)]
struct Validity {
    nodata: Option<f64>,
    missing_value: Option<f64>,
    fill_value: Option<f64>,
    valid_min: Option<f64>,
    valid_max: Option<f64>,
    flags: Vec<FlagRule>,
}

impl Validity {
    fn is_trivial(&self) -> bool {
        *self == Self::default()
    }

    fn is_valid(&self, value: NumericValue) -> bool {
        let v = value.to_f64();
        if v.is_nan()
            || self.nodata == Some(v)
            || self.missing_value == Some(v)
            || self.fill_value == Some(v)
            || self.valid_min.is_some_and(|min| v < min)
            || self.valid_max.is_some_and(|max| v > max)
        {
            return false;
        }
        if self.flags.is_empty() {
            return true;
        }
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let bits = match value {
            NumericValue::UInt(v) => v,
            NumericValue::Int(v) => v as u64,
            NumericValue::Float(v) | NumericValue::Complex(v, _) => v as i64 as u64,
        };
        self.flags.iter().any(|rule| rule.matches(bits))
    }
}

fn attribute_number(attributes: &Attributes, name: &str) -> Option<f64> {
    match attributes.get(name)? {
        Value::Number(number) => number.as_f64(),
        Value::Array(values) => match values.as_slice() {
            [Value::Number(number)] => number.as_f64(),
            _ => {
                log::warn!("ignoring attribute {name}, expected a single number");
                None
            }
        },
        _ => {
            log::warn!("ignoring attribute {name}, expected a number");
            None
        }
    }
}

#[allow(clippy::cast_sign_loss)]
fn attribute_integers(attributes: &Attributes, name: &str) -> Option<Vec<u64>> {
    let integer = |value: &Value| {
        value
            .as_u64()
            .or_else(|| value.as_i64().map(|value| value as u64))
    };
    match attributes.get(name)? {
        Value::Array(values) => values.iter().map(integer).collect(),
        value => integer(value).map(|value| vec![value]),
    }
}

/// Collect the flag rules of the flags named in `allowed_flags`.
fn flag_rules(
    attributes: &Attributes,
    allowed_flags: &[String],
) -> Result<Vec<FlagRule>, ArrayError> {
    let meanings: Vec<&str> = match attributes.get("flag_meanings") {
        Some(Value::String(meanings)) => meanings.split_whitespace().collect(),
        _ => {
            return Err(ArrayError::InvalidMask(
                "flags are allowed but the flag_meanings attribute is missing".to_string(),
            ));
        }
    };
    let values = attribute_integers(attributes, "flag_values");
    let masks = attribute_integers(attributes, "flag_masks");
    if values.is_none() && masks.is_none() {
        return Err(ArrayError::InvalidMask(
            "flags are allowed but neither flag_values nor flag_masks is a list of integers"
                .to_string(),
        ));
    }
    for (name, list) in [("flag_values", &values), ("flag_masks", &masks)] {
        if list.as_ref().is_some_and(|list| list.len() != meanings.len()) {
            return Err(ArrayError::InvalidMask(format!(
                "{name} and flag_meanings have different lengths"
            )));
        }
    }
    allowed_flags
        .iter()
        .map(|flag| {
            let index = meanings
                .iter()
                .position(|meaning| meaning == flag)
                .ok_or_else(|| ArrayError::InvalidMask(format!("unknown flag {flag}")))?;
            Ok(FlagRule {
                value: values.as_ref().map(|values| values[index]),
                mask: masks.as_ref().map(|masks| masks[index]),
            })
        })
        .collect()
}

/// A view of the validity of the elements of a parent array, `1` if valid and `0` otherwise.
///
/// An element is valid if it is not NaN, does not equal the nodata value or the `missing_value` or `_FillValue` attributes,
/// lies within `valid_min`/`valid_max` (or `valid_range`), and matches one of the allowed flags if any are given in [`MaskOptions`].
///
/// The mask is read-only and has the value type [`UInt8`](NumericKind::UInt8).
/// Only the dimensions and spatial reference of the parent apply to the mask.
#[derive(Debug)]
pub struct MaskedArray {
    parent: ArrayRef,
    value_type: ValueType,
    validity: Validity,
}

impl MaskedArray {
    /// Create a new masked view of `parent`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `parent` is not real numeric, or flags are allowed but the flag attributes of `parent` are missing, malformed, or do not name them.
    pub fn new(parent: ArrayRef, options: &MaskOptions) -> Result<Self, ArrayError> {
        parent.check_valid()?;
        let kind = parent
            .value_type()
            .numeric_kind()
            .filter(|kind| !kind.is_complex())
            .ok_or_else(|| ArrayError::UnsupportedValueType(Box::new(parent.value_type().clone())))?;
        let attributes = parent.attributes();

        let mut validity = Validity {
            nodata: parent.nodata_as_f64(),
            missing_value: attribute_number(&attributes, "missing_value"),
            fill_value: attribute_number(&attributes, "_FillValue"),
            ..Default::default()
        };
        if let Some(valid_range) = attributes.get("valid_range") {
            match valid_range.as_array().map(Vec::as_slice) {
                Some([min, max]) if min.is_number() && max.is_number() => {
                    validity.valid_min = min.as_f64();
                    validity.valid_max = max.as_f64();
                }
                _ => log::warn!("ignoring attribute valid_range, expected two numbers"),
            }
        }
        if attributes.contains_key("valid_min") {
            validity.valid_min = attribute_number(&attributes, "valid_min");
        }
        if attributes.contains_key("valid_max") {
            validity.valid_max = attribute_number(&attributes, "valid_max");
        }
        if !options.allowed_flags.is_empty() {
            if !kind.is_integer() {
                return Err(ArrayError::InvalidMask(format!(
                    "flags require an integer value type, got {kind}"
                )));
            }
            validity.flags = flag_rules(&attributes, &options.allowed_flags)?;
        }

        Ok(Self {
            parent,
            value_type: NumericKind::UInt8.into(),
            validity,
        })
    }

    /// The parent array.
    #[must_use]
    pub fn parent(&self) -> &ArrayRef {
        &self.parent
    }

    /// Returns true if `value`, an element of the parent, is valid.
    pub(crate) fn is_valid_value(&self, value: NumericValue) -> bool {
        self.validity.is_valid(value)
    }
}

impl MdArray for MaskedArray {
    fn name(&self) -> String {
        self.parent.name()
    }

    fn full_name(&self) -> String {
        format!("{}.mask", self.parent.full_name())
    }

    fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    fn dimensions(&self) -> Vec<Arc<Dimension>> {
        self.parent.dimensions()
    }

    fn block_size(&self) -> Vec<u64> {
        self.parent.block_size()
    }

    fn spatial_ref(&self) -> Option<SpatialRef> {
        self.parent.spatial_ref()
    }

    fn is_valid(&self) -> bool {
        self.parent.is_valid()
    }

    fn read_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        let parent_type = self.parent.value_type();
        let Some(kind) = parent_type.numeric_kind() else {
            return Err(ArrayError::UnsupportedValueType(Box::new(parent_type.clone())));
        };
        if kind.is_integer() && self.validity.is_trivial() {
            for (_, offset) in region.dense_offsets(buffer_type.size()) {
                copy_value(&[1], &self.value_type, &mut buffer[offset..], buffer_type)?;
            }
            return Ok(());
        }

        let mut values = vec![0; dense_len(region, parent_type)?];
        self.parent
            .read(&dense_region(region), parent_type, &mut values)?;
        let mask = values
            .chunks_exact(kind.size())
            .map(|bytes| {
                NumericValue::read(kind, bytes).map(|value| u8::from(self.validity.is_valid(value)))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        scatter(region, &mask, &self.value_type, buffer, buffer_type)
    }

    fn advise_read_impl(
        &self,
        region: &CheckedRegion,
        options: &AdviseReadOptions,
    ) -> Result<(), ArrayError> {
        self.parent
            .advise_read(Some(region.start()), Some(region.count()), options)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn masked_flag_rule() {
        let both = FlagRule {
            value: Some(0b0100),
            mask: Some(0b1100),
        };
        assert!(both.matches(0b0101));
        assert!(!both.matches(0b1100));
        let value = FlagRule {
            value: Some(3),
            mask: None,
        };
        assert!(value.matches(3));
        assert!(!value.matches(7));
        let mask = FlagRule {
            value: None,
            mask: Some(0b0011),
        };
        assert!(mask.matches(0b0111));
        assert!(!mask.matches(0b0101));
    }

    #[test]
    fn masked_flag_rules() {
        let mut attributes = Attributes::new();
        attributes.insert("flag_meanings".to_string(), json!("clear cloud shadow"));
        attributes.insert("flag_values".to_string(), json!([0, 1, 2]));
        let rules = flag_rules(&attributes, &["clear".to_string(), "shadow".to_string()]).unwrap();
        assert_eq!(
            rules,
            vec![
                FlagRule {
                    value: Some(0),
                    mask: None
                },
                FlagRule {
                    value: Some(2),
                    mask: None
                }
            ]
        );
        assert!(flag_rules(&attributes, &["snow".to_string()]).is_err());

        attributes.insert("flag_masks".to_string(), json!([1, 2]));
        assert!(flag_rules(&attributes, &["clear".to_string()]).is_err());
    }

    #[test]
    fn masked_validity() {
        let validity = Validity {
            nodata: Some(-1.0),
            valid_min: Some(0.0),
            valid_max: Some(10.0),
            ..Default::default()
        };
        assert!(validity.is_valid(NumericValue::Float(5.0)));
        assert!(!validity.is_valid(NumericValue::Float(f64::NAN)));
        assert!(!validity.is_valid(NumericValue::Int(-1)));
        assert!(!validity.is_valid(NumericValue::Int(11)));
        assert!(validity.is_valid(NumericValue::UInt(10)));
    }
}
