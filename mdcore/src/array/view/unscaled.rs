use std::sync::Arc;

use crate::chunk_grid::CheckedRegion;
use crate::data_type::{NumericKind, NumericValue, ValueType};
use crate::dimension::Dimension;
use crate::options::{AdviseReadOptions, UnscaleOptions};
use crate::storage::SpatialRef;

use super::{dense_region, forward_parent_metadata, gather, scatter};
use crate::array::{ArrayError, ArrayRef, MdArray};

/// A view presenting the physical values of a parent array: `physical = raw * scale + offset`.
///
/// Values are presented as [`Float64`](NumericKind::Float64), or [`ComplexFloat64`](NumericKind::ComplexFloat64) for a complex parent.
/// The offset applies to the real part only.
///
/// Raw nodata values are not transformed and read as the nodata value of the view, which defaults to NaN.
/// Writing the nodata value of the view writes the raw nodata value.
#[derive(Debug)]
pub struct UnscaledArray {
    parent: ArrayRef,
    value_type: ValueType,
    scale: f64,
    offset: f64,
    nodata: f64,
}

/// Returns true if `a` and `b` are equal or both NaN.
fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl UnscaledArray {
    /// Create a new unscaled view of `parent`.
    ///
    /// The scale and offset default to those of `parent`, or `1` and `0` if it has none.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnsupportedValueType`] if `parent` is not numeric, or [`ArrayError::InvalidScale`] if the scale is zero or not finite.
    pub fn new(parent: ArrayRef, options: &UnscaleOptions) -> Result<Self, ArrayError> {
        parent.check_valid()?;
        let kind = parent
            .value_type()
            .numeric_kind()
            .ok_or_else(|| ArrayError::UnsupportedValueType(Box::new(parent.value_type().clone())))?;
        let value_type = if kind.is_complex() {
            NumericKind::ComplexFloat64
        } else {
            NumericKind::Float64
        };
        let scale = options.scale.or_else(|| parent.scale()).unwrap_or(1.0);
        if scale == 0.0 || !scale.is_finite() {
            return Err(ArrayError::InvalidScale(scale));
        }
        Ok(Self {
            value_type: value_type.into(),
            scale,
            offset: options.offset.or_else(|| parent.offset()).unwrap_or(0.0),
            nodata: options.nodata.unwrap_or(f64::NAN),
            parent,
        })
    }

    /// The parent array.
    #[must_use]
    pub fn parent(&self) -> &ArrayRef {
        &self.parent
    }

    fn components(&self) -> usize {
        self.value_type.size() / size_of::<f64>()
    }

    /// The raw nodata value of the parent as `(real, imaginary)`.
    fn parent_nodata(&self) -> Option<(f64, f64)> {
        let kind = self.parent.value_type().numeric_kind()?;
        let nodata = self.parent.raw_nodata()?;
        NumericValue::read(kind, &nodata)
            .ok()
            .map(NumericValue::to_complex)
    }

    fn temporary(&self, region: &CheckedRegion) -> Result<Vec<f64>, ArrayError> {
        let len = region
            .num_elements()
            .checked_mul(self.components())
            .ok_or_else(|| ArrayError::Other("temporary buffer size overflow".to_string()))?;
        Ok(vec![0.0; len])
    }
}

impl MdArray for UnscaledArray {
    fn name(&self) -> String {
        self.parent.name()
    }

    fn full_name(&self) -> String {
        format!("{}.unscaled", self.parent.full_name())
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

    forward_parent_metadata!();

    fn raw_nodata(&self) -> Option<Vec<u8>> {
        self.parent.raw_nodata()?;
        Some(
            std::iter::repeat_n(self.nodata, self.components())
                .flat_map(f64::to_ne_bytes)
                .collect(),
        )
    }

    fn spatial_ref(&self) -> Option<SpatialRef> {
        self.parent.spatial_ref()
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
        let mut values = self.temporary(region)?;
        self.parent.read(
            &dense_region(region),
            &self.value_type,
            bytemuck::cast_slice_mut(&mut values),
        )?;

        let parent_nodata = self.parent_nodata();
        for value in values.chunks_exact_mut(self.components()) {
            let is_nodata = parent_nodata.is_some_and(|(re, im)| {
                same_value(value[0], re) && value.get(1).is_none_or(|&v| same_value(v, im))
            });
            if is_nodata {
                value.fill(self.nodata);
            } else {
                for v in value.iter_mut() {
                    *v *= self.scale;
                }
                value[0] += self.offset;
            }
        }

        scatter(
            region,
            bytemuck::cast_slice(&values),
            &self.value_type,
            buffer,
            buffer_type,
        )
    }

    fn write_impl(
        &self,
        region: &CheckedRegion,
        buffer_type: &ValueType,
        buffer: &[u8],
    ) -> Result<(), ArrayError> {
        let mut values = self.temporary(region)?;
        gather(
            region,
            buffer,
            buffer_type,
            bytemuck::cast_slice_mut(&mut values),
            &self.value_type,
        )?;

        // Nodata is detected in double precision, before the parent narrows to its raw type.
        let parent_nodata = self.parent_nodata();
        for value in values.chunks_exact_mut(self.components()) {
            match parent_nodata {
                Some((re, im)) if value.iter().all(|&v| same_value(v, self.nodata)) => {
                    value[0] = re;
                    if let Some(v) = value.get_mut(1) {
                        *v = im;
                    }
                }
                _ => {
                    value[0] -= self.offset;
                    for v in value.iter_mut() {
                        *v /= self.scale;
                    }
                }
            }
        }

        self.parent.write(
            &dense_region(region),
            &self.value_type,
            bytemuck::cast_slice(&values),
        )
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
