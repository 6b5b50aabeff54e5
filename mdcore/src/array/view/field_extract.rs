use std::sync::Arc;

use crate::chunk_grid::{ArrayRegion, CheckedRegion};
use crate::data_type::{CompoundType, ValueType, copy_value};
use crate::dimension::Dimension;
use crate::options::AdviseReadOptions;
use crate::storage::SpatialRef;

use crate::array::{ArrayError, ArrayRef, MdArray};

/// A read-only view of one field of a compound parent array.
///
/// Reads delegate to the parent with a single-field compound buffer type, so the parent converts the field itself.
#[derive(Debug)]
pub struct FieldExtractArray {
    parent: ArrayRef,
    field: String,
    value_type: ValueType,
}

impl FieldExtractArray {
    /// Create a new view of the field `field` of `parent`.
    ///
    /// # Errors
    /// Returns [`ArrayError::UnknownField`] if the value type of `parent` is not a compound type with the field `field`.
    pub fn new(parent: ArrayRef, field: &str) -> Result<Self, ArrayError> {
        parent.check_valid()?;
        let value_type = parent
            .value_type()
            .as_compound()
            .and_then(|compound| compound.component(field))
            .map(|component| component.value_type().clone())
            .ok_or_else(|| ArrayError::UnknownField {
                field: field.to_string(),
                value_type: Box::new(parent.value_type().clone()),
            })?;
        Ok(Self {
            parent,
            field: field.to_string(),
            value_type,
        })
    }

    /// The parent array.
    #[must_use]
    pub fn parent(&self) -> &ArrayRef {
        &self.parent
    }

    /// The name of the extracted field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    fn single_field_type(&self, value_type: &ValueType) -> ValueType {
        CompoundType::single_field(self.field.clone(), value_type.clone()).into()
    }
}

impl MdArray for FieldExtractArray {
    fn name(&self) -> String {
        format!("{}.{}", self.parent.name(), self.field)
    }

    fn full_name(&self) -> String {
        format!("{}[\"{}\"]", self.parent.full_name(), self.field)
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

    fn raw_nodata(&self) -> Option<Vec<u8>> {
        let parent_nodata = self.parent.raw_nodata()?;
        let mut nodata = vec![0; self.value_type.size()];
        copy_value(
            &parent_nodata,
            self.parent.value_type(),
            &mut nodata,
            &self.single_field_type(&self.value_type),
        )
        .ok()?;
        Some(nodata)
    }

    fn unit(&self) -> String {
        self.parent.unit()
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
        let region = ArrayRegion::from(region.clone());
        self.parent
            .read(&region, &self.single_field_type(buffer_type), buffer)
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
