//! Groups.
//!
//! An [`MdGroup`] is a named container of arrays, dimensions, attributes and sub-groups forming a hierarchy.
//! Backends implement the read-only methods and may implement the mutating ones, which default to [`GroupError::UnsupportedMethod`].
//!
//! Functions operating on whole hierarchies (full-name resolution, tree copy) are in [`hierarchy`](crate::hierarchy).

use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::array::{ArrayError, ArrayRef};
use crate::data_type::ValueType;
use crate::dimension::{Dimension, DimensionError};
use crate::options::ExtensionOptions;
use crate::storage::SidecarStorage;
use crate::Attributes;

/// [`Arc`] wrapped group.
pub type GroupRef = Arc<dyn MdGroup>;

/// A group error.
#[derive(Clone, Debug, Error)]
pub enum GroupError {
    /// The group, or one of its ancestors, has been deleted.
    #[error("group {0} has been deleted")]
    InvalidHandle(String),
    /// An object was not found.
    #[error("{0} not found")]
    NotFound(String),
    /// An object with the same name already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// An invalid object name.
    #[error("invalid name `{0}`, names must be non-empty and must not contain `/`")]
    InvalidName(String),
    /// An optional capability the group does not implement.
    #[error("{0} is not supported by this group")]
    UnsupportedMethod(&'static str),
    /// An array error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    /// A dimension error.
    #[error(transparent)]
    DimensionError(#[from] DimensionError),
    /// The progress callback aborted the operation.
    #[error("the operation was aborted")]
    Aborted,
    /// A non-strict copy could not copy any array.
    #[error("failed to copy {0}")]
    CopyFailed(String),
}

/// Check that `name` is a valid object name.
///
/// # Errors
/// Returns [`GroupError::InvalidName`] if `name` is empty or contains `/`.
pub fn validate_name(name: &str) -> Result<(), GroupError> {
    if name.is_empty() || name.contains('/') {
        Err(GroupError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// A group of arrays, dimensions, attributes and sub-groups.
pub trait MdGroup: Debug + Send + Sync {
    /// The name of the group, `/` for the root group.
    fn name(&self) -> String;

    /// The full name of the group, `/` for the root group.
    fn full_name(&self) -> String;

    /// Returns false if the group, or one of its ancestors, has been deleted.
    fn is_valid(&self) -> bool {
        true
    }

    /// Check that the group is valid.
    ///
    /// # Errors
    /// Returns [`GroupError::InvalidHandle`] if the group has been deleted.
    fn check_valid(&self) -> Result<(), GroupError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(GroupError::InvalidHandle(self.full_name()))
        }
    }

    /// The attributes of the group.
    fn attributes(&self) -> Attributes {
        Attributes::new()
    }

    /// Set the attribute `name`.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if attributes cannot be set.
    fn set_attribute(&self, _name: &str, _value: serde_json::Value) -> Result<(), GroupError> {
        Err(GroupError::UnsupportedMethod("set_attribute"))
    }

    /// Delete the attribute `name`.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if attributes cannot be deleted.
    fn delete_attribute(&self, _name: &str) -> Result<(), GroupError> {
        Err(GroupError::UnsupportedMethod("delete_attribute"))
    }

    /// The names of the sub-groups.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the group is not valid.
    fn group_names(&self) -> Result<Vec<String>, GroupError>;

    /// Open the sub-group `name`.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the group is not valid.
    fn open_group(&self, name: &str) -> Result<Option<GroupRef>, GroupError>;

    /// The names of the arrays.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the group is not valid.
    fn array_names(&self) -> Result<Vec<String>, GroupError>;

    /// Open the array `name`.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the group is not valid.
    fn open_array(&self, name: &str) -> Result<Option<ArrayRef>, GroupError>;

    /// The dimensions declared in the group.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the group is not valid.
    fn dimensions(&self) -> Result<Vec<Arc<Dimension>>, GroupError> {
        self.check_valid()?;
        Ok(Vec::new())
    }

    /// Create the sub-group `name` with backend-specific `options`.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if sub-groups cannot be created.
    fn create_group_with_options(
        &self,
        _name: &str,
        _options: &ExtensionOptions,
    ) -> Result<GroupRef, GroupError> {
        Err(GroupError::UnsupportedMethod("create_group"))
    }

    /// Create the sub-group `name`.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the sub-group cannot be created.
    fn create_group(&self, name: &str) -> Result<GroupRef, GroupError> {
        self.create_group_with_options(name, &ExtensionOptions::new())
    }

    /// Delete the sub-group `name`, invalidating it and everything it holds.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if sub-groups cannot be deleted.
    fn delete_group(&self, _name: &str) -> Result<(), GroupError> {
        Err(GroupError::UnsupportedMethod("delete_group"))
    }

    /// Create the dimension `name`.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if dimensions cannot be created.
    fn create_dimension(
        &self,
        _name: &str,
        _dimension_type: &str,
        _direction: &str,
        _size: u64,
    ) -> Result<Arc<Dimension>, GroupError> {
        Err(GroupError::UnsupportedMethod("create_dimension"))
    }

    /// Rename the dimension `name` to `new_name`.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if dimensions cannot be renamed.
    fn rename_dimension(&self, _name: &str, _new_name: &str) -> Result<(), GroupError> {
        Err(GroupError::UnsupportedMethod("rename_dimension"))
    }

    /// Create the array `name` with backend-specific `options`.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if arrays cannot be created.
    fn create_array_with_options(
        &self,
        _name: &str,
        _dimensions: &[Arc<Dimension>],
        _value_type: ValueType,
        _options: &ExtensionOptions,
    ) -> Result<ArrayRef, GroupError> {
        Err(GroupError::UnsupportedMethod("create_array"))
    }

    /// Create the array `name`.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if the array cannot be created.
    fn create_array(
        &self,
        name: &str,
        dimensions: &[Arc<Dimension>],
        value_type: ValueType,
    ) -> Result<ArrayRef, GroupError> {
        self.create_array_with_options(name, dimensions, value_type, &ExtensionOptions::new())
    }

    /// Delete the array `name`, invalidating it.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if arrays cannot be deleted.
    fn delete_array(&self, _name: &str) -> Result<(), GroupError> {
        Err(GroupError::UnsupportedMethod("delete_array"))
    }

    /// Rename the group, updating the full names of everything it holds.
    ///
    /// # Errors
    /// Returns [`GroupError::UnsupportedMethod`] if the group cannot be renamed.
    fn rename(&self, _new_name: &str) -> Result<(), GroupError> {
        Err(GroupError::UnsupportedMethod("rename"))
    }

    /// The sidecar storage of the arrays in the group.
    fn sidecar(&self) -> Option<SidecarStorage> {
        None
    }
}
