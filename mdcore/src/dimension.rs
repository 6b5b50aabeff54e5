//! Dimensions.
//!
//! A [`Dimension`] is a named axis with a size, shared by every array that uses it.
//! A dimension may be labelled by an indexing variable, a 1-D array of coordinate values along the axis.
//! The link to the indexing variable is weak so an array indexing its own dimension does not form a reference cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::array::{ArrayError, MdArray};
use crate::join_full_name;

/// A dimension error.
#[derive(Clone, Debug, Error)]
pub enum DimensionError {
    /// The dimension has been deleted.
    #[error("dimension {0} has been deleted")]
    InvalidHandle(String),
    /// An indexing variable must be one-dimensional and indexed by the dimension.
    #[error("array {array} cannot index dimension {dimension}")]
    InvalidIndexingVariable {
        /// The array full name.
        array: String,
        /// The dimension full name.
        dimension: String,
    },
    /// An array using the dimension could not be resized.
    #[error("failed to resize array using dimension: {0}")]
    Resize(Box<ArrayError>),
}

/// A named axis.
#[derive(Debug)]
pub struct Dimension {
    name: RwLock<String>,
    full_name: RwLock<String>,
    dimension_type: String,
    direction: String,
    size: AtomicU64,
    indexing_variable: RwLock<Option<Weak<dyn MdArray>>>,
    users: Mutex<Vec<Weak<dyn MdArray>>>,
    valid: AtomicBool,
}

impl Dimension {
    /// Create a new dimension in the group with full name `parent_full_name`.
    ///
    /// `dimension_type` (e.g. `HORIZONTAL_X`, `TEMPORAL`) and `direction` (e.g. `EAST`, `FUTURE`) are free-form tags and may be empty.
    #[must_use]
    pub fn new(
        parent_full_name: &str,
        name: impl Into<String>,
        dimension_type: impl Into<String>,
        direction: impl Into<String>,
        size: u64,
    ) -> Arc<Self> {
        let name = name.into();
        Arc::new(Self {
            full_name: RwLock::new(join_full_name(parent_full_name, &name)),
            name: RwLock::new(name),
            dimension_type: dimension_type.into(),
            direction: direction.into(),
            size: AtomicU64::new(size),
            indexing_variable: RwLock::new(None),
            users: Mutex::new(Vec::new()),
            valid: AtomicBool::new(true),
        })
    }

    /// The name of the dimension.
    #[must_use]
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// The full name of the dimension, including the path of its group.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.full_name.read().clone()
    }

    /// The dimension type tag.
    #[must_use]
    pub fn dimension_type(&self) -> &str {
        &self.dimension_type
    }

    /// The direction tag.
    #[must_use]
    pub fn direction(&self) -> &str {
        &self.direction
    }

    /// The size of the dimension.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// Returns false if the dimension has been deleted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn check_valid(&self) -> Result<(), DimensionError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DimensionError::InvalidHandle(self.full_name()))
        }
    }

    /// The indexing variable of the dimension.
    ///
    /// Returns [`None`] if there is no indexing variable or it has been dropped.
    #[must_use]
    pub fn indexing_variable(&self) -> Option<Arc<dyn MdArray>> {
        self.indexing_variable
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Set (or clear) the indexing variable of the dimension.
    ///
    /// # Errors
    /// Returns a [`DimensionError`] if the dimension has been deleted or `array` is not a 1-D array of this dimension.
    pub fn set_indexing_variable(
        self: &Arc<Self>,
        array: Option<&Arc<dyn MdArray>>,
    ) -> Result<(), DimensionError> {
        self.check_valid()?;
        if let Some(array) = array {
            let dimensions = array.dimensions();
            if dimensions.len() != 1 || !Arc::ptr_eq(&dimensions[0], self) {
                return Err(DimensionError::InvalidIndexingVariable {
                    array: array.full_name(),
                    dimension: self.full_name(),
                });
            }
        }
        *self.indexing_variable.write() = array.map(Arc::downgrade);
        Ok(())
    }

    /// Rename the dimension.
    ///
    /// The owning group is responsible for name uniqueness, see [`MdGroup::rename_dimension`](crate::group::MdGroup::rename_dimension).
    ///
    /// # Errors
    /// Returns [`DimensionError::InvalidHandle`] if the dimension has been deleted.
    pub fn rename(&self, new_name: &str) -> Result<(), DimensionError> {
        self.check_valid()?;
        let mut full_name = self.full_name.write();
        let parent = full_name
            .rsplit_once('/')
            .map_or("", |(parent, _)| parent)
            .to_string();
        *full_name = join_full_name(&parent, new_name);
        *self.name.write() = new_name.to_string();
        Ok(())
    }

    /// Register `array` as a user of the dimension, so it is resized with the dimension.
    pub fn register_user(&self, array: Weak<dyn MdArray>) {
        let mut users = self.users.lock();
        users.retain(|user| user.strong_count() > 0);
        users.push(array);
    }

    /// Resize the dimension and every live array that uses it.
    ///
    /// Deleted arrays are no longer users and are ignored.
    ///
    /// # Errors
    /// Returns a [`DimensionError`] if the dimension has been deleted or an array using it cannot be resized.
    /// Arrays resized before the failure are restored to the current size, so the dimension and its users stay consistent.
    pub fn resize(&self, new_size: u64) -> Result<(), DimensionError> {
        self.check_valid()?;
        let users: Vec<Arc<dyn MdArray>> = {
            let mut users = self.users.lock();
            users.retain(|user| user.upgrade().is_some_and(|user| user.is_valid()));
            users.iter().filter_map(Weak::upgrade).collect()
        };
        let old_size = self.size();
        for (resized, user) in users.iter().enumerate() {
            if let Err(err) = user.on_dimension_resize(self, new_size) {
                for user in &users[..resized] {
                    if let Err(restore_err) = user.on_dimension_resize(self, old_size) {
                        log::warn!(
                            "failed to restore {} to size {old_size} of dimension {}: {restore_err}",
                            user.full_name(),
                            self.full_name()
                        );
                    }
                }
                return Err(DimensionError::Resize(Box::new(err)));
            }
        }
        self.size.store(new_size, Ordering::Release);
        Ok(())
    }

    /// Update the full name after the owning group was renamed.
    pub(crate) fn parent_renamed(&self, parent_full_name: &str) {
        *self.full_name.write() = join_full_name(parent_full_name, &self.name());
    }

    /// Mark the dimension as deleted.
    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_basics() {
        let dim = Dimension::new("/group", "time", "TEMPORAL", "FUTURE", 12);
        assert_eq!(dim.name(), "time");
        assert_eq!(dim.full_name(), "/group/time");
        assert_eq!(dim.dimension_type(), "TEMPORAL");
        assert_eq!(dim.direction(), "FUTURE");
        assert_eq!(dim.size(), 12);
        assert!(dim.indexing_variable().is_none());

        dim.rename("t").unwrap();
        assert_eq!(dim.full_name(), "/group/t");
        dim.parent_renamed("/other");
        assert_eq!(dim.full_name(), "/other/t");

        dim.resize(24).unwrap();
        assert_eq!(dim.size(), 24);

        dim.invalidate();
        assert!(matches!(dim.resize(1), Err(DimensionError::InvalidHandle(_))));
        assert!(dim.rename("u").is_err());
    }

    #[test]
    fn dimension_root() {
        let dim = Dimension::new("/", "x", "", "", 3);
        assert_eq!(dim.full_name(), "/x");
        dim.rename("y").unwrap();
        assert_eq!(dim.full_name(), "/y");
    }
}
