//! The sidecar metadata storage interface for the [`mdcore`](https://docs.rs/mdcore/latest/mdcore/index.html) crate.
//!
//! Some array metadata is derived rather than intrinsic and is persisted next to the data by an external collaborator:
//!  - cached [`Statistics`], and
//!  - the [`SpatialRef`] of an array.
//!
//! `mdcore` only needs to get and set these by array path and a free-form context string.
//! The [`SidecarStorageTraits`] trait is that interface; it does not define a persistence format.
//!
//! This crate includes an in-memory implementation, [`MemorySidecarStore`](store::MemorySidecarStore).
//!
//! ## Licence
//! `mdcore_storage` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

pub mod store;

use std::sync::Arc;

use auto_impl::auto_impl;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// [`Arc`] wrapped sidecar storage.
pub type SidecarStorage = Arc<dyn SidecarStorageTraits>;

/// The key of a sidecar entry: an array full path and a context.
///
/// The context distinguishes entries of the same array, such as statistics computed over different views.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{path}[{context}]")]
pub struct SidecarKey {
    path: String,
    context: String,
}

impl SidecarKey {
    /// Create a new sidecar key.
    #[must_use]
    pub fn new(path: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            context: context.into(),
        }
    }

    /// The array full path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The context.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Statistics of the valid elements of an array.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// The minimum value.
    pub min: f64,
    /// The maximum value.
    pub max: f64,
    /// The mean value.
    pub mean: f64,
    /// The population standard deviation.
    pub std_dev: f64,
    /// The number of valid elements.
    pub valid_count: u64,
}

/// A spatial reference system and the mapping of array axes to its axes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialRef {
    definition: String,
    data_axis_to_srs_axis_mapping: Vec<i32>,
}

impl SpatialRef {
    /// Create a new spatial reference from a definition (e.g. WKT) with an identity axis mapping for `dimensionality` axes.
    #[must_use]
    pub fn new(definition: impl Into<String>, dimensionality: usize) -> Self {
        Self {
            definition: definition.into(),
            data_axis_to_srs_axis_mapping: (1..=dimensionality)
                .map(|axis| i32::try_from(axis).unwrap_or(i32::MAX))
                .collect(),
        }
    }

    /// Set the data axis to SRS axis mapping.
    ///
    /// Entry `i` is the 1-based SRS axis of array axis `i`, or `0` if the array axis is not an SRS axis.
    #[must_use]
    pub fn with_axis_mapping(mut self, data_axis_to_srs_axis_mapping: Vec<i32>) -> Self {
        self.data_axis_to_srs_axis_mapping = data_axis_to_srs_axis_mapping;
        self
    }

    /// The definition.
    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// The data axis to SRS axis mapping.
    #[must_use]
    pub fn data_axis_to_srs_axis_mapping(&self) -> &[i32] {
        &self.data_axis_to_srs_axis_mapping
    }
}

/// A sidecar storage error.
#[derive(Clone, Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only sidecar store.
    #[error("a write operation was attempted on a read only sidecar store")]
    ReadOnly,
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// The sidecar metadata get/set interface.
#[auto_impl(Arc)]
pub trait SidecarStorageTraits: std::fmt::Debug + Send + Sync {
    /// Get the cached statistics for `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on an underlying storage failure.
    fn get_statistics(&self, key: &SidecarKey) -> Result<Option<Statistics>, StorageError>;

    /// Set the cached statistics for `key`, or clear them if `statistics` is [`None`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] on an underlying storage failure.
    fn set_statistics(
        &self,
        key: &SidecarKey,
        statistics: Option<Statistics>,
    ) -> Result<(), StorageError>;

    /// Get the spatial reference for `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on an underlying storage failure.
    fn get_spatial_ref(&self, key: &SidecarKey) -> Result<Option<SpatialRef>, StorageError>;

    /// Set the spatial reference for `key`, or clear it if `spatial_ref` is [`None`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] on an underlying storage failure.
    fn set_spatial_ref(
        &self,
        key: &SidecarKey,
        spatial_ref: Option<SpatialRef>,
    ) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_key() {
        let key = SidecarKey::new("/group/temperature", "masked");
        assert_eq!(key.path(), "/group/temperature");
        assert_eq!(key.context(), "masked");
        assert_eq!(key.to_string(), "/group/temperature[masked]");
    }

    #[test]
    fn spatial_ref_mapping() {
        let srs = SpatialRef::new("EPSG:4326", 2);
        assert_eq!(srs.data_axis_to_srs_axis_mapping(), &[1, 2]);
        let srs = srs.with_axis_mapping(vec![2, 1]);
        assert_eq!(srs.definition(), "EPSG:4326");
        assert_eq!(srs.data_axis_to_srs_axis_mapping(), &[2, 1]);
    }

    #[test]
    fn statistics_serde() {
        let statistics = Statistics {
            min: 0.0,
            max: 7.0,
            mean: 3.5,
            std_dev: 2.25,
            valid_count: 8,
        };
        let json = serde_json::to_string(&statistics).unwrap();
        assert_eq!(
            json,
            r#"{"min":0.0,"max":7.0,"mean":3.5,"std_dev":2.25,"valid_count":8}"#
        );
        assert_eq!(serde_json::from_str::<Statistics>(&json).unwrap(), statistics);
    }
}
