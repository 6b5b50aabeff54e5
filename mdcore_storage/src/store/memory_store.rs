//! An in-memory sidecar store.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::{SidecarKey, SidecarStorageTraits, SpatialRef, Statistics, StorageError};

/// An in-memory sidecar store.
#[derive(Debug, Default)]
pub struct MemorySidecarStore {
    statistics: Mutex<BTreeMap<SidecarKey, Statistics>>,
    spatial_refs: Mutex<BTreeMap<SidecarKey, SpatialRef>>,
}

impl MemorySidecarStore {
    /// Create a new memory sidecar store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statistics.lock().is_empty() && self.spatial_refs.lock().is_empty()
    }
}

impl SidecarStorageTraits for MemorySidecarStore {
    fn get_statistics(&self, key: &SidecarKey) -> Result<Option<Statistics>, StorageError> {
        Ok(self.statistics.lock().get(key).copied())
    }

    fn set_statistics(
        &self,
        key: &SidecarKey,
        statistics: Option<Statistics>,
    ) -> Result<(), StorageError> {
        let mut map = self.statistics.lock();
        match statistics {
            Some(statistics) => {
                map.insert(key.clone(), statistics);
            }
            None => {
                map.remove(key);
            }
        }
        Ok(())
    }

    fn get_spatial_ref(&self, key: &SidecarKey) -> Result<Option<SpatialRef>, StorageError> {
        Ok(self.spatial_refs.lock().get(key).cloned())
    }

    fn set_spatial_ref(
        &self,
        key: &SidecarKey,
        spatial_ref: Option<SpatialRef>,
    ) -> Result<(), StorageError> {
        let mut map = self.spatial_refs.lock();
        match spatial_ref {
            Some(spatial_ref) => {
                map.insert(key.clone(), spatial_ref);
            }
            None => {
                map.remove(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::SidecarStorage;

    #[test]
    fn memory_sidecar_store() {
        let store: SidecarStorage = Arc::new(MemorySidecarStore::new());
        let key = SidecarKey::new("/a", "");
        let other = SidecarKey::new("/a", "masked");
        assert!(store.get_statistics(&key).unwrap().is_none());

        let statistics = Statistics {
            min: 1.0,
            max: 2.0,
            mean: 1.5,
            std_dev: 0.5,
            valid_count: 2,
        };
        store.set_statistics(&key, Some(statistics)).unwrap();
        assert_eq!(store.get_statistics(&key).unwrap(), Some(statistics));
        assert!(store.get_statistics(&other).unwrap().is_none());
        store.set_statistics(&key, None).unwrap();
        assert!(store.get_statistics(&key).unwrap().is_none());

        let srs = SpatialRef::new("EPSG:32633", 2);
        store.set_spatial_ref(&other, Some(srs.clone())).unwrap();
        assert_eq!(store.get_spatial_ref(&other).unwrap(), Some(srs));
        store.set_spatial_ref(&other, None).unwrap();
        assert!(store.get_spatial_ref(&other).unwrap().is_none());
    }
}
