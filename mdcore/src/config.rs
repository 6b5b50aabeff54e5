//! `mdcore` global configuration options.
//!
//! See [`Config`] for the list of options.

use std::sync::LazyLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

/// Global configuration options for the `mdcore` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Processing Chunk Memory
/// > default: 100 MiB
///
/// The memory budget in bytes of the temporary buffers used by chunked operations, such as [`copy_array_data`](crate::array::copy_array_data) and [`compute_statistics`](crate::statistics::compute_statistics), unless overridden by the operation options.
///
/// ## Default Block Size
/// > default: `256`
///
/// The natural block extent assumed along an axis for which a backend reports a block size of `0`.
///
/// ## Regular Spacing Tolerance
/// > default: `1e-3`
///
/// The relative tolerance used by [`is_regularly_spaced`](crate::array::is_regularly_spaced) when comparing consecutive steps against the mean step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    processing_chunk_memory: usize,
    default_block_size: u64,
    regular_spacing_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processing_chunk_memory: 100 * 1024 * 1024,
            default_block_size: 256,
            regular_spacing_tolerance: 1e-3,
        }
    }
}

impl Config {
    /// Get the [processing chunk memory](#processing-chunk-memory) configuration.
    #[must_use]
    pub const fn processing_chunk_memory(&self) -> usize {
        self.processing_chunk_memory
    }

    /// Set the [processing chunk memory](#processing-chunk-memory) configuration.
    pub fn set_processing_chunk_memory(&mut self, processing_chunk_memory: usize) -> &mut Self {
        self.processing_chunk_memory = processing_chunk_memory.max(1);
        self
    }

    /// Get the [default block size](#default-block-size) configuration.
    #[must_use]
    pub const fn default_block_size(&self) -> u64 {
        self.default_block_size
    }

    /// Set the [default block size](#default-block-size) configuration.
    pub fn set_default_block_size(&mut self, default_block_size: u64) -> &mut Self {
        self.default_block_size = default_block_size.max(1);
        self
    }

    /// Get the [regular spacing tolerance](#regular-spacing-tolerance) configuration.
    #[must_use]
    pub const fn regular_spacing_tolerance(&self) -> f64 {
        self.regular_spacing_tolerance
    }

    /// Set the [regular spacing tolerance](#regular-spacing-tolerance) configuration.
    ///
    /// Negative or NaN tolerances are treated as zero.
    pub fn set_regular_spacing_tolerance(&mut self, regular_spacing_tolerance: f64) -> &mut Self {
        self.regular_spacing_tolerance = if regular_spacing_tolerance > 0.0 {
            regular_spacing_tolerance
        } else {
            0.0
        };
        self
    }
}

static CONFIG: LazyLock<RwLock<Config>> = LazyLock::new(|| RwLock::new(Config::default()));

/// Returns a reference to the global `mdcore` configuration.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.read()
}

/// Returns a mutable reference to the global `mdcore` configuration.
///
/// Hold the guard only for as long as needed, other threads block on the configuration while it is held.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.write()
}
