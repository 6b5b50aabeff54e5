//! Per-operation options.
//!
//! Each option struct has named, defaulted fields.
//! Backend-specific knobs with no typed counterpart go in the free-form `extensions` map, which `mdcore` itself never interprets.

use std::collections::BTreeMap;

use crate::config::global_config;

/// Free-form backend-specific options.
pub type ExtensionOptions = BTreeMap<String, String>;

fn chunk_memory_or_default(chunk_memory: Option<usize>) -> usize {
    chunk_memory.unwrap_or_else(|| global_config().processing_chunk_memory())
}

/// Options for copying array data and group trees.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Abort on the first failure if true, otherwise skip failing children and continue.
    pub strict: bool,
    /// The memory budget of the temporary copy buffer in bytes.
    ///
    /// Defaults to the [processing chunk memory](crate::config::Config#processing-chunk-memory).
    pub chunk_memory: Option<usize>,
    /// Backend-specific options forwarded to array and group creation.
    pub extensions: ExtensionOptions,
}

impl CopyOptions {
    /// Create copy options with the given strictness.
    #[must_use]
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Default::default()
        }
    }

    /// The effective chunk memory budget in bytes.
    #[must_use]
    pub fn chunk_memory(&self) -> usize {
        chunk_memory_or_default(self.chunk_memory)
    }
}

/// Options for computing and caching statistics.
#[derive(Debug, Clone, Default)]
pub struct StatisticsOptions {
    /// Compute the statistics if they are not cached.
    pub force: bool,
    /// The memory budget of the temporary buffers in bytes.
    ///
    /// Defaults to the [processing chunk memory](crate::config::Config#processing-chunk-memory).
    pub chunk_memory: Option<usize>,
}

impl StatisticsOptions {
    /// The effective chunk memory budget in bytes.
    #[must_use]
    pub fn chunk_memory(&self) -> usize {
        chunk_memory_or_default(self.chunk_memory)
    }
}

/// Options for creating a [`MaskedArray`](crate::array::MaskedArray).
#[derive(Debug, Clone, Default)]
pub struct MaskOptions {
    /// The names of the flags (from the `flag_meanings` attribute) that mark an element as valid.
    ///
    /// If empty, flag attributes are ignored.
    pub allowed_flags: Vec<String>,
    /// Backend-specific options.
    pub extensions: ExtensionOptions,
}

/// Options for creating an [`UnscaledArray`](crate::array::UnscaledArray).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnscaleOptions {
    /// Overrides the scale of the parent array.
    pub scale: Option<f64>,
    /// Overrides the offset of the parent array.
    pub offset: Option<f64>,
    /// The nodata value of the unscaled array (default NaN).
    pub nodata: Option<f64>,
}

/// Options for read-ahead hints.
#[derive(Debug, Clone, Default)]
pub struct AdviseReadOptions {
    /// The memory budget a backend may use to cache the advised region, in bytes.
    ///
    /// Defaults to the [processing chunk memory](crate::config::Config#processing-chunk-memory).
    pub chunk_memory: Option<usize>,
    /// Backend-specific options.
    pub extensions: ExtensionOptions,
}

impl AdviseReadOptions {
    /// The effective memory budget in bytes.
    #[must_use]
    pub fn chunk_memory(&self) -> usize {
        chunk_memory_or_default(self.chunk_memory)
    }
}
