//! `mdcore` is the core engine of a multidimensional, typed, chunked array data model.
//!
//! Arrays have labelled axes ([`Dimension`](dimension::Dimension)s), attributes and a [`ValueType`](data_type::ValueType), and are organised into a hierarchy of groups.
//! The crate provides:
//!  - a portable value model of numeric, string and compound element types with conversion rules ([`data_type`]),
//!  - bounds-checked, overflow-safe strided hyper-rectangle [`read`](array::MdArray::read) and [`write`](array::MdArray::write) between arrays and caller buffers,
//!  - decomposition of requests into chunks under a memory budget ([`chunk_grid`]),
//!  - lazy, zero-copy views: [slicing](array::ArrayViewExt::view), [transposition](array::ArrayViewExt::transpose), [unscaling](array::ArrayViewExt::unscaled), [masking](array::ArrayViewExt::mask) and [field extraction](array::ArrayViewExt::field),
//!  - a hierarchical namespace of [groups](group::MdGroup) with full-path resolution and recursive tree copy ([`hierarchy`]),
//!  - streaming [statistics] with a cache held by a [sidecar store](storage::SidecarStorageTraits).
//!
//! Backends implement [`MdArray`](array::MdArray) and [`MdGroup`](group::MdGroup).
//! An in-memory backend is included in [`memory`].
//!
//! ## Example
//! ```
//! # use std::sync::Arc;
//! use mdcore::array::{ArrayViewExt, MdArray, MdArrayExt};
//! use mdcore::chunk_grid::ArrayRegion;
//! use mdcore::data_type::NumericKind;
//! use mdcore::group::MdGroup;
//! use mdcore::memory::MemoryGroup;
//!
//! let root = MemoryGroup::new_root();
//! let x = root.create_dimension("x", "", "", 8)?;
//! let array = root.create_array("values", &[x], NumericKind::Int32.into())?;
//! array.write_elements(&ArrayRegion::new(vec![0], vec![8]), &[0i32, 1, 2, 3, 4, 5, 6, 7])?;
//!
//! let view = array.view("[2:6:2]")?;
//! assert_eq!(view.read_all_elements::<i32>()?, vec![2, 4]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `mdcore` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

pub mod array;
pub mod config;
pub mod dimension;
pub mod group;
pub mod hierarchy;
pub mod memory;
pub mod options;
pub mod progress;
pub mod statistics;

pub use mdcore_chunk_grid as chunk_grid;
pub use mdcore_data_type as data_type;
pub use mdcore_storage as storage;

/// Array and group attributes.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Join a parent full name and a child name into a child full name.
pub(crate) fn join_full_name(parent_full_name: &str, name: &str) -> String {
    if parent_full_name.is_empty() || parent_full_name == "/" {
        format!("/{name}")
    } else {
        format!("{parent_full_name}/{name}")
    }
}
