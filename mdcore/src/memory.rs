//! An in-memory backend.
//!
//! [`MemoryGroup`] and [`MemoryArray`] implement the full [`MdGroup`](crate::group::MdGroup) and [`MdArray`](crate::array::MdArray) interfaces, including the optional mutating methods.
//! They are useful for tests, as copy destinations, and as scratch hierarchies.

mod memory_array;
mod memory_group;

pub use memory_array::{MemoryArray, SPATIAL_REF_CONTEXT};
pub use memory_group::MemoryGroup;
