#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod group;
mod group_array;
mod partition;

/// A HashMap built on the grouped [`HashTable`].
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

/// A HashSet built on the grouped [`HashTable`].
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

/// The raw grouped table: values are placed by a caller-supplied 32-bit hash
/// and found with a caller-supplied equality closure.
pub mod hash_table;

pub mod hashing;

pub use group::GROUP_WIDTH;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use hashing::DefaultHashBuilder;
pub use hashing::UniversalHashBuilder;
