#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod hash_map;
pub mod hash_set;
pub mod hash_table;

pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
#[cfg(feature = "stats")]
pub use hash_table::ProbeStats;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Default [`core::hash::BuildHasher`] for [`HashMap`] and
        /// [`HashSet`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Default [`core::hash::BuildHasher`] for [`HashMap`] and
        /// [`HashSet`].
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        /// Placeholder hash builder; enable the `foldhash` feature (or
        /// `std`) for a usable default, or supply a hasher via
        /// `with_hasher`.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}
