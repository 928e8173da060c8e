//! Fixed-capacity, open-addressed hash map stored in a single raw memory
//! region, with pluggable key and value serializers.
//!
//! ```
//! use regionmap::storage::serializer::{StringSerializer, U64Serializer};
//! use regionmap::storage::RegionMap;
//!
//! let mut map = RegionMap::new(64, 128, StringSerializer, U64Serializer)?;
//! map.put(&"answer".to_string(), &42)?;
//! assert_eq!(map.get(&"answer".to_string())?, Some(42));
//! # Ok::<(), regionmap::types::MapError>(())
//! ```

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::{MapOptions, RegionMap};
pub use types::{MapError, Result};
