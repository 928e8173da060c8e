//! Error and result types shared by every layer of the map.

use thiserror::Error;

/// Errors produced by region, codec, and map operations.
#[derive(Debug, Error)]
pub enum MapError {
    /// The encoded record does not fit inside one slot.
    #[error("record of {needed} bytes does not fit in a {record_size}-byte slot")]
    RecordTooLarge {
        /// Bytes the record would occupy (status + both length prefixes + payloads).
        needed: u64,
        /// Configured slot width.
        record_size: u32,
    },
    /// Invalid construction or resize parameters.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A probe walk wrapped the whole table without resolving.
    #[error("probe from home slot {home} wrapped all {total} slots without resolving")]
    ProbeExhausted {
        /// Home slot the walk started from.
        home: u32,
        /// Number of slots in the table.
        total: u32,
    },
    /// Insert rejected because every slot already holds a live entry.
    #[error("table full: {capacity} live entries")]
    TableFull {
        /// Slot count of the table.
        capacity: u32,
    },
    /// A serializer failed to encode or decode a key or value.
    #[error("codec error: {0}")]
    Codec(String),
    /// An access fell outside the backing region.
    #[error("region access out of bounds: offset {offset}, len {len}, region size {size}")]
    OutOfBounds {
        /// Starting offset of the access.
        offset: usize,
        /// Length of the access.
        len: usize,
        /// Size of the region.
        size: usize,
    },
    /// Slot bytes that cannot have been written by this map.
    #[error("corruption: {0}")]
    Corruption(String),
    /// I/O failure from the allocator or while reading configuration.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MapError>;

impl MapError {
    pub(crate) fn codec(err: impl std::fmt::Display) -> Self {
        MapError::Codec(err.to_string())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        MapError::Config(msg.into())
    }
}
