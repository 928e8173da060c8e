//! Low-level primitives the map is built on.
//!
//! Includes byte utilities and the raw memory region abstraction.

/// Byte-level utilities and encoding/decoding.
///
/// Big-endian length prefixes and a bounds-checked parsing cursor.
pub mod bytes;

/// Raw memory regions and the allocators that produce them.
///
/// A region is one contiguous block of bytes with explicit-offset access
/// and an explicit release.
pub mod region;
