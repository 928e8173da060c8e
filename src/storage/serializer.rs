//! Key and value encoders plugged into a map at construction.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{MapError, Result};

/// Converts one item type to and from bytes.
///
/// Implementations must be deterministic, and `deserialize(serialize(x))`
/// must return a value equal to `x`. Encoded lengths must fit in a `u32`.
pub trait Serializer: Send + Sync {
    /// Type handled by this serializer.
    type Item;

    /// Encodes `item`.
    fn serialize(&self, item: &Self::Item) -> Result<Vec<u8>>;

    /// Decodes bytes previously produced by [`Serializer::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Item>;
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        MapError::codec(format!(
            "{what} expects {N} bytes, found {}",
            bytes.len()
        ))
    })
}

/// Big-endian `u32`.
#[derive(Debug, Default, Clone, Copy)]
pub struct U32Serializer;

impl Serializer for U32Serializer {
    type Item = u32;

    fn serialize(&self, item: &u32) -> Result<Vec<u8>> {
        Ok(item.to_be_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<u32> {
        fixed::<4>(bytes, "u32").map(u32::from_be_bytes)
    }
}

/// Big-endian `u64`.
#[derive(Debug, Default, Clone, Copy)]
pub struct U64Serializer;

impl Serializer for U64Serializer {
    type Item = u64;

    fn serialize(&self, item: &u64) -> Result<Vec<u8>> {
        Ok(item.to_be_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<u64> {
        fixed::<8>(bytes, "u64").map(u64::from_be_bytes)
    }
}

/// Big-endian two's complement `i64`.
#[derive(Debug, Default, Clone, Copy)]
pub struct I64Serializer;

impl Serializer for I64Serializer {
    type Item = i64;

    fn serialize(&self, item: &i64) -> Result<Vec<u8>> {
        Ok(item.to_be_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<i64> {
        fixed::<8>(bytes, "i64").map(i64::from_be_bytes)
    }
}

/// UTF-8 strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringSerializer;

impl Serializer for StringSerializer {
    type Item = String;

    fn serialize(&self, item: &String) -> Result<Vec<u8>> {
        Ok(item.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(MapError::codec)
    }
}

/// Raw byte vectors, stored unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesSerializer;

impl Serializer for BytesSerializer {
    type Item = Vec<u8>;

    fn serialize(&self, item: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(item.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// Any serde type, encoded as JSON.
pub struct JsonSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    /// Creates a JSON serializer for `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonSerializer")
    }
}

impl<T> Serializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    type Item = T;

    fn serialize(&self, item: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(item).map_err(MapError::codec)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(MapError::codec)
    }
}
