use crate::primitives::bytes::{be, buf::Cursor};
use crate::types::{MapError, Result};

/// Width of the status byte at the start of every slot.
pub const STATUS_LEN: usize = 1;
/// Width of each length prefix.
pub const LEN_PREFIX: usize = be::U32_LEN;
/// Fixed bytes per record on top of key and value payloads.
pub const RECORD_OVERHEAD: u64 = (STATUS_LEN + 2 * LEN_PREFIX) as u64;

/// State byte at the head of each slot.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SlotStatus {
    /// Never written, or reset by a clear.
    Empty = 1,
    /// Holds a live record.
    Occupied = 2,
    /// Tombstone: a removed record that still extends probe chains.
    Deleted = 3,
}

impl SlotStatus {
    /// Parses a status byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(Self::Empty),
            2 => Ok(Self::Occupied),
            3 => Ok(Self::Deleted),
            other => Err(MapError::Corruption(format!(
                "unknown slot status: 0x{other:02X}"
            ))),
        }
    }

    /// Returns the on-region byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Bytes a record with the given payload lengths occupies.
pub fn record_len(key_len: usize, value_len: usize) -> u64 {
    RECORD_OVERHEAD + key_len as u64 + value_len as u64
}

/// Rejects records that would not leave at least one spare byte in a slot.
pub fn check_fits(key: &[u8], value: &[u8], record_size: u32) -> Result<()> {
    let needed = record_len(key.len(), value.len());
    if needed >= u64::from(record_size) {
        return Err(MapError::RecordTooLarge {
            needed,
            record_size,
        });
    }
    Ok(())
}

/// Encodes `[status][key len][key][value len][value]`.
///
/// Callers run [`check_fits`] first, which also bounds both lengths to `u32`.
pub fn encode_record(status: SlotStatus, key: &[u8], value: &[u8]) -> Result<Vec<u8>> {
    let key_len = u32::try_from(key.len())
        .map_err(|_| MapError::codec(format!("key of {} bytes exceeds u32", key.len())))?;
    let value_len = u32::try_from(value.len())
        .map_err(|_| MapError::codec(format!("value of {} bytes exceeds u32", value.len())))?;
    let mut buffer = Vec::with_capacity(record_len(key.len(), value.len()) as usize);
    buffer.push(status.to_byte());
    be::push_u32_be(&mut buffer, key_len);
    buffer.extend_from_slice(key);
    be::push_u32_be(&mut buffer, value_len);
    buffer.extend_from_slice(value);
    Ok(buffer)
}

/// Reads the status byte of a slot.
pub fn decode_header(slot: &[u8]) -> Result<SlotStatus> {
    let byte = slot
        .first()
        .copied()
        .ok_or_else(|| MapError::Corruption("empty slot slice".into()))?;
    SlotStatus::from_byte(byte)
}

/// Borrows the key bytes and returns the offset just past them.
pub fn decode_key(slot: &[u8]) -> Result<(&[u8], usize)> {
    let mut cur = Cursor::at(slot, STATUS_LEN);
    let key = cur.take_prefixed()?;
    Ok((key, cur.off))
}

/// Returns the offset of the value length prefix without touching key bytes.
pub fn skip_key(slot: &[u8]) -> Result<usize> {
    let mut cur = Cursor::at(slot, STATUS_LEN);
    let key_len = cur.take_u32()? as usize;
    cur.skip(key_len)?;
    Ok(cur.off)
}

/// Borrows the value bytes whose length prefix starts at `value_off`.
pub fn decode_value(slot: &[u8], value_off: usize) -> Result<&[u8]> {
    Cursor::at(slot, value_off).take_prefixed()
}
