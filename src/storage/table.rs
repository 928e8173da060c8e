//! Slot-level engine: probe walks and scans over encoded key/value bytes.
//!
//! The table knows nothing about key or value types. Callers hash the key
//! themselves, pass the home slot plus serialized bytes, and decode what
//! comes back.

use tracing::{trace, warn};

use crate::primitives::region::{Region, RegionAllocator};
use crate::storage::probe::ProbeSeq;
use crate::storage::record::{self, SlotStatus};
use crate::types::{MapError, Result};

/// Outcome of a probe walk plus the number of slots it visited.
#[derive(Debug)]
pub(crate) struct Walk<T> {
    pub(crate) outcome: T,
    pub(crate) probes: u32,
}

/// What an insert did to the table.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Insert<T> {
    /// A live record for the key was overwritten; carries the decoded old value.
    Replaced(T),
    /// The key was not live and now is.
    Inserted { slot: u32 },
}

/// Bytes needed for `total` slots of `record_size`, or a config error if
/// either is zero or the product exceeds `ceiling`.
pub(crate) fn region_size(record_size: u32, total: u32, ceiling: u64) -> Result<usize> {
    if record_size == 0 {
        return Err(MapError::config("record_size must be positive"));
    }
    if total == 0 {
        return Err(MapError::config("total_elements must be positive"));
    }
    let bytes = u64::from(record_size) * u64::from(total);
    if bytes > ceiling {
        return Err(MapError::config(format!(
            "{total} slots of {record_size} bytes need {bytes} bytes, above the {ceiling}-byte limit"
        )));
    }
    usize::try_from(bytes).map_err(|_| MapError::config(format!("{bytes} bytes is not addressable")))
}

pub(crate) struct Table {
    region: Box<dyn Region>,
    record_size: u32,
    total: u32,
    num_elements: u32,
    // bumped each time an insert reaches an EMPTY slot; never decremented
    num_spots: u64,
}

impl Table {
    pub(crate) fn allocate(
        allocator: &dyn RegionAllocator,
        record_size: u32,
        total: u32,
        max_region_bytes: u64,
    ) -> Result<Self> {
        let ceiling = max_region_bytes.min(allocator.max_region_bytes());
        let size = region_size(record_size, total, ceiling)?;
        let region = allocator.allocate(size, SlotStatus::Empty.to_byte())?;
        Ok(Self {
            region,
            record_size,
            total,
            num_elements: 0,
            num_spots: 0,
        })
    }

    pub(crate) fn record_size(&self) -> u32 {
        self.record_size
    }

    pub(crate) fn total(&self) -> u32 {
        self.total
    }

    pub(crate) fn num_elements(&self) -> u32 {
        self.num_elements
    }

    pub(crate) fn num_spots(&self) -> u64 {
        self.num_spots
    }

    pub(crate) fn region_bytes(&self) -> usize {
        self.region.len()
    }

    pub(crate) fn backing(&self) -> &'static str {
        self.region.backing()
    }

    #[inline]
    fn slot_offset(&self, slot: u32) -> usize {
        slot as usize * self.record_size as usize
    }

    pub(crate) fn slot(&self, slot: u32) -> Result<&[u8]> {
        self.region
            .read(self.slot_offset(slot), self.record_size as usize)
    }

    pub(crate) fn status(&self, slot: u32) -> Result<SlotStatus> {
        let raw = self.region.read(self.slot_offset(slot), record::STATUS_LEN)?;
        record::decode_header(raw)
    }

    /// Value bytes of the record in `slot`, skipping the key without copying it.
    pub(crate) fn value_at(&self, slot: u32) -> Result<&[u8]> {
        let bytes = self.slot(slot)?;
        let value_off = record::skip_key(bytes)?;
        record::decode_value(bytes, value_off)
    }

    fn write_record(&mut self, slot: u32, key: &[u8], value: &[u8]) -> Result<()> {
        let encoded = record::encode_record(SlotStatus::Occupied, key, value)?;
        let off = self.slot_offset(slot);
        self.region.write(off, &encoded)
    }

    fn mark(&mut self, slot: u32, status: SlotStatus) -> Result<()> {
        let off = self.slot_offset(slot);
        self.region.write(off, &[status.to_byte()])
    }

    /// Locates the live slot holding `key`.
    ///
    /// The walk stops at the first EMPTY slot, and also at the key's own
    /// tombstone: a key is never live past its tombstone on the same chain.
    pub(crate) fn find(&self, home: u32, key: &[u8]) -> Result<Walk<Option<u32>>> {
        let mut seq = ProbeSeq::new(home, self.total);
        while let Some(slot) = seq.next() {
            let bytes = self.slot(slot)?;
            let status = record::decode_header(bytes)?;
            if status == SlotStatus::Empty {
                return Ok(self.resolved(home, &seq, None));
            }
            let (stored, _) = record::decode_key(bytes)?;
            if stored == key {
                let hit = (status == SlotStatus::Occupied).then_some(slot);
                return Ok(self.resolved(home, &seq, hit));
            }
        }
        warn!(home, total = self.total, "lookup probe exhausted");
        Err(seq.exhausted())
    }

    fn resolved<T>(&self, home: u32, seq: &ProbeSeq, outcome: T) -> Walk<T> {
        trace!(home, probes = seq.probes(), "probe resolved");
        Walk {
            outcome,
            probes: seq.probes(),
        }
    }

    /// Writes `key -> value`, reusing the first tombstone seen before the
    /// terminating EMPTY slot.
    ///
    /// When a live record is overwritten, `decode` sees its value bytes
    /// before the slot is rewritten; a decode error leaves the table as it was.
    pub(crate) fn insert<T>(
        &mut self,
        home: u32,
        key: &[u8],
        value: &[u8],
        decode: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<Walk<Insert<T>>> {
        record::check_fits(key, value, self.record_size)?;
        if self.num_elements >= self.total {
            warn!(capacity = self.total, "insert rejected, table full");
            return Err(MapError::TableFull {
                capacity: self.total,
            });
        }

        let mut first_deleted: Option<u32> = None;
        let mut seq = ProbeSeq::new(home, self.total);
        while let Some(slot) = seq.next() {
            let bytes = self.slot(slot)?;
            let status = record::decode_header(bytes)?;
            match status {
                SlotStatus::Empty => {
                    let target = first_deleted.unwrap_or(slot);
                    self.write_record(target, key, value)?;
                    self.num_elements += 1;
                    self.num_spots += 1;
                    return Ok(self.resolved(home, &seq, Insert::Inserted { slot: target }));
                }
                SlotStatus::Occupied => {
                    let (stored, value_off) = record::decode_key(bytes)?;
                    if stored == key {
                        let previous = decode(record::decode_value(bytes, value_off)?)?;
                        self.write_record(slot, key, value)?;
                        return Ok(self.resolved(home, &seq, Insert::Replaced(previous)));
                    }
                }
                SlotStatus::Deleted => {
                    let (stored, _) = record::decode_key(bytes)?;
                    if stored == key {
                        self.write_record(slot, key, value)?;
                        self.num_elements += 1;
                        return Ok(self.resolved(home, &seq, Insert::Inserted { slot }));
                    }
                    if first_deleted.is_none() {
                        first_deleted = Some(slot);
                    }
                }
            }
        }
        warn!(home, total = self.total, "insert probe exhausted");
        Err(seq.exhausted())
    }

    /// Turns the live record for `key` into a tombstone, returning its value
    /// as decoded by `decode`. The tombstone is only written once decoding succeeds.
    pub(crate) fn remove<T>(
        &mut self,
        home: u32,
        key: &[u8],
        decode: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<Walk<Option<T>>> {
        let walk = self.find(home, key)?;
        let Some(slot) = walk.outcome else {
            return Ok(Walk {
                outcome: None,
                probes: walk.probes,
            });
        };
        let previous = decode(self.value_at(slot)?)?;
        self.mark(slot, SlotStatus::Deleted)?;
        self.num_elements -= 1;
        Ok(Walk {
            outcome: Some(previous),
            probes: walk.probes,
        })
    }

    /// Physical scan over slots `0..total` yielding live slot bytes.
    pub(crate) fn occupied(&self) -> OccupiedSlots<'_> {
        OccupiedSlots {
            table: self,
            next: 0,
        }
    }

    pub(crate) fn count_tombstones(&self) -> Result<u32> {
        let mut tombstones = 0;
        for slot in 0..self.total {
            if self.status(slot)? == SlotStatus::Deleted {
                tombstones += 1;
            }
        }
        Ok(tombstones)
    }

    /// Zeroes both counters and marks every slot header EMPTY.
    pub(crate) fn reset(&mut self) -> Result<()> {
        for slot in 0..self.total {
            let off = self.slot_offset(slot);
            self.region
                .fill(off, record::STATUS_LEN, SlotStatus::Empty.to_byte())?;
        }
        self.num_elements = 0;
        self.num_spots = 0;
        Ok(())
    }

    pub(crate) fn release(self) {
        self.region.release();
    }
}

/// Iterator returned by [`Table::occupied`].
pub(crate) struct OccupiedSlots<'a> {
    table: &'a Table,
    next: u32,
}

impl<'a> Iterator for OccupiedSlots<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.table.total {
            let slot = self.next;
            self.next += 1;
            let bytes = match self.table.slot(slot) {
                Ok(bytes) => bytes,
                Err(err) => return Some(Err(err)),
            };
            match record::decode_header(bytes) {
                Ok(SlotStatus::Occupied) => return Some(Ok(bytes)),
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}
