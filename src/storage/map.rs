use std::collections::HashSet;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::storage::metrics::{MapMetrics, NoopMetrics};
use crate::storage::options::MapOptions;
use crate::storage::probe::{self, SipBuildHasher};
use crate::storage::record;
use crate::storage::serializer::Serializer;
use crate::storage::table::{Insert, OccupiedSlots, Table};
use crate::types::{MapError, Result};

/// Fixed-capacity open-addressed hash map whose slots live in one raw region.
///
/// Keys and values are stored as bytes produced by the supplied
/// serializers. Mutations take `&mut self`; lookups and scans take `&self`
/// and never move a shared cursor, so they may run from several threads
/// at once when no mutation is in flight.
pub struct RegionMap<KS, VS, S = SipBuildHasher> {
    table: Table,
    key_ser: KS,
    value_ser: VS,
    hasher: S,
    options: MapOptions,
    metrics: Arc<dyn MapMetrics>,
}

/// Counters and occupancy of a map at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapStats {
    /// Slot count.
    pub total_elements: u32,
    /// Bytes per slot.
    pub record_size: u32,
    /// Live keys.
    pub num_elements: u32,
    /// Inserts that reached an EMPTY slot since construction or the last clear.
    pub num_spots: u64,
    /// Slots currently marked DELETED.
    pub tombstones: u32,
    /// Live keys over slot count.
    pub load_factor: f64,
    /// Backing store of the region.
    pub backing: &'static str,
}

impl<KS, VS> RegionMap<KS, VS, SipBuildHasher>
where
    KS: Serializer,
    KS::Item: Hash + Eq,
    VS: Serializer,
{
    /// Creates a heap-backed map of `total_elements` slots of `record_size` bytes.
    pub fn new(record_size: u32, total_elements: u32, key_ser: KS, value_ser: VS) -> Result<Self> {
        Self::with_options(MapOptions::new(record_size, total_elements), key_ser, value_ser)
    }

    /// Creates a map from explicit options.
    pub fn with_options(options: MapOptions, key_ser: KS, value_ser: VS) -> Result<Self> {
        Self::with_hasher(options, key_ser, value_ser, SipBuildHasher::default())
    }
}

impl<KS, VS, S> RegionMap<KS, VS, S>
where
    KS: Serializer,
    KS::Item: Hash + Eq,
    VS: Serializer,
    S: BuildHasher,
{
    /// Creates a map that places keys with `hasher`.
    pub fn with_hasher(options: MapOptions, key_ser: KS, value_ser: VS, hasher: S) -> Result<Self> {
        options.validate()?;
        let table = Table::allocate(
            options.allocator.as_ref(),
            options.record_size,
            options.total_elements,
            options.ceiling(),
        )?;
        debug!(
            record_size = options.record_size,
            total_elements = options.total_elements,
            backing = table.backing(),
            "region map created"
        );
        let metrics = options
            .metrics
            .clone()
            .unwrap_or_else(|| Arc::new(NoopMetrics));
        Ok(Self {
            table,
            key_ser,
            value_ser,
            hasher,
            options,
            metrics,
        })
    }

    #[inline]
    fn home(&self, key: &KS::Item) -> u32 {
        probe::home_slot(&self.hasher, key, self.table.total())
    }

    /// Stores `value` under `key`, returning the value it replaced.
    ///
    /// Fails with [`MapError::RecordTooLarge`] or [`MapError::TableFull`]
    /// before touching the region. A replaced value is decoded before its
    /// slot is rewritten, so a codec error also leaves the map unchanged.
    pub fn put(&mut self, key: &KS::Item, value: &VS::Item) -> Result<Option<VS::Item>> {
        let key_bytes = self.key_ser.serialize(key)?;
        let value_bytes = self.value_ser.serialize(value)?;
        let home = self.home(key);
        let value_ser = &self.value_ser;
        let walk = self
            .table
            .insert(home, &key_bytes, &value_bytes, |old| value_ser.deserialize(old))?;
        self.metrics.record_probe(walk.probes);
        match walk.outcome {
            Insert::Replaced(previous) => {
                self.metrics.record_put(false);
                Ok(Some(previous))
            }
            Insert::Inserted { slot } => {
                trace!(slot, "key inserted");
                self.metrics.record_put(true);
                Ok(None)
            }
        }
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &KS::Item) -> Result<Option<VS::Item>> {
        let key_bytes = self.key_ser.serialize(key)?;
        let walk = self.table.find(self.home(key), &key_bytes)?;
        self.metrics.record_probe(walk.probes);
        self.metrics.record_get(walk.outcome.is_some());
        match walk.outcome {
            Some(slot) => {
                let value = self.table.value_at(slot)?;
                self.value_ser.deserialize(value).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Removes `key`, leaving a tombstone, and returns its value.
    pub fn delete(&mut self, key: &KS::Item) -> Result<Option<VS::Item>> {
        let key_bytes = self.key_ser.serialize(key)?;
        let home = self.home(key);
        let value_ser = &self.value_ser;
        let walk = self
            .table
            .remove(home, &key_bytes, |bytes| value_ser.deserialize(bytes))?;
        self.metrics.record_probe(walk.probes);
        self.metrics.record_delete(walk.outcome.is_some());
        Ok(walk.outcome)
    }

    /// Returns true if `key` is live.
    pub fn contains_key(&self, key: &KS::Item) -> Result<bool> {
        let key_bytes = self.key_ser.serialize(key)?;
        let walk = self.table.find(self.home(key), &key_bytes)?;
        Ok(walk.outcome.is_some())
    }

    /// Returns true if any live entry holds `value`. Scans every slot.
    pub fn contains_value(&self, value: &VS::Item) -> Result<bool>
    where
        VS::Item: PartialEq,
    {
        for slot in self.table.occupied() {
            let bytes = slot?;
            let value_off = record::skip_key(bytes)?;
            let stored = self.value_ser.deserialize(record::decode_value(bytes, value_off)?)?;
            if stored == *value {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Snapshot of the live keys.
    pub fn key_set(&self) -> Result<HashSet<KS::Item>> {
        let mut keys = HashSet::with_capacity(self.len() as usize);
        for slot in self.table.occupied() {
            let (key, _) = record::decode_key(slot?)?;
            keys.insert(self.key_ser.deserialize(key)?);
        }
        Ok(keys)
    }

    /// Snapshot of the live values in slot order.
    pub fn values(&self) -> Result<Vec<VS::Item>> {
        let mut values = Vec::with_capacity(self.len() as usize);
        for slot in self.table.occupied() {
            let bytes = slot?;
            let value_off = record::skip_key(bytes)?;
            values.push(self.value_ser.deserialize(record::decode_value(bytes, value_off)?)?);
        }
        Ok(values)
    }

    /// Snapshot of the live entries in slot order.
    pub fn entry_set(&self) -> Result<Vec<(KS::Item, VS::Item)>> {
        self.iter().collect()
    }

    /// Lazily decodes live entries in slot order.
    pub fn iter(&self) -> Entries<'_, KS, VS> {
        Entries {
            slots: self.table.occupied(),
            key_ser: &self.key_ser,
            value_ser: &self.value_ser,
        }
    }

    /// Drops every entry and tombstone, keeping the region.
    pub fn clear(&mut self) -> Result<()> {
        self.table.reset()?;
        debug!(total_elements = self.table.total(), "region map cleared");
        Ok(())
    }

    /// Rehashes live entries into a region `factor` times larger, consuming
    /// this handle. The old region is released once migration completes.
    pub fn resize(mut self, factor: u32) -> Result<Self> {
        self.resize_in_place(factor)?;
        Ok(self)
    }

    /// Rehashes live entries into a region `factor` times larger.
    ///
    /// All-or-nothing: on error the map keeps its current region and
    /// contents. A factor of 1 only compacts tombstones away.
    pub fn resize_in_place(&mut self, factor: u32) -> Result<()> {
        if factor == 0 {
            return Err(MapError::config("resize factor must be positive"));
        }
        let old_total = self.table.total();
        let new_total = old_total.checked_mul(factor).ok_or_else(|| {
            MapError::config(format!("{old_total} slots times {factor} overflows u32"))
        })?;
        let tombstones = self.table.count_tombstones()?;
        info!(
            old_slots = old_total,
            new_slots = new_total,
            live = self.table.num_elements(),
            tombstones,
            "region map: resizing"
        );

        let mut next = Table::allocate(
            self.options.allocator.as_ref(),
            self.table.record_size(),
            new_total,
            self.options.ceiling(),
        )?;
        let mut migrated = 0u32;
        for slot in self.table.occupied() {
            let bytes = slot?;
            let (key_bytes, value_off) = record::decode_key(bytes)?;
            let value_bytes = record::decode_value(bytes, value_off)?;
            let key = self.key_ser.deserialize(key_bytes)?;
            let home = probe::home_slot(&self.hasher, &key, new_total);
            // keys are unique in the old table, so nothing is ever replaced here
            next.insert(home, key_bytes, value_bytes, |_| Ok(()))?;
            migrated += 1;
        }

        let old = std::mem::replace(&mut self.table, next);
        old.release();
        self.options.total_elements = new_total;
        self.metrics.record_resize(migrated);
        info!(
            migrated,
            new_slots = new_total,
            tombstones_dropped = tombstones,
            load_factor = format!("{:.2}", f64::from(migrated) / f64::from(new_total)),
            "region map: resize complete"
        );
        Ok(())
    }

    /// Counters plus a tombstone count from a full scan.
    pub fn stats(&self) -> Result<MapStats> {
        Ok(MapStats {
            total_elements: self.table.total(),
            record_size: self.table.record_size(),
            num_elements: self.table.num_elements(),
            num_spots: self.table.num_spots(),
            tombstones: self.table.count_tombstones()?,
            load_factor: f64::from(self.table.num_elements()) / f64::from(self.table.total()),
            backing: self.table.backing(),
        })
    }
}

impl<KS, VS, S> RegionMap<KS, VS, S> {
    /// Live keys.
    pub fn len(&self) -> u32 {
        self.table.num_elements()
    }

    /// Returns true if no key is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts that reached an EMPTY slot; never decreased by deletes.
    pub fn num_spots(&self) -> u64 {
        self.table.num_spots()
    }

    /// Slot count.
    pub fn capacity(&self) -> u32 {
        self.table.total()
    }

    /// Bytes per slot.
    pub fn record_size(&self) -> u32 {
        self.table.record_size()
    }

    /// Size of the backing region in bytes.
    pub fn region_bytes(&self) -> usize {
        self.table.region_bytes()
    }
}

impl<KS, VS, S> fmt::Debug for RegionMap<KS, VS, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionMap")
            .field("record_size", &self.table.record_size())
            .field("total_elements", &self.table.total())
            .field("num_elements", &self.table.num_elements())
            .field("num_spots", &self.table.num_spots())
            .field("backing", &self.table.backing())
            .finish()
    }
}

/// Iterator over decoded live entries, returned by [`RegionMap::iter`].
pub struct Entries<'a, KS, VS> {
    slots: OccupiedSlots<'a>,
    key_ser: &'a KS,
    value_ser: &'a VS,
}

impl<'a, KS, VS> Entries<'a, KS, VS>
where
    KS: Serializer,
    VS: Serializer,
{
    fn decode(&self, bytes: &[u8]) -> Result<(KS::Item, VS::Item)> {
        let (key, value_off) = record::decode_key(bytes)?;
        let value = record::decode_value(bytes, value_off)?;
        Ok((
            self.key_ser.deserialize(key)?,
            self.value_ser.deserialize(value)?,
        ))
    }
}

impl<'a, KS, VS> Iterator for Entries<'a, KS, VS>
where
    KS: Serializer,
    VS: Serializer,
{
    type Item = Result<(KS::Item, VS::Item)>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.next()?;
        Some(slot.and_then(|bytes| self.decode(bytes)))
    }
}
