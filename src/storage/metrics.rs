use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for tracking map operations.
///
/// Implementations receive one call per completed operation. Failed
/// operations are not reported.
pub trait MapMetrics: Send + Sync {
    /// Records a put; `inserted` is false when an existing key was overwritten.
    fn record_put(&self, inserted: bool);

    /// Records a lookup and whether it found the key.
    fn record_get(&self, hit: bool);

    /// Records a delete and whether it removed a live entry.
    fn record_delete(&self, removed: bool);

    /// Records the number of slots a probe walk visited.
    fn record_probe(&self, probes: u32);

    /// Records a completed resize and the entries it migrated.
    fn record_resize(&self, migrated: u32);
}

/// A no-op implementation of [`MapMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl MapMetrics for NoopMetrics {
    fn record_put(&self, _inserted: bool) {}
    fn record_get(&self, _hit: bool) {}
    fn record_delete(&self, _removed: bool) {}
    fn record_probe(&self, _probes: u32) {}
    fn record_resize(&self, _migrated: u32) {}
}

/// A thread-safe counter-based implementation of [`MapMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Puts that created a live entry.
    pub inserts: AtomicU64,
    /// Puts that overwrote a live entry.
    pub updates: AtomicU64,
    /// Lookups that found the key.
    pub get_hits: AtomicU64,
    /// Lookups that did not.
    pub get_misses: AtomicU64,
    /// Deletes that removed a live entry.
    pub deletes: AtomicU64,
    /// Probe walks recorded.
    pub probe_walks: AtomicU64,
    /// Slots visited across all probe walks.
    pub probe_slots: AtomicU64,
    /// Longest probe walk observed.
    pub probe_max: AtomicU64,
    /// Resizes completed.
    pub resizes: AtomicU64,
    /// Live entries carried across all resizes.
    pub resize_migrated: AtomicU64,
}

impl CounterMetrics {
    /// Copies the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let probe_walks = self.probe_walks.load(Ordering::Relaxed);
        let probe_slots = self.probe_slots.load(Ordering::Relaxed);
        MetricsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            probe_max: self.probe_max.load(Ordering::Relaxed),
            mean_probe: if probe_walks == 0 {
                0.0
            } else {
                probe_slots as f64 / probe_walks as f64
            },
            resizes: self.resizes.load(Ordering::Relaxed),
            resize_migrated: self.resize_migrated.load(Ordering::Relaxed),
        }
    }
}

impl MapMetrics for CounterMetrics {
    fn record_put(&self, inserted: bool) {
        if inserted {
            self.inserts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.updates.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_get(&self, hit: bool) {
        if hit {
            self.get_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.get_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_delete(&self, removed: bool) {
        if removed {
            self.deletes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_probe(&self, probes: u32) {
        self.probe_walks.fetch_add(1, Ordering::Relaxed);
        self.probe_slots
            .fetch_add(u64::from(probes), Ordering::Relaxed);
        self.probe_max
            .fetch_max(u64::from(probes), Ordering::Relaxed);
    }

    fn record_resize(&self, migrated: u32) {
        self.resizes.fetch_add(1, Ordering::Relaxed);
        self.resize_migrated
            .fetch_add(u64::from(migrated), Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`CounterMetrics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Puts that created a live entry.
    pub inserts: u64,
    /// Puts that overwrote a live entry.
    pub updates: u64,
    /// Lookups that found the key.
    pub get_hits: u64,
    /// Lookups that did not.
    pub get_misses: u64,
    /// Deletes that removed a live entry.
    pub deletes: u64,
    /// Longest probe walk observed.
    pub probe_max: u64,
    /// Mean slots visited per probe walk.
    pub mean_probe: f64,
    /// Resizes completed.
    pub resizes: u64,
    /// Live entries carried across all resizes.
    pub resize_migrated: u64,
}
