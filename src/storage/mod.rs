//! Map storage engine.
//!
//! Slot codec, addressing, the slot-level table, and the typed map built
//! on top of them.

/// On-region layout of one slot.
///
/// Status byte followed by length-prefixed key and value.
pub mod record;

/// Home slot computation and the linear probe sequence.
pub mod probe;

/// Key and value serializers.
pub mod serializer;

mod map;
mod metrics;
mod options;
mod table;

/// Typed map interface.
pub use map::{Entries, MapStats, RegionMap};

/// Operation counters.
pub use metrics::{CounterMetrics, MapMetrics, MetricsSnapshot, NoopMetrics};

/// Construction options and their file form.
pub use options::{Backing, MapConfig, MapOptions, DEFAULT_MAX_REGION_BYTES};
