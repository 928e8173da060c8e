use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::primitives::region::{AnonMmapAllocator, HeapAllocator, RegionAllocator};
use crate::storage::metrics::MapMetrics;
use crate::storage::table::region_size;
use crate::types::{MapError, Result};

/// Default ceiling for one region: the largest single allocation the platform allows.
pub const DEFAULT_MAX_REGION_BYTES: u64 = isize::MAX as u64;

/// Configuration options supplied when constructing a [`super::RegionMap`].
#[derive(Clone)]
pub struct MapOptions {
    /// Bytes per slot; bounds every record (status + both prefixed fields).
    pub record_size: u32,
    /// Number of slots, fixed for the lifetime of the region.
    pub total_elements: u32,
    /// Source of the backing region.
    pub allocator: Arc<dyn RegionAllocator>,
    /// Requests above this many bytes fail construction.
    pub max_region_bytes: u64,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn MapMetrics>>,
}

impl MapOptions {
    /// Creates options for a heap-backed map.
    pub fn new(record_size: u32, total_elements: u32) -> Self {
        Self {
            record_size,
            total_elements,
            allocator: Arc::new(HeapAllocator),
            max_region_bytes: DEFAULT_MAX_REGION_BYTES,
            metrics: None,
        }
    }

    /// Sets the region allocator.
    pub fn allocator(mut self, allocator: Arc<dyn RegionAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Sets the region size ceiling.
    pub fn max_region_bytes(mut self, bytes: u64) -> Self {
        self.max_region_bytes = bytes;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn MapMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Checks sizes against each other and against the allocation ceiling.
    pub fn validate(&self) -> Result<()> {
        region_size(self.record_size, self.total_elements, self.ceiling()).map(|_| ())
    }

    pub(crate) fn ceiling(&self) -> u64 {
        self.max_region_bytes
            .min(self.allocator.max_region_bytes())
    }
}

impl fmt::Debug for MapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("record_size", &self.record_size)
            .field("total_elements", &self.total_elements)
            .field("allocator", &self.allocator)
            .field("max_region_bytes", &self.max_region_bytes)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Where a region's bytes come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backing {
    /// Boxed slice on the global allocator.
    #[default]
    Heap,
    /// Anonymous memory mapping.
    AnonMmap,
}

impl Backing {
    /// Allocator for this backing.
    pub fn allocator(self) -> Arc<dyn RegionAllocator> {
        match self {
            Backing::Heap => Arc::new(HeapAllocator),
            Backing::AnonMmap => Arc::new(AnonMmapAllocator),
        }
    }
}

/// File form of [`MapOptions`].
///
/// ```toml
/// record_size = 128
/// total_elements = 4096
/// backing = "anon-mmap"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapConfig {
    /// Bytes per slot.
    pub record_size: u32,
    /// Number of slots.
    pub total_elements: u32,
    /// Region backing.
    #[serde(default)]
    pub backing: Backing,
    /// Region size ceiling; defaults to [`DEFAULT_MAX_REGION_BYTES`].
    #[serde(default)]
    pub max_region_bytes: Option<u64>,
}

impl MapConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| MapError::config(format!("parse map config: {err}")))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Renders the config as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|err| MapError::config(format!("render map config: {err}")))
    }

    /// Builds validated runtime options.
    pub fn into_options(self) -> Result<MapOptions> {
        let options = MapOptions::new(self.record_size, self.total_elements)
            .allocator(self.backing.allocator())
            .max_region_bytes(self.max_region_bytes.unwrap_or(DEFAULT_MAX_REGION_BYTES));
        options.validate()?;
        Ok(options)
    }
}
