#![allow(dead_code)]

use std::hash::{BuildHasher, Hasher};
use std::sync::Once;

use regionmap::storage::serializer::{StringSerializer, U64Serializer};
use regionmap::storage::{MapOptions, RegionMap};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("regionmap=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

/// Hashes a `u64` key to itself, so `key % slots` is the home slot.
#[derive(Default, Clone)]
pub struct IdentityHasher {
    value: u64,
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.value
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.value = (self.value << 8) | u64::from(byte);
        }
    }

    fn write_u64(&mut self, v: u64) {
        self.value = v;
    }
}

#[derive(Default, Clone, Copy)]
pub struct IdentityBuildHasher;

impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher::default()
    }
}

/// Sends every key to slot 0.
#[derive(Default, Clone)]
pub struct ZeroHasher;

impl Hasher for ZeroHasher {
    fn finish(&self) -> u64 {
        0
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

#[derive(Default, Clone, Copy)]
pub struct ZeroBuildHasher;

impl BuildHasher for ZeroBuildHasher {
    type Hasher = ZeroHasher;

    fn build_hasher(&self) -> ZeroHasher {
        ZeroHasher
    }
}

pub type IdMap = RegionMap<U64Serializer, U64Serializer, IdentityBuildHasher>;
pub type CollidingMap = RegionMap<StringSerializer, StringSerializer, ZeroBuildHasher>;

pub fn id_map(slots: u32) -> IdMap {
    init_tracing();
    RegionMap::with_hasher(
        MapOptions::new(32, slots),
        U64Serializer,
        U64Serializer,
        IdentityBuildHasher,
    )
    .expect("identity map")
}

pub fn colliding_map(slots: u32) -> CollidingMap {
    init_tracing();
    RegionMap::with_hasher(
        MapOptions::new(64, slots),
        StringSerializer,
        StringSerializer,
        ZeroBuildHasher,
    )
    .expect("colliding map")
}

pub fn s(v: &str) -> String {
    v.to_string()
}
