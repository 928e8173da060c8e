#![allow(missing_docs)]

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use regionmap::primitives::region::AnonMmapAllocator;
use regionmap::storage::serializer::{StringSerializer, U64Serializer};
use regionmap::storage::{MapOptions, RegionMap};
use regionmap::{MapError, Result};
use support::{colliding_map, init_tracing, s};

fn filled(options: MapOptions, n: u64) -> Result<RegionMap<StringSerializer, U64Serializer>> {
    init_tracing();
    let mut map = RegionMap::with_options(options, StringSerializer, U64Serializer)?;
    for i in 0..n {
        map.put(&format!("item-{i:04}"), &i)?;
    }
    Ok(map)
}

#[test]
fn doubling_keeps_every_live_key() -> Result<()> {
    let mut map = filled(MapOptions::new(48, 32), 24)?;
    for i in (0..24u64).step_by(3) {
        map.delete(&format!("item-{i:04}"))?;
    }
    let keys: HashSet<String> = map.key_set()?;
    let len = map.len();
    assert!(map.stats()?.tombstones > 0);

    let map = map.resize(2)?;
    assert_eq!(map.capacity(), 64);
    assert_eq!(map.len(), len);
    assert_eq!(map.num_spots(), u64::from(len));
    assert_eq!(map.key_set()?, keys);
    assert_eq!(map.stats()?.tombstones, 0);
    for key in &keys {
        let i: u64 = key["item-".len()..].parse().expect("numeric suffix");
        assert_eq!(map.get(key)?, Some(i));
    }
    Ok(())
}

#[test]
fn resized_map_accepts_more_keys() -> Result<()> {
    let mut map = filled(MapOptions::new(48, 8), 8)?;
    assert!(matches!(
        map.put(&s("overflow"), &0),
        Err(MapError::TableFull { capacity: 8 })
    ));
    map.resize_in_place(4)?;
    for i in 8..30u64 {
        map.put(&format!("item-{i:04}"), &i)?;
    }
    assert_eq!(map.len(), 30);
    assert_eq!(map.region_bytes(), 32 * 48);
    Ok(())
}

#[test]
fn anon_mmap_backing_survives_resize() -> Result<()> {
    let options = MapOptions::new(64, 16).allocator(Arc::new(AnonMmapAllocator));
    let map = filled(options, 12)?;
    assert_eq!(map.stats()?.backing, "anon-mmap");
    let map = map.resize(3)?;
    assert_eq!(map.stats()?.backing, "anon-mmap");
    assert_eq!(map.capacity(), 48);
    assert_eq!(map.get(&s("item-0011"))?, Some(11));
    Ok(())
}

#[test]
fn failed_resize_leaves_map_usable() -> Result<()> {
    let options = MapOptions::new(48, 16).max_region_bytes(48 * 32);
    let mut map = filled(options, 10)?;
    let before = map.entry_set()?;

    // 48 slots would exceed the ceiling
    assert!(matches!(map.resize_in_place(3), Err(MapError::Config(_))));
    assert_eq!(map.capacity(), 16);
    assert_eq!(map.entry_set()?, before);

    map.resize_in_place(2)?;
    assert_eq!(map.capacity(), 32);
    assert_eq!(map.len(), 10);
    Ok(())
}

#[test]
fn factor_one_compacts_a_saturated_table() -> Result<()> {
    let mut map = colliding_map(3);
    for k in ["A", "B", "C"] {
        map.put(&s(k), &s("v"))?;
    }
    map.delete(&s("A"))?;
    map.delete(&s("C"))?;
    assert!(matches!(
        map.put(&s("Q"), &s("v")),
        Err(MapError::ProbeExhausted { .. })
    ));

    map.resize_in_place(1)?;
    assert_eq!(map.capacity(), 3);
    assert_eq!(map.stats()?.tombstones, 0);
    assert_eq!(map.get(&s("B"))?, Some(s("v")));
    map.put(&s("Q"), &s("w"))?;
    assert_eq!(map.len(), 2);
    Ok(())
}
