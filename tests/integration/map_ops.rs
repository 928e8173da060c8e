#![allow(missing_docs)]

mod support;

use std::collections::HashSet;

use regionmap::storage::serializer::{JsonSerializer, Serializer, StringSerializer, U64Serializer};
use regionmap::storage::{MapOptions, RegionMap};
use regionmap::{MapError, Result};
use serde::{Deserialize, Serialize};
use support::{id_map, init_tracing, s};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    expires_at: u64,
    scopes: Vec<String>,
}

#[test]
fn put_then_get_returns_value() -> Result<()> {
    init_tracing();
    let mut map = RegionMap::new(64, 32, StringSerializer, U64Serializer)?;
    for i in 0..16u64 {
        assert_eq!(map.put(&format!("user:{i}"), &(i * 10))?, None);
    }
    for i in 0..16u64 {
        assert_eq!(map.get(&format!("user:{i}"))?, Some(i * 10));
    }
    assert_eq!(map.get(&s("user:99"))?, None);
    assert_eq!(map.len(), 16);
    Ok(())
}

#[test]
fn structured_values_through_json() -> Result<()> {
    init_tracing();
    let mut map = RegionMap::new(
        160,
        8,
        StringSerializer,
        JsonSerializer::<Session>::new(),
    )?;
    let session = Session {
        user: s("ada"),
        expires_at: 1_700_000_000,
        scopes: vec![s("read"), s("write")],
    };
    map.put(&s("sess-1"), &session)?;
    assert_eq!(map.get(&s("sess-1"))?, Some(session.clone()));
    assert!(map.contains_value(&session)?);
    Ok(())
}

#[test]
fn overwrite_returns_previous_and_keeps_counts() -> Result<()> {
    let mut map = id_map(8);
    map.put(&3, &30)?;
    let (len, spots) = (map.len(), map.num_spots());
    assert_eq!(map.put(&3, &31)?, Some(30));
    assert_eq!(map.len(), len);
    assert_eq!(map.num_spots(), spots);
    assert_eq!(map.get(&3)?, Some(31));
    Ok(())
}

#[test]
fn delete_then_get_is_absent_and_idempotent() -> Result<()> {
    let mut map = id_map(8);
    map.put(&5, &50)?;
    map.put(&6, &60)?;
    assert_eq!(map.delete(&5)?, Some(50));
    assert_eq!(map.get(&5)?, None);
    assert!(!map.contains_key(&5)?);
    assert_eq!(map.len(), 1);
    assert_eq!(map.delete(&5)?, None);
    assert_eq!(map.len(), 1);
    assert_eq!(map.delete(&7)?, None);
    Ok(())
}

#[test]
fn resurrection_restores_count() -> Result<()> {
    let mut map = id_map(8);
    map.put(&1, &10)?;
    map.put(&2, &20)?;
    let before = map.len();
    map.delete(&2)?;
    assert_eq!(map.put(&2, &21)?, None);
    assert_eq!(map.len(), before);
    assert_eq!(map.num_spots(), 2);
    assert_eq!(map.get(&2)?, Some(21));
    Ok(())
}

#[test]
fn full_table_rejects_next_distinct_key() -> Result<()> {
    let mut map = id_map(4);
    for k in 0..4u64 {
        map.put(&k, &k)?;
    }
    let before: HashSet<u64> = map.key_set()?;
    match map.put(&100, &1) {
        Err(MapError::TableFull { capacity: 4 }) => {}
        other => panic!("expected TableFull, got {other:?}"),
    }
    // the guard runs before probing, so overwrites are refused too
    assert!(matches!(map.put(&0, &9), Err(MapError::TableFull { .. })));
    assert_eq!(map.key_set()?, before);
    assert_eq!(map.len(), 4);
    assert_eq!(map.get(&0)?, Some(0));
    map.delete(&0)?;
    // no EMPTY slot remains, so only the key's own tombstone can be revived
    assert!(matches!(
        map.put(&100, &1),
        Err(MapError::ProbeExhausted { home: 0, total: 4 })
    ));
    assert_eq!(map.put(&0, &7)?, None);
    assert_eq!(map.len(), 4);
    Ok(())
}

#[test]
fn oversized_record_is_rejected_without_mutation() -> Result<()> {
    init_tracing();
    let mut map = RegionMap::new(24, 4, StringSerializer, StringSerializer)?;
    map.put(&s("a"), &s("b"))?;
    // 9 + 7 + 8 = 24, equal to the slot width
    let err = map.put(&s("seven77"), &s("eight888")).unwrap_err();
    assert!(
        matches!(err, MapError::RecordTooLarge { needed: 24, record_size: 24 }),
        "{err}"
    );
    assert_eq!(map.len(), 1);
    assert_eq!(map.num_spots(), 1);
    // one byte smaller fits
    map.put(&s("seven77"), &s("eight88"))?;
    assert_eq!(map.len(), 2);
    Ok(())
}

#[test]
fn snapshot_views_match_count() -> Result<()> {
    init_tracing();
    let mut map = RegionMap::new(48, 64, StringSerializer, U64Serializer)?;
    for i in 0..40u64 {
        map.put(&format!("k{i}"), &i)?;
    }
    let n = map.len() as usize;
    assert_eq!(n, 40);
    assert_eq!(map.key_set()?.len(), n);
    assert_eq!(map.values()?.len(), n);
    assert_eq!(map.entry_set()?.len(), n);
    assert_eq!(map.iter().count(), n);

    let mut values = map.values()?;
    values.sort_unstable();
    assert_eq!(values, (0..40).collect::<Vec<_>>());
    for (k, v) in map.entry_set()? {
        assert_eq!(k, format!("k{v}"));
    }
    Ok(())
}

#[test]
fn invalid_construction_is_config_error() {
    init_tracing();
    assert!(matches!(
        RegionMap::new(0, 8, StringSerializer, U64Serializer),
        Err(MapError::Config(_))
    ));
    assert!(matches!(
        RegionMap::new(32, 0, StringSerializer, U64Serializer),
        Err(MapError::Config(_))
    ));
    let too_big = MapOptions::new(4096, 4096).max_region_bytes(1 << 20);
    assert!(matches!(
        RegionMap::with_options(too_big, StringSerializer, U64Serializer),
        Err(MapError::Config(_))
    ));
}

/// Accepts any value on write but refuses to decode the byte `0xFF`.
struct PickyValue;

impl Serializer for PickyValue {
    type Item = Vec<u8>;

    fn serialize(&self, item: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(item.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.contains(&0xFF) {
            return Err(MapError::Codec("poisoned value".into()));
        }
        Ok(bytes.to_vec())
    }
}

#[test]
fn decode_failures_propagate() -> Result<()> {
    init_tracing();
    let mut map = RegionMap::new(32, 8, StringSerializer, PickyValue)?;
    map.put(&s("good"), &vec![1, 2])?;
    map.put(&s("bad"), &vec![0xFF])?;
    assert_eq!(map.get(&s("good"))?, Some(vec![1, 2]));
    assert!(matches!(map.get(&s("bad")), Err(MapError::Codec(_))));
    assert!(matches!(map.values(), Err(MapError::Codec(_))));
    assert!(matches!(map.entry_set(), Err(MapError::Codec(_))));
    // keys decode fine
    assert_eq!(map.key_set()?.len(), 2);

    // the old value is decoded before the slot changes, so a failure is a no-op
    assert!(matches!(map.delete(&s("bad")), Err(MapError::Codec(_))));
    assert_eq!(map.len(), 2);
    assert!(map.contains_key(&s("bad"))?);
    assert_eq!(map.stats()?.tombstones, 0);

    assert!(matches!(map.put(&s("bad"), &vec![1]), Err(MapError::Codec(_))));
    assert_eq!(map.len(), 2);
    assert_eq!(map.num_spots(), 2);
    assert!(matches!(map.get(&s("bad")), Err(MapError::Codec(_))));

    // a decodable record can be replaced and removed normally
    assert_eq!(map.put(&s("good"), &vec![3])?, Some(vec![1, 2]));
    assert_eq!(map.delete(&s("good"))?, Some(vec![3]));
    assert_eq!(map.len(), 1);
    Ok(())
}
