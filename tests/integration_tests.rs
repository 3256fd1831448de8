// Integration Tests for bufpersist
// These tests exercise the buffered persister end to end over real stores

use bufpersist::stream::{Input, Output};
use bufpersist::{BufferedPersister, CacheOptions, Cursor, Error, FilePersister, MemoryPersister, Persister};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

fn memory_cache(table_size: usize, entry_size: usize) -> (Arc<MemoryPersister>, BufferedPersister) {
    let store = Arc::new(MemoryPersister::new());
    let options = CacheOptions::new().table_size(table_size).entry_size(entry_size);
    let cache = BufferedPersister::new(store.clone(), options).unwrap();
    (store, cache)
}

fn read_range(persister: &dyn Persister, pos: u64, len: usize) -> Vec<u8> {
    let mut cursor = Cursor::at(pos);
    let mut input = Input::new(persister, &mut cursor).unwrap();
    let mut out = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = input.read_into(&mut out[filled..]).unwrap();
        if n == 0 {
            break;
        }
        filled += n;
    }
    out.truncate(filled);
    out
}

fn write_range(persister: &dyn Persister, pos: u64, data: &[u8]) {
    let mut cursor = Cursor::at(pos);
    Output::new(persister, &mut cursor).unwrap().write_fully(data).unwrap();
}

/// Scenario: a single slot forces block A out when block B is written
#[test]
fn test_eviction_round_trip_single_slot() {
    env_logger::try_init().ok();
    let (store, cache) = memory_cache(1, 4);

    write_range(&cache, 0, &[10, 11, 12, 13]);
    write_range(&cache, 4, &[20, 21, 22, 23]);

    // Block A now lives only in the store
    assert_eq!(store.snapshot(), vec![10, 11, 12, 13]);
    assert_eq!(read_range(&cache, 0, 4), vec![10, 11, 12, 13]);

    // Reading A evicted the dirty block B
    assert_eq!(store.snapshot(), vec![10, 11, 12, 13, 20, 21, 22, 23]);
    assert_eq!(read_range(&cache, 4, 4), vec![20, 21, 22, 23]);
}

/// Scenario: a partially written block reads back short, not as an error
#[test]
fn test_partial_block_read() {
    let (_store, cache) = memory_cache(4, 8);

    write_range(&cache, 0, &[1, 2, 3]);

    let mut buf = [0u8; 5];
    assert_eq!(cache.read_at(0, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], &[1, 2, 3]);

    let mut cursor = Cursor::at(3);
    let mut input = Input::new(&cache, &mut cursor).unwrap();
    assert_eq!(input.read_byte().unwrap(), None);
}

#[test]
fn test_write_then_read_many_blocks() {
    let (_store, cache) = memory_cache(3, 16);

    for i in 0..50u64 {
        let data: Vec<u8> = (0..16).map(|j| (i as u8).wrapping_mul(7).wrapping_add(j)).collect();
        write_range(&cache, i * 16, &data);
    }
    for i in (0..50u64).rev() {
        let expected: Vec<u8> = (0..16).map(|j| (i as u8).wrapping_mul(7).wrapping_add(j)).collect();
        assert_eq!(read_range(&cache, i * 16, 16), expected, "block {}", i);
    }
}

#[test]
fn test_flush_makes_writes_durable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.bin");
    let file = Arc::new(FilePersister::open(&path).unwrap());
    let cache = BufferedPersister::new(file, CacheOptions::new().table_size(8).entry_size(64)).unwrap();

    let payload: Vec<u8> = (0..500u32).map(|i| (i % 251) as u8).collect();
    write_range(&cache, 100, &payload);
    cache.flush().unwrap();

    // Independent handle on the same file
    let check = FilePersister::open_read_only(&path).unwrap();
    assert_eq!(read_range(&check, 100, payload.len()), payload);
    assert_eq!(check.len().unwrap(), 600);
}

#[test]
fn test_second_flush_writes_nothing() {
    let (store, cache) = memory_cache(8, 16);

    write_range(&cache, 0, &[1u8; 40]);
    cache.flush().unwrap();
    let after_first = store.stats();
    assert!(after_first.writes > 0);

    cache.flush().unwrap();
    let after_second = store.stats();
    assert_eq!(after_second.writes, after_first.writes);
    assert_eq!(after_second.bytes_written, after_first.bytes_written);
    assert_eq!(after_second.flushes, after_first.flushes + 1);
}

#[test]
fn test_truncation_law() {
    let (store, cache) = memory_cache(2, 8);

    let data: Vec<u8> = (1..=40).collect();
    write_range(&cache, 0, &data);

    cache.set_length(13).unwrap();

    // Bytes below the new end survive, whether cached or refetched
    assert_eq!(read_range(&cache, 0, 40), data[..13].to_vec());
    assert_eq!(read_range(&cache, 13, 10), Vec::<u8>::new());
    assert_eq!(read_range(&cache, 30, 10), Vec::<u8>::new());

    cache.flush().unwrap();
    assert_eq!(store.snapshot(), data[..13].to_vec());
}

#[test]
fn test_truncate_then_regrow() {
    let (store, cache) = memory_cache(4, 8);

    write_range(&cache, 0, &[9u8; 8]);
    cache.set_length(2).unwrap();
    write_range(&cache, 6, &[1]);

    assert_eq!(read_range(&cache, 0, 8), vec![9, 9, 0, 0, 0, 0, 1]);
    cache.flush().unwrap();
    assert_eq!(store.snapshot(), vec![9, 9, 0, 0, 0, 0, 1]);
}

#[test]
fn test_close_is_terminal_and_idempotent() {
    let (store, cache) = memory_cache(4, 8);
    write_range(&cache, 0, b"persist");

    cache.close(false).unwrap();
    assert_eq!(store.snapshot(), b"persist".to_vec());

    // Second close is a no-op
    cache.close(false).unwrap();

    let mut cursor = Cursor::new();
    assert!(matches!(Input::new(&cache, &mut cursor), Err(Error::Closed)));
    assert!(matches!(Output::new(&cache, &mut cursor), Err(Error::Closed)));
    assert!(matches!(cache.read_at(0, &mut [0u8; 4]), Err(Error::Closed)));
    assert!(matches!(cache.write_at(0, b"x"), Err(Error::Closed)));
    assert!(matches!(cache.set_length(0), Err(Error::Closed)));
    assert!(matches!(cache.flush(), Err(Error::Closed)));
    assert!(matches!(cache.read_copy(), Err(Error::Closed)));
}

#[test]
fn test_view_position_after_close() {
    let (_store, cache) = memory_cache(4, 8);
    let mut cursor = Cursor::new();
    let mut output = Output::new(&cache, &mut cursor).unwrap();
    output.write_fully(b"abc").unwrap();
    assert_eq!(output.position().unwrap(), 3);

    cache.close(false).unwrap();
    assert!(matches!(output.position(), Err(Error::Closed)));
    assert!(matches!(output.set_position(0), Err(Error::Closed)));
    assert!(matches!(output.write_byte(1), Err(Error::Closed)));
}

#[test]
fn test_close_with_erase() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scratch.bin");
    let file = Arc::new(FilePersister::open(&path).unwrap());
    let cache = BufferedPersister::with_defaults(file).unwrap();

    write_range(&cache, 0, b"temporary");
    cache.close(true).unwrap();
    assert!(!path.exists());
}

#[test]
fn test_reopen_after_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.bin");

    {
        let file = Arc::new(FilePersister::open(&path).unwrap());
        let cache = BufferedPersister::new(file, CacheOptions::new().table_size(2).entry_size(32)).unwrap();
        write_range(&cache, 0, &[0xAB; 100]);
        write_range(&cache, 1000, &[0xCD; 10]);
        cache.close(false).unwrap();
    }

    let file = Arc::new(FilePersister::open(&path).unwrap());
    let cache = BufferedPersister::with_defaults(file).unwrap();
    assert_eq!(read_range(&cache, 0, 100), vec![0xAB; 100]);
    assert_eq!(read_range(&cache, 500, 4), vec![0; 4]);
    assert_eq!(read_range(&cache, 1000, 20), vec![0xCD; 10]);
}

#[test]
fn test_stats_reflect_access_pattern() {
    let (_store, cache) = memory_cache(1, 4);

    write_range(&cache, 0, &[1; 4]);
    write_range(&cache, 4, &[2; 4]);
    read_range(&cache, 0, 4);

    let stats = cache.stats();
    assert_eq!(stats.evictions, 2);
    assert_eq!(stats.write_backs, 2);
    assert!(stats.misses >= 3);
}

#[derive(Debug, Clone)]
enum Op {
    Write(u64, Vec<u8>),
    Read(u64, usize),
    SetLength(u64),
    Flush,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..200, prop::collection::vec(any::<u8>(), 1..24)).prop_map(|(pos, data)| Op::Write(pos, data)),
        4 => (0u64..220, 1usize..40).prop_map(|(pos, len)| Op::Read(pos, len)),
        1 => (0u64..220).prop_map(Op::SetLength),
        1 => Just(Op::Flush),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Reads never disagree with a plain byte vector receiving the same
    /// operations, and written bytes are always readable.
    #[test]
    fn prop_matches_byte_vector(
        table_size in 1usize..5,
        entry_size in 1usize..17,
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let (store, cache) = memory_cache(table_size, entry_size);
        let mut model: Vec<u8> = Vec::new();
        let mut written: BTreeSet<u64> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Write(pos, data) => {
                    write_range(&cache, pos, &data);
                    let end = pos as usize + data.len();
                    if model.len() < end {
                        model.resize(end, 0);
                    }
                    model[pos as usize..end].copy_from_slice(&data);
                    written.extend(pos..end as u64);
                }
                Op::Read(pos, len) => {
                    let got = read_range(&cache, pos, len);
                    let start = (pos as usize).min(model.len());
                    let end = (start + got.len()).min(model.len());
                    prop_assert_eq!(&got[..], &model[start..end]);
                    if written.contains(&pos) {
                        prop_assert!(!got.is_empty(), "written byte at {} not readable", pos);
                    }
                }
                Op::SetLength(len) => {
                    cache.set_length(len).unwrap();
                    model.resize(len as usize, 0);
                    written.retain(|&p| p < len);
                }
                Op::Flush => cache.flush().unwrap(),
            }
        }

        cache.flush().unwrap();
        prop_assert_eq!(store.snapshot(), model);
    }
}
