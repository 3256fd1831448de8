//! Fixed-size, hash-addressed table of cache entries.
//!
//! Every block of the address space maps to exactly one slot. A slot holds
//! at most one entry: the block most recently loaded into it.

use super::entry::CacheEntry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of block lookups
    pub lookups: u64,
    /// Number of lookups served from the table
    pub hits: u64,
    /// Number of lookups that loaded from the store
    pub misses: u64,
    /// Number of entries replaced by a different block
    pub evictions: u64,
    /// Number of dirty entries written back to the store
    pub write_backs: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    write_backs: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_back(&self) {
        self.write_backs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            lookups: hits + misses,
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            write_backs: self.write_backs.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.write_backs.store(0, Ordering::Relaxed);
    }
}

/// A slot holding at most one entry.
///
/// The mutex makes replacing the occupant a single swap; it is only held for
/// the duration of one slot access.
pub(crate) type Slot = Mutex<Option<CacheEntry>>;

/// The cache table.
///
/// Callers guard the whole table with one read-write lock: shared access
/// goes through [`slot`](CacheTable::slot), exclusive access through
/// [`slot_mut`](CacheTable::slot_mut) and [`slots_mut`](CacheTable::slots_mut)
/// without touching the slot mutexes.
#[derive(Debug)]
pub(crate) struct CacheTable {
    slots: Box<[Slot]>,
    entry_size: usize,
}

impl CacheTable {
    pub(crate) fn new(table_size: usize, entry_size: usize) -> Self {
        let slots = (0..table_size).map(|_| Mutex::new(None)).collect();
        Self { slots, entry_size }
    }

    pub(crate) fn entry_size(&self) -> usize {
        self.entry_size
    }

    /// Split a position into its block start and the offset inside the block.
    pub(crate) fn locate(&self, pos: u64) -> (u64, usize) {
        let size = self.entry_size as u64;
        let offset = pos % size;
        (pos - offset, offset as usize)
    }

    fn index_of(&self, start: u64) -> usize {
        let block = start / self.entry_size as u64;
        slot_hash(block) as usize % self.slots.len()
    }

    pub(crate) fn slot(&self, start: u64) -> &Slot {
        &self.slots[self.index_of(start)]
    }

    pub(crate) fn slot_mut(&mut self, start: u64) -> &mut Option<CacheEntry> {
        let index = self.index_of(start);
        self.slots[index].get_mut()
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Option<CacheEntry>> {
        self.slots.iter_mut().map(|slot| slot.get_mut())
    }

    /// Number of occupied slots.
    pub(crate) fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.lock().is_some()).count()
    }
}

/// Spread a block index over the slot space.
///
/// Folds the high half into the low half and then cascades shift-xors, so
/// runs of consecutive blocks and blocks spaced by powers of two do not pile
/// up in the same slots.
pub(crate) fn slot_hash(block: u64) -> u32 {
    let mut h = (block ^ (block >> 32)) as u32;
    h ^= (h >> 20) ^ (h >> 12);
    h ^ (h >> 7) ^ (h >> 4)
}
