//! Write-back block cache in front of another persister.

use super::entry::CacheEntry;
use super::table::{CacheStats, CacheTable, StatsCounters};
use crate::config::CacheOptions;
use crate::error::{Error, Result};
use crate::persister::Persister;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State shared by a persister and every read copy derived from it.
#[derive(Debug)]
struct Shared {
    /// The one table-wide lock. Writers and whole-table truncation take it
    /// exclusively; reads, misses, flush and close take it shared.
    table: RwLock<CacheTable>,
    /// Store that receives write-backs, also when they are triggered
    /// through a read copy
    origin: Arc<dyn Persister>,
    /// Serializes write-backs to `origin`
    write_back_lock: Mutex<()>,
    stats: StatsCounters,
    options: CacheOptions,
}

impl Shared {
    fn write_back(&self, entry: &mut CacheEntry) -> Result<()> {
        let _guard = self.write_back_lock.lock();
        match entry.write_back(self.origin.as_ref()) {
            Ok(()) => {
                self.stats.write_back();
                Ok(())
            }
            Err(e) => {
                log::warn!("Write-back of block at {} failed: {}", entry.start(), e);
                Err(e)
            }
        }
    }

    /// Make room in a slot for the block at `start`, writing the occupant
    /// back first if it holds unsaved bytes.
    ///
    /// The occupant stays in place when the write-back fails.
    fn evict(&self, occupant: &mut Option<CacheEntry>, start: u64) -> Result<()> {
        let Some(entry) = occupant.as_mut() else {
            return Ok(());
        };
        if entry.start() != start {
            self.stats.eviction();
        }
        if entry.is_dirty() {
            log::debug!("Evicting dirty block at {} for block at {}", entry.start(), start);
            self.write_back(entry)?;
        }
        Ok(())
    }
}

/// A persister that caches fixed-size blocks of another persister.
///
/// Blocks are addressed through a fixed table of `table_size` slots; each
/// block hashes to one slot and replaces whatever block lived there. Writes
/// stay in memory until the block is evicted, [`flush`](Persister::flush)ed
/// or the persister is closed.
///
/// # Thread Safety
///
/// One read-write lock guards the whole table. Writes run exclusively, reads
/// run concurrently with each other. The cache keeps its entries consistent
/// under any interleaving, but it does not make a caller's multi-step
/// operation atomic with respect to other callers writing the same bytes.
///
/// A read that evicts a dirty block writes that block back first, so a
/// reader can block on, or fail with the I/O error of, a write-back of bytes
/// that another thread wrote.
///
/// # Read copies
///
/// [`read_copy`](BufferedPersister::read_copy) returns a read-only persister
/// that shares the same table and lock. A read copy never writes through its
/// own delegate; dirty blocks it evicts or meets while closing go to the
/// delegate of the persister it was created from.
///
/// # Example
///
/// ```
/// use bufpersist::{BufferedPersister, CacheOptions, MemoryPersister, Persister};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), bufpersist::Error> {
/// let store = Arc::new(MemoryPersister::new());
/// let cache = BufferedPersister::new(store.clone(), CacheOptions::new().table_size(16).entry_size(64))?;
///
/// cache.write_at(0, b"hello")?;
/// assert!(store.is_empty());
///
/// cache.flush()?;
/// assert_eq!(store.snapshot(), b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BufferedPersister {
    shared: Arc<Shared>,
    /// Store that blocks are loaded from
    delegate: Arc<dyn Persister>,
    read_copy: bool,
    closed: AtomicBool,
}

impl BufferedPersister {
    /// Create a cache in front of `delegate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `table_size` or
    /// `entry_size` is zero.
    pub fn new(delegate: Arc<dyn Persister>, options: CacheOptions) -> Result<Self> {
        options.validate()?;

        let shared = Shared {
            table: RwLock::new(CacheTable::new(options.table_size, options.entry_size)),
            origin: Arc::clone(&delegate),
            write_back_lock: Mutex::new(()),
            stats: StatsCounters::default(),
            options,
        };

        Ok(Self { shared: Arc::new(shared), delegate, read_copy: false, closed: AtomicBool::new(false) })
    }

    /// Create a cache in front of `delegate` with default options.
    pub fn with_defaults(delegate: Arc<dyn Persister>) -> Result<Self> {
        Self::new(delegate, CacheOptions::default())
    }

    /// Create a read-only persister sharing this cache.
    ///
    /// Dirty blocks are written back and the delegate flushed first, so the
    /// copy's own delegate view sees everything written so far.
    pub fn read_copy(&self) -> Result<Self> {
        self.check_open()?;
        self.write_back_all()?;
        if !self.read_copy {
            self.delegate.flush()?;
        }
        let delegate = self.delegate.create_read_copy()?;

        Ok(Self {
            shared: Arc::clone(&self.shared),
            delegate,
            read_copy: true,
            closed: AtomicBool::new(false),
        })
    }

    /// The options this cache was built with.
    pub fn options(&self) -> CacheOptions {
        self.shared.options
    }

    /// Get current cache statistics, shared with all read copies.
    pub fn stats(&self) -> CacheStats {
        self.shared.stats.snapshot()
    }

    /// Reset cache statistics to zero.
    pub fn reset_stats(&self) {
        self.shared.stats.reset();
    }

    /// Number of slots currently holding a block.
    pub fn cached_entries(&self) -> usize {
        self.shared.table.read().occupied()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn check_writable(&self, op: &str) -> Result<()> {
        if self.read_copy {
            return Err(Error::unsupported(format!("{} on read copy", op)));
        }
        Ok(())
    }

    /// Write every dirty block back without touching slot occupancy.
    fn write_back_all(&self) -> Result<()> {
        let table = self.shared.table.read();
        for slot in table.slots() {
            let mut occupant = slot.lock();
            if let Some(entry) = occupant.as_mut().filter(|e| e.is_dirty()) {
                self.shared.write_back(entry)?;
            }
        }
        Ok(())
    }

    /// Empty the table (or, for a read copy, only write back what is dirty).
    ///
    /// Keeps going after a failed write-back and reports the first failure.
    fn release_entries(&self) -> Result<usize> {
        let table = self.shared.table.read();
        let mut written = 0;
        let mut first_error = None;

        for slot in table.slots() {
            let mut occupant = slot.lock();
            let result = if self.read_copy {
                match occupant.as_mut().filter(|e| e.is_dirty()) {
                    Some(entry) => self.shared.write_back(entry).map(|_| 1),
                    None => Ok(0),
                }
            } else {
                match occupant.take() {
                    Some(mut entry) if entry.is_dirty() => self.shared.write_back(&mut entry).map(|_| 1),
                    _ => Ok(0),
                }
            };

            match result {
                Ok(n) => written += n,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

impl Persister for BufferedPersister {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let table = self.shared.table.read();
        let (start, offset) = table.locate(pos);
        let slot = table.slot(start);

        if let Some(entry) = slot.lock().as_ref().filter(|e| e.start() == start) {
            self.shared.stats.hit();
            return Ok(entry.read(offset, buf));
        }

        self.shared.stats.miss();
        log::trace!("Cache miss for block at {}", start);

        // Loaded without holding the slot; other readers may race us to the
        // same slot, but no writer can run while the table is read-locked.
        let entry = CacheEntry::load(self.delegate.as_ref(), start, table.entry_size())?;
        let n = entry.read(offset, buf);

        let mut occupant = slot.lock();
        self.shared.evict(&mut occupant, start)?;
        *occupant = Some(entry);
        Ok(n)
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        self.check_writable("write")?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut table = self.shared.table.write();
        let (start, offset) = table.locate(pos);
        let entry_size = table.entry_size();
        let occupant = table.slot_mut(start);

        if occupant.as_ref().is_some_and(|e| e.start() == start) {
            self.shared.stats.hit();
        } else {
            self.shared.stats.miss();
            let entry = CacheEntry::load(self.delegate.as_ref(), start, entry_size)?;
            self.shared.evict(occupant, start)?;
            *occupant = Some(entry);
        }

        match occupant.as_mut() {
            Some(entry) => entry.write(offset, buf),
            None => Err(Error::internal(format!("block at {} vanished while write-locked", start))),
        }
    }

    fn set_length(&self, len: u64) -> Result<()> {
        self.check_open()?;
        self.check_writable("set_length")?;

        let mut table = self.shared.table.write();
        let mut dropped = 0;
        for occupant in table.slots_mut() {
            if occupant.as_ref().is_some_and(|e| e.start() >= len) {
                // Entirely past the new end, nothing worth writing back
                *occupant = None;
                dropped += 1;
            } else if let Some(entry) = occupant.as_mut() {
                entry.truncate(len);
            }
        }
        log::debug!("Set length to {}, dropped {} cached blocks", len, dropped);

        self.delegate.set_length(len)
    }

    fn flush(&self) -> Result<()> {
        self.check_open()?;
        self.check_writable("flush")?;

        self.write_back_all()?;
        self.delegate.flush()
    }

    fn close(&self, erase: bool) -> Result<()> {
        if erase && self.read_copy {
            return Err(Error::unsupported("erase on read copy"));
        }
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let released = self.release_entries();
        if let Ok(written) = &released {
            if !self.read_copy {
                log::info!("Closing buffered persister, wrote back {} blocks", written);
            }
        }

        let closed = self.delegate.close(erase);
        released.and(closed)
    }

    fn create_read_copy(&self) -> Result<Arc<dyn Persister>> {
        Ok(Arc::new(self.read_copy()?))
    }

    fn is_read_only(&self) -> bool {
        self.read_copy
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for BufferedPersister {
    fn drop(&mut self) {
        // Best effort write-back if the owner never closed us
        if !self.read_copy && !self.is_closed() {
            let _ = self.write_back_all();
        }
    }
}
