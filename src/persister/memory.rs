//! In-memory persister.
//!
//! Keeps the whole store in a `Vec<u8>` shared with every read copy, and
//! counts the operations it serves so callers can observe how often a cache
//! in front of it actually reaches the store.

use super::Persister;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Operation counters of a [`MemoryPersister`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Number of `read_at` calls
    pub reads: u64,
    /// Number of `write_at` calls
    pub writes: u64,
    /// Total bytes accepted by `write_at`
    pub bytes_written: u64,
    /// Number of `flush` calls
    pub flushes: u64,
    /// Number of `set_length` calls
    pub truncations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
    bytes_written: AtomicU64,
    flushes: AtomicU64,
    truncations: AtomicU64,
}

/// A persister backed by memory.
///
/// Writes past the end zero-fill the gap, like a sparse file.
#[derive(Debug)]
pub struct MemoryPersister {
    data: Arc<RwLock<Vec<u8>>>,
    counters: Arc<Counters>,
    read_only: bool,
    closed: AtomicBool,
}

impl MemoryPersister {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// Create a store holding `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(bytes)),
            counters: Arc::new(Counters::default()),
            read_only: false,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the current contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Current length in bytes.
    pub fn len(&self) -> u64 {
        self.data.read().len() as u64
    }

    /// Returns true if the store holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the operation counters.
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            bytes_written: self.counters.bytes_written.load(Ordering::Relaxed),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
            truncations: self.counters.truncations.load(Ordering::Relaxed),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn check_writable(&self, op: &str) -> Result<()> {
        self.check_open()?;
        if self.read_only {
            return Err(Error::unsupported(format!("{} on read-only memory persister", op)));
        }
        Ok(())
    }
}

impl Default for MemoryPersister {
    fn default() -> Self {
        Self::new()
    }
}

impl Persister for MemoryPersister {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);

        let data = self.data.read();
        if pos >= data.len() as u64 {
            return Ok(0);
        }
        let start = pos as usize;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> Result<usize> {
        self.check_writable("write")?;
        if buf.is_empty() {
            return Ok(0);
        }
        self.counters.writes.fetch_add(1, Ordering::Relaxed);

        let mut data = self.data.write();
        let start = pos as usize;
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);

        self.counters.bytes_written.fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(buf.len())
    }

    fn set_length(&self, len: u64) -> Result<()> {
        self.check_writable("set_length")?;
        self.counters.truncations.fetch_add(1, Ordering::Relaxed);
        self.data.write().resize(len as usize, 0);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.check_writable("flush")?;
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self, erase: bool) -> Result<()> {
        if erase && self.read_only {
            return Err(Error::unsupported("erase on read-only memory persister"));
        }
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if erase {
            self.data.write().clear();
        }
        Ok(())
    }

    fn create_read_copy(&self) -> Result<Arc<dyn Persister>> {
        self.check_open()?;
        Ok(Arc::new(MemoryPersister {
            data: Arc::clone(&self.data),
            counters: Arc::clone(&self.counters),
            read_only: true,
            closed: AtomicBool::new(false),
        }))
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
