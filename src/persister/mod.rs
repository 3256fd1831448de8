//! Random-access byte store abstraction.
//!
//! A [`Persister`] is a positioned byte store: callers read and write at
//! explicit offsets, truncate or extend it, flush it and finally close it.
//! Sequential access goes through the [`Input`](crate::stream::Input) and
//! [`Output`](crate::stream::Output) views, which advance a caller-owned
//! [`Cursor`].
//!
//! ## Implementations
//!
//! - [`FilePersister`]: backed by a file on disk
//! - [`MemoryPersister`]: backed by a shared in-memory buffer
//! - [`BufferedPersister`](crate::BufferedPersister): a write-back block cache
//!   wrapping any other persister
//!
//! Because the cache implements the same trait it wraps, caches can be
//! stacked on top of each other.

mod file;
mod memory;

pub use file::FilePersister;
pub use memory::{MemoryPersister, MemoryStats};

use crate::error::Result;
use std::fmt::Debug;
use std::sync::Arc;

/// A random-access byte store.
///
/// # Thread Safety
///
/// Implementations must be safe to share across threads. Positions are not
/// stored in the persister; each caller keeps its own [`Cursor`].
pub trait Persister: Send + Sync + Debug {
    /// Reads up to `buf.len()` bytes starting at `pos`.
    ///
    /// Returns the number of bytes read. `0` signals end of stream and is not
    /// an error. Fewer bytes than requested may be returned.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize>;

    /// Writes up to `buf.len()` bytes starting at `pos`.
    ///
    /// Returns the number of bytes written by this single attempt.
    fn write_at(&self, pos: u64, buf: &[u8]) -> Result<usize>;

    /// Truncates or extends the store to exactly `len` bytes.
    fn set_length(&self, len: u64) -> Result<()>;

    /// Pushes all buffered state down to durable storage.
    fn flush(&self) -> Result<()>;

    /// Closes the persister, optionally erasing the underlying store.
    ///
    /// Closing an already closed persister is a no-op.
    fn close(&self, erase: bool) -> Result<()>;

    /// Creates an independent read-only view of the same store.
    fn create_read_copy(&self) -> Result<Arc<dyn Persister>>;

    /// Returns true if this persister rejects writes.
    fn is_read_only(&self) -> bool;

    /// Returns true once [`close`](Persister::close) has been called.
    fn is_closed(&self) -> bool;
}

/// A caller-owned position into a persister.
///
/// Every thread (or logical reader/writer) keeps its own cursor, so several
/// sequential streams can work on one persister at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    position: u64,
}

impl Cursor {
    /// Creates a cursor at position 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cursor at the given position.
    pub fn at(position: u64) -> Self {
        Self { position }
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the cursor to `position`.
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.position += n as u64;
    }
}

/// Reads from `persister` until `buf` is full or end of stream is reached.
///
/// Returns the number of bytes read.
pub(crate) fn read_fully_at(persister: &dyn Persister, pos: u64, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = persister.read_at(pos + filled as u64, &mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Writes all of `buf` to `persister`, failing if an attempt makes no progress.
pub(crate) fn write_fully_at(persister: &dyn Persister, pos: u64, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        let n = persister.write_at(pos + written as u64, &buf[written..])?;
        if n == 0 {
            return Err(crate::Error::end_of_stream(format!(
                "wrote {} of {} bytes at position {}",
                written,
                buf.len(),
                pos
            )));
        }
        written += n;
    }
    Ok(())
}
