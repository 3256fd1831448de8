//! A single cached block.

use crate::error::{Error, Result};
use crate::persister::{read_fully_at, write_fully_at, Persister};

/// One block of the address space held in memory.
///
/// The buffer always has the full block size so that later writes anywhere
/// in the block can land without reallocating. Only the first `valid` bytes
/// mirror (or, when dirty, supersede) the store.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    /// Block-aligned offset of the first byte
    start: u64,
    buf: Box<[u8]>,
    /// Number of meaningful bytes at the front of `buf`
    valid: usize,
    /// Bytes not yet written back to the store
    dirty: bool,
}

impl CacheEntry {
    /// Load the block starting at `start` from `source`.
    ///
    /// Reads until the block is full or the source runs out; a block past the
    /// end of the source comes back with no valid bytes.
    pub(crate) fn load(source: &dyn Persister, start: u64, size: usize) -> Result<Self> {
        let mut buf = vec![0u8; size].into_boxed_slice();
        let valid = read_fully_at(source, start, &mut buf)?;
        Ok(Self { start, buf, valid, dirty: false })
    }

    /// Offset of the first byte of this block.
    pub(crate) fn start(&self) -> u64 {
        self.start
    }

    /// Number of valid bytes.
    #[cfg(test)]
    pub(crate) fn valid_len(&self) -> usize {
        self.valid
    }

    /// Returns true if the entry holds bytes the store has not seen.
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Copy bytes starting at `offset` into `out`.
    ///
    /// Returns 0 when `offset` is at or beyond the valid bytes.
    pub(crate) fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        if offset >= self.valid {
            return 0;
        }
        let n = out.len().min(self.valid - offset);
        out[..n].copy_from_slice(&self.buf[offset..offset + n]);
        n
    }

    /// Copy as much of `data` as fits into the block at `offset`.
    pub(crate) fn write(&mut self, offset: usize, data: &[u8]) -> Result<usize> {
        if offset >= self.buf.len() {
            return Err(Error::internal(format!(
                "write offset {} outside block of {} bytes at {}",
                offset,
                self.buf.len(),
                self.start
            )));
        }
        let n = data.len().min(self.buf.len() - offset);
        self.buf[offset..offset + n].copy_from_slice(&data[..n]);
        self.dirty = true;
        self.valid = self.valid.max(offset + n);
        Ok(n)
    }

    /// Cut the valid bytes so that the entry ends at `len`.
    ///
    /// Marks the entry dirty if anything was cut. The cut bytes are zeroed so
    /// a later write further into the block does not resurrect them.
    pub(crate) fn truncate(&mut self, len: u64) {
        let end = self.start + self.valid as u64;
        if end > len {
            let keep = len.saturating_sub(self.start) as usize;
            self.buf[keep..self.valid].fill(0);
            self.valid = keep;
            self.dirty = true;
        }
    }

    /// Write the valid bytes to `target` and mark the entry clean.
    pub(crate) fn write_back(&mut self, target: &dyn Persister) -> Result<()> {
        write_fully_at(target, self.start, &self.buf[..self.valid])?;
        self.dirty = false;
        Ok(())
    }
}
