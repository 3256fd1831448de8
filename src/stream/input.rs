//! Input view.

use crate::error::{Error, Result};
use crate::persister::{Cursor, Persister};
use std::io;

/// Scratch size used when skipping
const SKIP_CHUNK: usize = 512;

/// Reads sequentially from a persister, advancing a cursor.
///
/// Reaching the end of the store is not an error: byte reads return `None`
/// and buffer reads return `0`.
pub struct Input<'a> {
    persister: &'a dyn Persister,
    cursor: &'a mut Cursor,
}

impl<'a> Input<'a> {
    /// Create an input view positioned at `cursor`.
    pub fn new(persister: &'a dyn Persister, cursor: &'a mut Cursor) -> Result<Self> {
        if persister.is_closed() {
            return Err(Error::Closed);
        }
        Ok(Self { persister, cursor })
    }

    /// Current read position
    pub fn position(&self) -> Result<u64> {
        self.check_open()?;
        Ok(self.cursor.position())
    }

    /// Move the read position
    pub fn set_position(&mut self, position: u64) -> Result<()> {
        self.check_open()?;
        self.cursor.set_position(position);
        Ok(())
    }

    /// Read one byte and advance past it.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.cursor.advance(1);
        }
        Ok(byte)
    }

    /// Read one byte without advancing.
    pub fn peek_byte(&self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.persister.read_at(self.cursor.position(), &mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Read up to `buf.len()` bytes.
    ///
    /// Returns the number of bytes read, `0` at end of stream.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.persister.read_at(self.cursor.position(), buf)?;
        self.cursor.advance(n);
        Ok(n)
    }

    /// Skip up to `n` bytes.
    ///
    /// Returns the number of bytes skipped, which is less than `n` only when
    /// the end of the stream was reached.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        let mut scratch = [0u8; SKIP_CHUNK];
        let mut skipped = 0u64;
        while skipped < n {
            let want = (n - skipped).min(SKIP_CHUNK as u64) as usize;
            let got = self.read_into(&mut scratch[..want])?;
            if got == 0 {
                break;
            }
            skipped += got as u64;
        }
        Ok(skipped)
    }

    fn check_open(&self) -> Result<()> {
        if self.persister.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl io::Read for Input<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}
