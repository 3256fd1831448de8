//! Output view.

use crate::error::{Error, Result};
use crate::persister::{Cursor, Persister};
use std::io;

/// Writes sequentially to a persister, advancing a cursor.
pub struct Output<'a> {
    persister: &'a dyn Persister,
    cursor: &'a mut Cursor,
}

impl<'a> Output<'a> {
    /// Create an output view positioned at `cursor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if the persister is read-only and
    /// [`Error::Closed`] if it has been closed.
    pub fn new(persister: &'a dyn Persister, cursor: &'a mut Cursor) -> Result<Self> {
        if persister.is_closed() {
            return Err(Error::Closed);
        }
        if persister.is_read_only() {
            return Err(Error::unsupported("output on read-only persister"));
        }
        Ok(Self { persister, cursor })
    }

    /// Current write position
    pub fn position(&self) -> Result<u64> {
        self.check_open()?;
        Ok(self.cursor.position())
    }

    /// Move the write position
    pub fn set_position(&mut self, position: u64) -> Result<()> {
        self.check_open()?;
        self.cursor.set_position(position);
        Ok(())
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_fully(&[byte])
    }

    /// Write as much of `buf` as one attempt accepts.
    ///
    /// Returns the number of bytes written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.persister.write_at(self.cursor.position(), buf)?;
        self.cursor.advance(n);
        Ok(n)
    }

    /// Write all of `buf`, retrying partial writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] if an attempt writes nothing before
    /// the whole buffer is out. The bytes written up to that point stay
    /// written and the cursor is past them.
    pub fn write_fully(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..])?;
            if n == 0 {
                return Err(Error::end_of_stream(format!(
                    "wrote {} of {} bytes",
                    written,
                    buf.len()
                )));
            }
            written += n;
        }
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.persister.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl io::Write for Output<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(Output::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.persister.flush()?)
    }
}
