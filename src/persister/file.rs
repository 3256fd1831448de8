//! File-backed persister.

use super::Persister;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A persister that stores its bytes in a single file.
///
/// All access goes through one seek-then-transfer sequence on a shared file
/// handle, so calls are serialized by an internal mutex.
///
/// # Example
///
/// ```no_run
/// use bufpersist::{FilePersister, Persister};
///
/// # fn main() -> Result<(), bufpersist::Error> {
/// let file = FilePersister::open("data.bin")?;
/// file.write_at(0, b"hello")?;
/// file.flush()?;
/// file.close(false)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FilePersister {
    /// Path to the backing file
    path: PathBuf,
    /// Open file handle, `None` after close
    file: Mutex<Option<File>>,
    read_only: bool,
}

impl FilePersister {
    /// Open or create a file for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(&path)?;

        Ok(Self { path, file: Mutex::new(Some(file)), read_only: false })
    }

    /// Open an existing file for reading only.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        Ok(Self { path, file: Mutex::new(Some(file)), read_only: true })
    }

    /// Get the path to the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes.
    pub fn len(&self) -> Result<u64> {
        let guard = self.file.lock();
        let file = guard.as_ref().ok_or(Error::Closed)?;
        Ok(file.metadata()?.len())
    }

    fn check_writable(&self, op: &str) -> Result<()> {
        if self.read_only {
            return Err(Error::unsupported(format!("{} on read-only file {:?}", op, self.path)));
        }
        Ok(())
    }
}

impl Persister for FilePersister {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(Error::Closed)?;

        file.seek(SeekFrom::Start(pos))?;
        Ok(file.read(buf)?)
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> Result<usize> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(Error::Closed)?;
        self.check_writable("write")?;

        file.seek(SeekFrom::Start(pos))?;
        Ok(file.write(buf)?)
    }

    fn set_length(&self, len: u64) -> Result<()> {
        let guard = self.file.lock();
        let file = guard.as_ref().ok_or(Error::Closed)?;
        self.check_writable("set_length")?;

        file.set_len(len)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(Error::Closed)?;
        self.check_writable("flush")?;

        file.flush()?;
        file.sync_data()?;
        Ok(())
    }

    fn close(&self, erase: bool) -> Result<()> {
        if erase {
            self.check_writable("erase")?;
        }

        let mut guard = self.file.lock();
        let Some(file) = guard.take() else {
            return Ok(());
        };
        drop(file);

        if erase {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn create_read_copy(&self) -> Result<Arc<dyn Persister>> {
        if self.file.lock().is_none() {
            return Err(Error::Closed);
        }
        Ok(Arc::new(FilePersister::open_read_only(&self.path)?))
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_closed(&self) -> bool {
        self.file.lock().is_none()
    }
}
