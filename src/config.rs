//! Configuration options for the buffered persister.

/// Construction-time tunables for a [`BufferedPersister`](crate::BufferedPersister).
///
/// The cache holds at most `table_size` blocks of `entry_size` bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Number of hash slots in the cache table.
    /// Larger tables improve the hit rate of random access.
    /// Default: 1024
    pub table_size: usize,

    /// Bytes per cached block.
    /// Larger blocks improve sequential write throughput but can hurt
    /// random-modify workloads on small tables.
    /// Default: 4KB
    pub entry_size: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            table_size: 1024,
            entry_size: 4 * 1024, // 4KB
        }
    }
}

impl CacheOptions {
    /// Creates a new CacheOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of hash slots.
    pub fn table_size(mut self, size: usize) -> Self {
        self.table_size = size;
        self
    }

    /// Sets the block size in bytes.
    pub fn entry_size(mut self, size: usize) -> Self {
        self.entry_size = size;
        self
    }

    /// Maximum number of bytes the cache can hold.
    pub fn capacity(&self) -> usize {
        self.table_size.saturating_mul(self.entry_size)
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.table_size == 0 {
            return Err(crate::Error::invalid_configuration("table_size must be > 0"));
        }
        if self.entry_size == 0 {
            return Err(crate::Error::invalid_configuration("entry_size must be > 0"));
        }
        Ok(())
    }
}
