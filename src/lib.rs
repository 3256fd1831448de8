//! # bufpersist - Buffered Random-Access Persistence
//!
//! bufpersist puts a fixed-capacity, hash-indexed, write-back block cache in
//! front of any random-access byte store. The cache stays consistent under
//! concurrent readers and writers, supports truncation, and hands out cheap
//! read-only copies that share the live cache with the writer.
//!
//! ## Architecture
//!
//! The crate consists of a few small components:
//!
//! - **Persister**: the random-access byte store contract, implemented by
//!   files, memory and the cache itself (so caches stack)
//! - **Cursor**: a caller-owned position, one per thread or logical stream
//! - **Streams**: sequential [`Input`](stream::Input) and
//!   [`Output`](stream::Output) views driven by a cursor
//! - **Buffered persister**: the block cache, with eviction write-back,
//!   flush, truncation, close and read copies
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bufpersist::stream::{Input, Output};
//! use bufpersist::{BufferedPersister, CacheOptions, Cursor, FilePersister, Persister};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), bufpersist::Error> {
//! let file = Arc::new(FilePersister::open("./data.bin")?);
//! let cache = BufferedPersister::new(file, CacheOptions::default())?;
//!
//! // Sequential writes through the cache
//! let mut cursor = Cursor::new();
//! Output::new(&cache, &mut cursor)?.write_fully(b"hello world")?;
//!
//! // A read copy shares the cache but can never write
//! let snapshot = cache.read_copy()?;
//! let mut snapshot_cursor = cursor;
//! snapshot_cursor.set_position(0);
//! let mut input = Input::new(&snapshot, &mut snapshot_cursor)?;
//! assert_eq!(input.read_byte()?, Some(b'h'));
//!
//! snapshot.close(false)?;
//! cache.close(false)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod cache;
pub mod config;
pub mod error;
pub mod persister;
pub mod stream;

// Re-exports
pub use cache::{BufferedPersister, CacheStats};
pub use config::CacheOptions;
pub use error::{Error, Result};
pub use persister::{Cursor, FilePersister, MemoryPersister, MemoryStats, Persister};
