//! Buffered random-access persister.
//!
//! A fixed-capacity, hash-indexed, write-back cache of fixed-size blocks in
//! front of any other [`Persister`](crate::Persister).
//!
//! ## Architecture
//!
//! - **Entry**: one block of bytes with its valid length and dirty flag
//! - **Table**: `table_size` slots, each holding at most one entry; a block
//!   always lives in the slot its index hashes to
//! - **Persister**: resolves positions to entries, loading on a miss and
//!   writing back dirty entries on eviction, flush and close

mod buffered;
mod entry;
mod table;

pub use buffered::BufferedPersister;
pub use table::CacheStats;
