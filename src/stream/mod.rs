//! Sequential views over a persister.
//!
//! [`Input`] and [`Output`] pair a persister with a caller-owned
//! [`Cursor`](crate::Cursor) and advance it as bytes are read or written.
//! Both also implement the corresponding `std::io` trait.
//!
//! ## Usage
//!
//! ```rust
//! use bufpersist::stream::{Input, Output};
//! use bufpersist::{Cursor, MemoryPersister};
//!
//! # fn main() -> Result<(), bufpersist::Error> {
//! let store = MemoryPersister::new();
//!
//! let mut cursor = Cursor::new();
//! Output::new(&store, &mut cursor)?.write_fully(b"abc")?;
//! assert_eq!(cursor.position(), 3);
//!
//! cursor.set_position(0);
//! let mut input = Input::new(&store, &mut cursor)?;
//! assert_eq!(input.peek_byte()?, Some(b'a'));
//! assert_eq!(input.read_byte()?, Some(b'a'));
//! assert_eq!(input.skip(5)?, 2);
//! assert_eq!(input.read_byte()?, None);
//! # Ok(())
//! # }
//! ```

pub mod input;
pub mod output;

pub use input::Input;
pub use output::Output;
