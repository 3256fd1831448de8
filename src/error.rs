//! Error types for bufpersist.

use std::io;

/// The result type used throughout bufpersist.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for persister operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred in the underlying store.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The persister was closed before the operation was attempted.
    #[error("Persister is closed")]
    Closed,

    /// The persister was constructed with invalid parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The operation is not supported by this persister (e.g. writing
    /// through a read copy).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A write could not make progress before the requested length was
    /// written.
    #[error("Unexpected end of stream: {0}")]
    EndOfStream(String),
}

impl Error {
    /// Creates a new invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    /// Creates a new unsupported operation error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Creates a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Creates a new end of stream error.
    pub fn end_of_stream(msg: impl Into<String>) -> Self {
        Error::EndOfStream(msg.into())
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            Error::InvalidConfiguration(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, err),
            Error::EndOfStream(_) => io::Error::new(io::ErrorKind::WriteZero, err),
            Error::Internal(_) => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}
