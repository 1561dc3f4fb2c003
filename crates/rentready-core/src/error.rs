//! Crate-level error type
//!
//! Returned by the pure helpers (date parsing, checkout building). Storage
//! and remote failures keep their own types, `StorageError` and `RemoteError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed dates or an impossible checkout request; never retried
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
