//! Storage errors
//!
//! Typed failures for the local store. I/O failures on the data directory are
//! classified so the CLI can print a hint next to the message.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Lowercased fragments the OS uses for "out of space"
const NO_SPACE_MARKERS: &[&str] = &[
    "no space left",
    "disk full",
    "quota exceeded",
    "not enough space",
];

#[derive(Error, Debug)]
pub enum StorageError {
    /// The data directory could not be created
    #[error("Cannot create data directory '{path}': {source}")]
    DataDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied on '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Out of disk space writing to '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No {table} record with id '{id}'")]
    NotFound { table: &'static str, id: String },

    #[error("A {table} record with id '{id}' already exists")]
    Duplicate { table: &'static str, id: String },

    /// A stored row could not be turned back into a record
    #[error("Invalid {table} record '{id}': {details}")]
    InvalidRecord {
        table: &'static str,
        id: String,
        details: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Queue payload could not be encoded or decoded
    #[error("Payload error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the store lock
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Classify an I/O failure on `path` by its kind and message
    pub fn from_io(source: io::Error, path: PathBuf) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            return StorageError::PermissionDenied { path, source };
        }

        let message = source.to_string().to_lowercase();
        if NO_SPACE_MARKERS.iter().any(|m| message.contains(m)) {
            StorageError::DiskFull { path, source }
        } else {
            StorageError::DataDirectory { path, source }
        }
    }

    /// Map a failed insert to `Duplicate` when it hit the primary key
    pub(crate) fn on_insert(error: rusqlite::Error, table: &'static str, id: &str) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::Duplicate {
                    table,
                    id: id.to_string(),
                }
            }
            other => StorageError::Database(other),
        }
    }

    /// Whether the user can fix this and simply retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. } | StorageError::PermissionDenied { .. }
        )
    }

    /// A short hint printed below the error, if there is one
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free some disk space, then run the command again."),
            StorageError::PermissionDenied { .. } => {
                Some("Make sure your user can read and write the data directory (see `rentready config show`).")
            }
            StorageError::DataDirectory { .. } => {
                Some("Point data_dir at a writable location with `rentready config set data_dir <path>`.")
            }
            StorageError::InvalidRecord { .. } => {
                Some("The row was written by an incompatible version. Fix or delete it by hand.")
            }
            StorageError::Duplicate { .. } => Some("Use a different id or edit the existing record."),
            _ => None,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
