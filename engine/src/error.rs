//! Error types for the journal engine

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    /// A bucket entry does not follow the `YYYY-MM-DD_hh-mm.ss.ext` shape
    #[error("Malformed clip filename: {0}")]
    MalformedFilename(String),

    #[error("Failed to write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Notification scheduling failed: {0}")]
    NotificationScheduling(String),

    #[error("Journal store is unavailable: {0}")]
    Unavailable(String),
}

impl JournalError {
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageRead {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn storage_errors_keep_path_and_cause() {
        let err = JournalError::read(
            "/journal/videos/2024/03",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "Failed to read /journal/videos/2024/03: denied");

        let cause = err.source().and_then(|s| s.downcast_ref::<io::Error>());
        assert_eq!(cause.map(io::Error::kind), Some(io::ErrorKind::PermissionDenied));
    }
}
