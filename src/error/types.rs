//! Error types
//!
//! Defines the typed failures every storage operation can return.

use serde::Serialize;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Storage errors shared by the file store, trash and maintenance services
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Not an image file: {0}")]
    NotAnImage(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Insufficient storage space: {required} bytes required, {available} available")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("Too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Serialisable tag for a [`StorageError`], handed to the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    AlreadyExists,
    NotADirectory,
    NotAFile,
    NotAnImage,
    PermissionDenied,
    InsufficientSpace,
    TooLarge,
    IoFailure,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidPath(_) => ErrorKind::InvalidPath,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StorageError::NotADirectory(_) => ErrorKind::NotADirectory,
            StorageError::NotAFile(_) => ErrorKind::NotAFile,
            StorageError::NotAnImage(_) => ErrorKind::NotAnImage,
            StorageError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            StorageError::InsufficientSpace { .. } => ErrorKind::InsufficientSpace,
            StorageError::TooLarge { .. } => ErrorKind::TooLarge,
            StorageError::Io(_) => ErrorKind::IoFailure,
        }
    }

    /// Classifies an OS error raised while touching `path`.
    ///
    /// Denials, missing objects and collisions become their typed variants;
    /// anything else is wrapped as `Io`.
    pub fn from_io(error: io::Error, path: &Path) -> Self {
        let shown = path.display().to_string();
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(shown),
            io::ErrorKind::NotFound => StorageError::NotFound(shown),
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(shown),
            _ => StorageError::Io(error),
        }
    }

    /// True for failures caused by the caller's input rather than the host
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StorageError::Io(_) | StorageError::PermissionDenied(_))
    }
}

impl From<zip::result::ZipError> for StorageError {
    fn from(error: zip::result::ZipError) -> Self {
        match error {
            zip::result::ZipError::Io(e) => StorageError::Io(e),
            other => StorageError::Io(io::Error::other(other)),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, error))
    }
}

/// Convenience alias used throughout the crate
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_os_errors_by_kind() {
        let path = Path::new("/srv/data/a.txt");

        let denied = StorageError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), path);
        assert_eq!(denied.kind(), ErrorKind::PermissionDenied);

        let missing = StorageError::from_io(io::Error::from(io::ErrorKind::NotFound), path);
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let other = StorageError::from_io(io::Error::other("disk on fire"), path);
        assert_eq!(other.kind(), ErrorKind::IoFailure);
        assert!(!other.is_client_error());
    }

    #[test]
    fn kind_serialises_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientSpace).unwrap();
        assert_eq!(json, "\"insufficient_space\"");
    }
}
