//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;

use crate::error::{ErrorKind, StorageError, StorageResult, report_error};

/// A folder directly under a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
}

/// A file directly under a listed directory, or a duplicate group member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modified: u64,
}

/// Result of a directory listing operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

impl DirectoryListing {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }
}

/// Volume statistics for the partition holding the storage root
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// Bytes and files actually stored under the root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub total_bytes: u64,
    pub file_count: u64,
}

/// Result of a folder export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub uncompressed_bytes: u64,
    pub skipped: usize,
}

/// A single item a bulk operation could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub item: String,
    pub kind: ErrorKind,
    pub reason: String,
}

impl BulkFailure {
    pub fn new(item: &str, err: &StorageError) -> Self {
        Self {
            item: item.to_string(),
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

/// Collected outcome of a bulk operation; one bad item never aborts the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T> Default for BulkOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BulkOutcome<T> {
    /// Record the result of processing `item`, logging failures
    pub fn record(&mut self, operation: &str, item: &str, result: StorageResult<T>) {
        match result {
            Ok(value) => self.succeeded.push(value),
            Err(err) => self.fail(operation, item, &err),
        }
    }

    pub fn fail(&mut self, operation: &str, item: &str, err: &StorageError) {
        report_error(operation, item, err);
        self.failed.push(BulkFailure::new(item, err));
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
