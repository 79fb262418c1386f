//! Maintenance result types

use serde::Serialize;

use crate::storage::{BulkFailure, FileEntry};

/// Files sharing the same size and content digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Lower-case hex SHA-256 of the full content
    pub hash: String,
    pub size: u64,
    /// Sorted by relative path
    pub members: Vec<FileEntry>,
}

impl DuplicateGroup {
    /// Name of the quarantine subfolder holding this group's copies
    pub fn folder_name(&self) -> &str {
        &self.hash[..self.hash.len().min(8)]
    }
}

/// Result of a duplicate scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub groups: Vec<DuplicateGroup>,
    pub files_scanned: usize,
    /// Members that could not be copied into quarantine
    pub copy_errors: Vec<BulkFailure>,
}

impl ScanReport {
    /// Bytes that would be freed by keeping one copy per group
    pub fn reclaimable_bytes(&self) -> u64 {
        self.groups
            .iter()
            .map(|g| g.size * (g.members.len() as u64).saturating_sub(1))
            .sum()
    }
}
