//! Trash result types

use serde::Serialize;

use crate::storage::BulkFailure;
use crate::trash::manifest::TrashItem;

/// Summary of the trash contents
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrashInfo {
    pub count: usize,
    pub total_size: u64,
    /// Newest deletions first
    pub items: Vec<TrashItem>,
}

/// Result of emptying the trash or expiring old items
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeReport {
    pub deleted: usize,
    pub errors: Vec<BulkFailure>,
}
