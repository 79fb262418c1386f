//! Error handlers
//!
//! Logging helpers used where a failure is recorded rather than returned.

use crate::error::types::StorageError;
use log::{error, warn};

/// Log a failure for `item` at a level matching its cause
pub fn report_error(operation: &str, item: &str, err: &StorageError) {
    if err.is_client_error() {
        warn!("{} rejected for {}: {}", operation, item, err);
    } else {
        error!("{} failed for {}: {}", operation, item, err);
    }
}
