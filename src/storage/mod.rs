//! File system storage management
//!
//! Path confinement, the atomic file store, folder export, thumbnails and
//! usage reporting over the single storage root.

pub mod archive;
pub mod filesystem;
pub mod operations;
pub mod results;
pub mod thumbnail;
pub mod usage;
pub mod validation;

/// Directory under the root holding trashed objects and the manifest
pub const TRASH_DIR_NAME: &str = ".trash";

/// Directory under the root receiving duplicate scan copies
pub const QUARANTINE_DIR_NAME: &str = "_duplicates";

/// Prefix of the temp file an upload streams into before it is committed
pub const UPLOAD_TEMP_PREFIX: &str = ".upload-";

/// True for an in-flight upload temp file; listings, scans and sorting skip these
pub fn is_upload_temp(name: &str) -> bool {
    name.starts_with(UPLOAD_TEMP_PREFIX) && name.ends_with(".tmp")
}

/// True for a walk entry directly under the root that belongs to the trash
/// or the duplicate quarantine
pub fn is_internal_root_entry(entry: &walkdir::DirEntry) -> bool {
    entry.depth() == 1
        && matches!(
            entry.file_name().to_str(),
            Some(TRASH_DIR_NAME) | Some(QUARANTINE_DIR_NAME)
        )
}

pub use operations::{FileStore, UploadRequest};
pub use results::{
    ArchiveSummary, BulkFailure, BulkOutcome, DirectoryListing, DiskUsage, FileEntry, FolderEntry,
    StorageUsage,
};
pub use validation::{PathGuard, sanitize_filename, validate_name};
