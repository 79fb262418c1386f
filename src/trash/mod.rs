//! Trash bin
//!
//! Deletions are redirected into `<root>/.trash`, tracked by a JSON
//! manifest, and can be restored, purged or expired by age.

pub mod manifest;
pub mod operations;
pub mod results;

/// Manifest file name inside the trash directory
pub const MANIFEST_FILE_NAME: &str = ".trash_manifest.json";

pub use manifest::{TrashItem, TrashManifest};
pub use operations::TrashManager;
pub use results::{PurgeReport, TrashInfo};
