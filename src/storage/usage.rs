//! Disk and storage usage
//!
//! Volume statistics come from `sysinfo`; the stored byte count is a walk
//! over the root.

use log::{debug, warn};
use std::path::Path;
use sysinfo::Disks;
use walkdir::WalkDir;

use crate::storage::results::{DiskUsage, StorageUsage};

/// Statistics for the volume holding `path`, or `None` when no mounted disk
/// contains it (some containers hide their mounts).
pub fn disk_usage(path: &Path) -> Option<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len());

    let Some(disk) = disk else {
        debug!("No mounted volume found for {}", path.display());
        return None;
    };

    let total = disk.total_space();
    let free = disk.available_space();
    let used = total.saturating_sub(free);
    let percent = if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    };

    Some(DiskUsage {
        total,
        used,
        free,
        percent,
    })
}

/// Total bytes and file count stored under `root`
pub fn storage_usage(root: &Path) -> StorageUsage {
    let mut usage = StorageUsage::default();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot stat entry while measuring usage: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => {
                usage.total_bytes += metadata.len();
                usage.file_count += 1;
            }
            Err(e) => warn!("Cannot stat file {}: {}", entry.path().display(), e),
        }
    }

    usage
}
