//! Trash manifest
//!
//! The manifest is the single persisted record of what the trash holds.
//! It is always replaced whole via write-temp-then-rename. A manifest that
//! fails to parse is kept aside as `<name>.corrupt` and rebuilt from the
//! objects in the trash directory.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{StorageError, StorageResult};
use crate::storage::filesystem::{exists, tree_size, write_atomic};

/// Prefix of every object name inside the trash directory
pub const TRASH_ITEM_PREFIX: &str = "item_";

/// One trashed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashItem {
    /// Unique name of the object inside the trash directory
    pub trash_name: String,
    /// Relative path the object was deleted from
    pub original_path: String,
    pub original_name: String,
    /// Seconds since the Unix epoch
    pub deletion_time: i64,
    pub is_folder: bool,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashManifest {
    pub items: Vec<TrashItem>,
}

impl TrashManifest {
    /// Read the manifest at `path`.
    ///
    /// A missing file is an empty manifest. An unreadable file is logged and
    /// treated as empty. A corrupt file is renamed aside and replaced by a
    /// manifest recovered from the trash directory next to it.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                error!("Failed to read trash manifest {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!("Failed to parse trash manifest {}: {}", path.display(), e);
                Self::recover(path)
            }
        }
    }

    fn recover(path: &Path) -> Self {
        let mut aside = path.as_os_str().to_owned();
        aside.push(".corrupt");
        if let Err(e) = fs::rename(path, &aside) {
            error!("Failed to move corrupt trash manifest aside: {}", e);
        }

        let manifest = match path.parent() {
            Some(trash_dir) => Self::rebuild(trash_dir),
            None => Self::default(),
        };
        if let Err(e) = manifest.save(path) {
            error!("Failed to save recovered trash manifest: {}", e);
        }
        info!(
            "Recovered {} trash entries from {}",
            manifest.items.len(),
            path.display()
        );
        manifest
    }

    /// Manifest describing every `item_<timestamp>_<name>` object in
    /// `trash_dir`. Recovered items restore to the storage root.
    pub fn rebuild(trash_dir: &Path) -> Self {
        let entries = match fs::read_dir(trash_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Cannot read trash directory {}: {}", trash_dir.display(), e);
                return Self::default();
            }
        };

        let mut items = Vec::new();
        for entry in entries.flatten() {
            let trash_name = entry.file_name().to_string_lossy().to_string();
            let Some((deletion_time, original_name)) = parse_trash_name(&trash_name) else {
                continue;
            };
            let metadata = match fs::symlink_metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping unreadable trash object {}: {}", trash_name, e);
                    continue;
                }
            };
            let is_folder = metadata.is_dir();
            let size = if is_folder {
                tree_size(&entry.path())
            } else {
                metadata.len()
            };
            items.push(TrashItem {
                original_path: original_name.to_string(),
                original_name: original_name.to_string(),
                trash_name,
                deletion_time,
                is_folder,
                size,
            });
        }
        items.sort_by(|a, b| a.trash_name.cmp(&b.trash_name));
        Self { items }
    }

    /// Persist the whole manifest atomically
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let contents = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &contents).map_err(|e| StorageError::from_io(e, path))
    }

    /// Drop entries whose object is no longer in `trash_dir`, returning them
    pub fn prune_missing(&mut self, trash_dir: &Path) -> Vec<TrashItem> {
        let (present, missing): (Vec<_>, Vec<_>) = self
            .items
            .drain(..)
            .partition(|item| exists(&trash_dir.join(&item.trash_name)));
        self.items = present;

        for item in &missing {
            warn!(
                "Pruning stale trash entry {} (object missing)",
                item.trash_name
            );
        }
        missing
    }

    pub fn position(&self, trash_name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.trash_name == trash_name)
    }

    pub fn total_size(&self) -> u64 {
        self.items.iter().map(|item| item.size).sum()
    }
}

/// Split `item_<timestamp>_<name>` into its timestamp and name
fn parse_trash_name(trash_name: &str) -> Option<(i64, &str)> {
    let (timestamp, name) = trash_name.strip_prefix(TRASH_ITEM_PREFIX)?.split_once('_')?;
    let timestamp = timestamp.parse().ok()?;
    (!name.is_empty()).then_some((timestamp, name))
}
