//! Trash operations
//!
//! Lifecycle of a stored object: active → trashed → restored (active again)
//! or purged. The manifest is only updated after the object has actually
//! moved, and the object is moved back if the manifest cannot be written.

use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{StorageError, StorageResult, report_error};
use crate::storage::filesystem::{
    exists, first_free_name, move_path, now_epoch, remove_path, split_extension, tree_size,
};
use crate::storage::{BulkFailure, BulkOutcome, PathGuard};
use crate::trash::MANIFEST_FILE_NAME;
use crate::trash::manifest::{TRASH_ITEM_PREFIX, TrashItem, TrashManifest};
use crate::trash::results::{PurgeReport, TrashInfo};

/// Recoverable deletion backed by the trash manifest
pub struct TrashManager {
    guard: Arc<PathGuard>,
    lock: Mutex<()>,
}

impl TrashManager {
    pub fn new(guard: Arc<PathGuard>) -> Self {
        Self {
            guard,
            lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.guard.trash_dir()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.trash_dir().join(MANIFEST_FILE_NAME)
    }

    fn load_manifest(&self) -> TrashManifest {
        let mut manifest = TrashManifest::load(&self.manifest_path());
        manifest.prune_missing(&self.trash_dir());
        manifest
    }

    /// Moves the object at `path` into the trash and returns its trash name
    pub fn move_to_trash(&self, path: &str) -> StorageResult<String> {
        let full_path = self.guard.resolve_entry(path)?;
        if full_path == self.guard.root() {
            return Err(StorageError::InvalidPath(
                "The storage root cannot be trashed".into(),
            ));
        }
        let metadata =
            fs::symlink_metadata(&full_path).map_err(|e| StorageError::from_io(e, &full_path))?;

        let original_path = self.guard.relative(&full_path);
        let original_name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let is_folder = metadata.is_dir();
        let size = if is_folder {
            tree_size(&full_path)
        } else {
            metadata.len()
        };

        let _guard = self.lock();
        let trash_dir = self.trash_dir();
        fs::create_dir_all(&trash_dir).map_err(|e| StorageError::from_io(e, &trash_dir))?;

        let deletion_time = now_epoch();
        let (trash_name, trash_path) = unique_trash_name(&trash_dir, deletion_time, &original_name);

        if let Err(e) = move_path(&full_path, &trash_path) {
            error!("Failed to move {} to trash: {}", path, e);
            if exists(&trash_path) && !exists(&full_path) {
                let _ = move_path(&trash_path, &full_path);
            }
            return Err(StorageError::from_io(e, &full_path));
        }

        let manifest_path = self.manifest_path();
        let mut manifest = self.load_manifest();
        manifest.items.push(TrashItem {
            trash_name: trash_name.clone(),
            original_path: original_path.clone(),
            original_name,
            deletion_time,
            is_folder,
            size,
        });

        if let Err(e) = manifest.save(&manifest_path) {
            error!("Failed to record {} in trash manifest: {}", path, e);
            if let Err(undo) = move_path(&trash_path, &full_path) {
                error!("Could not put {} back after manifest failure: {}", path, undo);
            }
            return Err(e);
        }

        info!("Moved to trash: {} as {}", original_path, trash_name);
        Ok(trash_name)
    }

    /// Trashes several objects, continuing past failures
    pub fn trash_many(&self, paths: &[String]) -> BulkOutcome<String> {
        let mut outcome = BulkOutcome::default();
        for path in paths {
            outcome.record("Trash", path, self.move_to_trash(path));
        }
        outcome
    }

    /// Puts a trashed object back at its original location.
    ///
    /// If something now occupies that location the restored object gets a
    /// ` (restored N)` suffix. Returns the final relative path.
    pub fn restore(&self, trash_name: &str) -> StorageResult<String> {
        if !is_plain_name(trash_name) {
            return Err(StorageError::InvalidPath(trash_name.to_string()));
        }

        let _guard = self.lock();
        let manifest_path = self.manifest_path();
        let trash_dir = self.trash_dir();
        let mut manifest = TrashManifest::load(&manifest_path);
        let pruned = manifest.prune_missing(&trash_dir);

        let Some(index) = manifest.position(trash_name) else {
            if !pruned.is_empty() {
                manifest.save(&manifest_path)?;
            }
            if pruned.iter().any(|item| item.trash_name == trash_name) {
                return Err(StorageError::NotFound(format!(
                    "Trash item file not found: {trash_name}"
                )));
            }
            return Err(StorageError::NotFound(format!(
                "{trash_name} is not in the trash"
            )));
        };

        let item = manifest.items[index].clone();
        let trash_path = trash_dir.join(&item.trash_name);
        let requested = self.guard.resolve_entry(&item.original_path)?;
        let parent = requested
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(item.original_path.clone()))?;
        let name = requested
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| item.original_name.clone());
        let restore_path =
            first_free_name(parent, &name, !item.is_folder, |n| format!(" (restored {n})"));

        fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, parent))?;
        move_path(&trash_path, &restore_path).map_err(|e| {
            error!("Failed to restore {}: {}", trash_name, e);
            StorageError::from_io(e, &restore_path)
        })?;

        manifest.items.remove(index);
        if let Err(e) = manifest.save(&manifest_path) {
            error!("Failed to update trash manifest after restore: {}", e);
            if let Err(undo) = move_path(&restore_path, &trash_path) {
                error!("Could not return {} to trash: {}", trash_name, undo);
            }
            return Err(e);
        }

        let final_path = self.guard.relative(&restore_path);
        info!("Restored from trash: {} -> {}", trash_name, final_path);
        Ok(final_path)
    }

    /// Restores several trash items, continuing past failures
    pub fn restore_many(&self, trash_names: &[String]) -> BulkOutcome<String> {
        let mut outcome = BulkOutcome::default();
        for name in trash_names {
            outcome.record("Restore", name, self.restore(name));
        }
        outcome
    }

    /// Permanently deletes everything in the trash and clears the manifest
    pub fn empty(&self) -> StorageResult<PurgeReport> {
        let _guard = self.lock();
        let trash_dir = self.trash_dir();
        if !trash_dir.exists() {
            return Ok(PurgeReport::default());
        }

        let manifest_path = self.manifest_path();
        let manifest = TrashManifest::load(&manifest_path);
        let mut report = PurgeReport::default();

        for item in &manifest.items {
            match purge_item(&trash_dir, item) {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    report_error("Empty trash", &item.trash_name, &e);
                    report.errors.push(BulkFailure::new(&item.trash_name, &e));
                }
            }
        }

        TrashManifest::default().save(&manifest_path)?;
        info!("Emptied trash: {} items deleted", report.deleted);
        Ok(report)
    }

    /// Purges items deleted more than `max_age` ago.
    ///
    /// Items that fail to delete stay in the manifest so they are retried on
    /// the next run.
    pub fn cleanup_expired(&self, max_age: Duration) -> StorageResult<PurgeReport> {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now_epoch().saturating_sub(max_age);
        self.cleanup_deleted_before(cutoff)
    }

    fn cleanup_deleted_before(&self, cutoff: i64) -> StorageResult<PurgeReport> {
        let _guard = self.lock();
        let trash_dir = self.trash_dir();
        if !trash_dir.exists() {
            return Ok(PurgeReport::default());
        }

        let manifest_path = self.manifest_path();
        let mut manifest = TrashManifest::load(&manifest_path);
        let pruned = manifest.prune_missing(&trash_dir);
        let mut report = PurgeReport::default();
        let mut keep = Vec::with_capacity(manifest.items.len());

        for item in manifest.items.drain(..) {
            if item.deletion_time >= cutoff {
                keep.push(item);
                continue;
            }
            match purge_item(&trash_dir, &item) {
                Ok(_) => {
                    report.deleted += 1;
                    info!("Auto-deleted old trash item: {}", item.trash_name);
                }
                Err(e) => {
                    report_error("Trash cleanup", &item.trash_name, &e);
                    report.errors.push(BulkFailure::new(&item.trash_name, &e));
                    keep.push(item);
                }
            }
        }
        manifest.items = keep;

        if report.deleted > 0 || !pruned.is_empty() {
            manifest.save(&manifest_path)?;
        }
        if report.deleted > 0 {
            info!("Auto-cleanup: {} old items deleted", report.deleted);
        }
        Ok(report)
    }

    /// Count, total size and items of the trash, newest first. Reads without
    /// the lock; stale entries are hidden but not rewritten.
    pub fn info(&self) -> TrashInfo {
        let mut manifest = self.load_manifest();
        manifest
            .items
            .sort_by(|a, b| b.deletion_time.cmp(&a.deletion_time));

        TrashInfo {
            count: manifest.items.len(),
            total_size: manifest.total_size(),
            items: manifest.items,
        }
    }
}

/// Longest file name most filesystems accept, in bytes
const MAX_TRASH_NAME_BYTES: usize = 255;

/// `item_<timestamp>_<name>`, with a counter before the name on collision.
/// Long names are shortened to fit, keeping the extension.
fn unique_trash_name(trash_dir: &Path, timestamp: i64, original_name: &str) -> (String, PathBuf) {
    let mut prefix = format!("{TRASH_ITEM_PREFIX}{timestamp}_");
    let mut counter = 1u32;
    loop {
        let trash_name = fit_name(&prefix, original_name);
        let trash_path = trash_dir.join(&trash_name);
        if !exists(&trash_path) {
            return (trash_name, trash_path);
        }
        prefix = format!("{TRASH_ITEM_PREFIX}{timestamp}_{counter}_");
        counter += 1;
    }
}

fn fit_name(prefix: &str, name: &str) -> String {
    let budget = MAX_TRASH_NAME_BYTES.saturating_sub(prefix.len());
    if name.len() <= budget {
        return format!("{prefix}{name}");
    }
    let (stem, ext) = split_extension(name);
    if ext.len() < budget {
        let stem = truncate_bytes(stem, budget - ext.len());
        format!("{prefix}{stem}{ext}")
    } else {
        format!("{prefix}{}", truncate_bytes(name, budget))
    }
}

fn truncate_bytes(text: &str, max: usize) -> &str {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name != MANIFEST_FILE_NAME
        && !name.contains(['/', '\\', '\0'])
}

/// Delete the object behind `item`; `Ok(false)` if it was already gone
fn purge_item(trash_dir: &Path, item: &TrashItem) -> StorageResult<bool> {
    if !is_plain_name(&item.trash_name) {
        warn!("Refusing to purge malformed trash entry {:?}", item.trash_name);
        return Err(StorageError::InvalidPath(item.trash_name.clone()));
    }
    let path = trash_dir.join(&item.trash_name);
    if !exists(&path) {
        return Ok(false);
    }
    remove_path(&path).map_err(|e| StorageError::from_io(e, &path))?;
    Ok(true)
}
