//! Auto-sort of loose files at the storage root into category folders

use log::{error, info, warn};
use std::fs;
use std::sync::{Arc, MutexGuard, PoisonError};

use crate::error::{StorageError, StorageResult};
use crate::maintenance::MaintenanceLock;
use crate::storage::filesystem::{first_free_name, move_path, split_extension};
use crate::storage::{BulkOutcome, PathGuard, is_upload_temp};

const CATEGORIES: &[(&str, &[&str])] = &[
    ("Images", &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico"]),
    ("Documents", &["pdf", "doc", "docx", "txt", "odt", "rtf", "tex"]),
    ("Spreadsheets", &["xls", "xlsx", "csv", "ods"]),
    ("Presentations", &["ppt", "pptx", "odp"]),
    ("Videos", &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm"]),
    ("Audio", &["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a"]),
    ("Archives", &["zip", "rar", "7z", "tar", "gz", "bz2"]),
    ("Code", &["py", "js", "html", "css", "java", "cpp", "c", "h", "go", "rs"]),
];

const FALLBACK_CATEGORY: &str = "Other";

/// Category folder for a file name, by lower-cased extension
pub fn category_for(name: &str) -> &'static str {
    let (_, ext) = split_extension(name);
    let ext = ext.trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        return FALLBACK_CATEGORY;
    }
    CATEGORIES
        .iter()
        .find(|(_, extensions)| extensions.contains(&ext.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(FALLBACK_CATEGORY)
}

pub struct AutoSorter {
    guard: Arc<PathGuard>,
    lock: MaintenanceLock,
}

impl AutoSorter {
    pub fn new(guard: Arc<PathGuard>, lock: MaintenanceLock) -> Self {
        Self { guard, lock }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves every regular file directly under the root into its category
    /// folder. Subfolders are left alone.
    pub fn sort_root(&self) -> StorageResult<BulkOutcome<String>> {
        let _guard = self.lock();
        info!("Starting auto-sort");

        let root = self.guard.root();
        let entries = fs::read_dir(root).map_err(|e| {
            error!("Cannot read storage root: {}", e);
            StorageError::from_io(e, root)
        })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => match entry.file_type() {
                    Ok(file_type) if file_type.is_file() => {
                        let name = entry.file_name().to_string_lossy().to_string();
                        if !is_upload_temp(&name) {
                            files.push(name);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Cannot stat root entry: {}", e),
                },
                Err(e) => warn!("Cannot read root entry: {}", e),
            }
        }
        files.sort();

        let mut outcome = BulkOutcome::default();
        for name in files {
            let result = self.sort_file(&name);
            outcome.record("Auto-sort", &name, result);
        }

        info!(
            "Auto-sort complete: {} moved, {} errors",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    fn sort_file(&self, name: &str) -> StorageResult<String> {
        let root = self.guard.root();
        let category = category_for(name);
        let folder = root.join(category);
        fs::create_dir_all(&folder).map_err(|e| StorageError::from_io(e, &folder))?;

        let source = root.join(name);
        let destination = first_free_name(&folder, name, true, |n| format!("_{n}"));
        move_path(&source, &destination).map_err(|e| StorageError::from_io(e, &source))?;

        info!("Sorted {} into {}/", name, category);
        Ok(format!("{name} → {category}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn sorter() -> (TempDir, AutoSorter) {
        let temp = TempDir::new().unwrap();
        let guard = Arc::new(PathGuard::new(temp.path().join("root")).unwrap());
        (temp, AutoSorter::new(guard, Arc::new(Mutex::new(()))))
    }

    #[test]
    fn classifies_by_extension() {
        assert_eq!(category_for("holiday.JPG"), "Images");
        assert_eq!(category_for("budget.xlsx"), "Spreadsheets");
        assert_eq!(category_for("main.rs"), "Code");
        assert_eq!(category_for("backup.tar.gz"), "Archives");
        assert_eq!(category_for("Makefile"), "Other");
        assert_eq!(category_for("weird.xyz"), "Other");
    }

    #[test]
    fn sorts_root_files_only() {
        let (_temp, sorter) = sorter();
        let root = sorter.guard.root().to_path_buf();
        fs::write(root.join("song.mp3"), b"la").unwrap();
        fs::write(root.join("notes.txt"), b"n").unwrap();
        fs::create_dir(root.join("Keep")).unwrap();
        fs::write(root.join("Keep/inner.png"), b"p").unwrap();

        let outcome = sorter.sort_root().unwrap();
        assert!(outcome.is_complete());
        assert_eq!(
            outcome.succeeded,
            vec!["notes.txt → Documents/".to_string(), "song.mp3 → Audio/".to_string()]
        );
        assert!(root.join("Audio/song.mp3").is_file());
        assert!(root.join("Documents/notes.txt").is_file());
        assert!(root.join("Keep/inner.png").is_file());
        assert!(!root.join("Images").exists());
    }

    #[test]
    fn leaves_in_flight_uploads_alone() {
        let (_temp, sorter) = sorter();
        let root = sorter.guard.root().to_path_buf();
        fs::write(root.join(".upload-7-3.tmp"), b"partial").unwrap();

        let outcome = sorter.sort_root().unwrap();
        assert!(outcome.succeeded.is_empty());
        assert!(root.join(".upload-7-3.tmp").is_file());
        assert!(!root.join("Other").exists());
    }

    #[test]
    fn collisions_get_numbered() {
        let (_temp, sorter) = sorter();
        let root = sorter.guard.root().to_path_buf();
        fs::create_dir(root.join("Images")).unwrap();
        fs::write(root.join("Images/cat.png"), b"old").unwrap();
        fs::write(root.join("cat.png"), b"new").unwrap();

        sorter.sort_root().unwrap();
        assert_eq!(fs::read(root.join("Images/cat.png")).unwrap(), b"old");
        assert_eq!(fs::read(root.join("Images/cat_1.png")).unwrap(), b"new");
    }
}
