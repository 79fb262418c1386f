//! Storage operations
//!
//! CRUD over the guarded tree: listing, folder creation, rename, move,
//! streamed uploads and downloads. Every mutation runs under the store's
//! single lock; listings read without it.

use log::{debug, error, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use walkdir::WalkDir;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::storage::archive;
use crate::storage::filesystem::{exists, first_free_name, move_path, unix_seconds};
use crate::storage::results::{
    ArchiveSummary, BulkOutcome, DirectoryListing, DiskUsage, FileEntry, FolderEntry,
    StorageUsage,
};
use crate::storage::thumbnail::{self, THUMBNAIL_SIZE_RANGE};
use crate::storage::usage;
use crate::storage::validation::{PathGuard, sanitize_filename, validate_name};
use crate::storage::{
    TRASH_DIR_NAME, UPLOAD_TEMP_PREFIX, is_internal_root_entry, is_upload_temp,
};

static UPLOAD_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Parameters of a single uploaded file
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Folder the upload targets, relative to the root
    pub dest_path: String,
    /// Name the client sent for the file
    pub filename: String,
    /// Path inside an uploaded folder tree, e.g. `Trip/day1/a.jpg`
    pub relative_path: Option<String>,
    /// Announced payload size, checked against free space up front
    pub expected_size: Option<u64>,
}

impl UploadRequest {
    pub fn new(dest_path: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            dest_path: dest_path.into(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }
}

/// Atomic file store over the storage root
pub struct FileStore {
    guard: Arc<PathGuard>,
    config: Arc<StorageConfig>,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(guard: Arc<PathGuard>, config: Arc<StorageConfig>) -> Self {
        Self {
            guard,
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lists folders and files directly under `path`.
    ///
    /// A missing directory yields an empty listing; a file yields
    /// `NotADirectory`. Entries that cannot be stat'ed are skipped.
    pub fn list(&self, path: &str) -> StorageResult<DirectoryListing> {
        let full_path = self.guard.resolve(path)?;

        match fs::metadata(&full_path) {
            Ok(metadata) if !metadata.is_dir() => {
                return Err(StorageError::NotADirectory(path.to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(DirectoryListing::default());
            }
            Err(e) => return Err(StorageError::from_io(e, &full_path)),
        }

        let entries =
            fs::read_dir(&full_path).map_err(|e| StorageError::from_io(e, &full_path))?;
        let base = self.guard.relative(&full_path);
        let at_root = full_path == self.guard.root();
        let mut listing = DirectoryListing::default();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read entry in {}: {}", path, e);
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if (at_root && name == TRASH_DIR_NAME) || is_upload_temp(&name) {
                continue;
            }

            // Broken or escaping symlinks are still listed so they can be removed
            let metadata = match fs::metadata(entry.path())
                .or_else(|_| fs::symlink_metadata(entry.path()))
            {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Cannot stat {}: {}", name, e);
                    continue;
                }
            };

            let entry_path = join_relative(&base, &name);
            if metadata.is_dir() {
                listing.folders.push(FolderEntry {
                    name,
                    path: entry_path,
                });
            } else {
                listing.files.push(FileEntry {
                    name,
                    path: entry_path,
                    size: metadata.len(),
                    modified: metadata.modified().map(unix_seconds).unwrap_or(0),
                });
            }
        }

        listing.folders.sort_by_key(|f| f.name.to_lowercase());
        listing.files.sort_by_key(|f| f.name.to_lowercase());

        debug!(
            "Listed directory {} - {} folders, {} files",
            path,
            listing.folders.len(),
            listing.files.len()
        );
        Ok(listing)
    }

    /// Creates folder `name` under `path`, returning its relative path
    pub fn create_folder(&self, path: &str, name: &str) -> StorageResult<String> {
        let name = validate_name(name, self.config.max_filename_length)?;
        let parent = self.guard.resolve(path)?;
        if parent.exists() && !parent.is_dir() {
            return Err(StorageError::NotADirectory(path.to_string()));
        }

        let new_path = join_relative(&self.guard.relative(&parent), &name);
        let full_path = self.guard.resolve(&new_path)?;

        let _guard = self.lock();
        if exists(&full_path) {
            return Err(StorageError::AlreadyExists(new_path));
        }

        fs::create_dir_all(&parent)
            .and_then(|_| fs::create_dir(&full_path))
            .map_err(|e| {
                error!("Failed to create folder {}: {}", new_path, e);
                StorageError::from_io(e, &full_path)
            })?;

        info!("Created folder: {}", new_path);
        Ok(new_path)
    }

    /// Renames the object at `path` within its parent folder
    pub fn rename(&self, path: &str, new_name: &str) -> StorageResult<String> {
        let new_name = validate_name(new_name, self.config.max_filename_length)?;
        let source = self.existing_entry(path)?;

        let parent = source
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        let new_path = join_relative(&self.guard.relative(parent), &new_name);
        let target = self.guard.resolve_entry(&new_path)?;

        let _guard = self.lock();
        if exists(&target) {
            return Err(StorageError::AlreadyExists(new_path));
        }
        if !exists(&source) {
            return Err(StorageError::NotFound(path.to_string()));
        }

        // rename(2) replaces atomically; the existence check above keeps it
        // from overwriting
        fs::rename(&source, &target).map_err(|e| {
            error!("Failed to rename {} to {}: {}", path, new_name, e);
            StorageError::from_io(e, &source)
        })?;

        info!("Renamed {} to {}", path, new_path);
        Ok(new_path)
    }

    /// Moves the object at `source_path` into folder `dest_folder`
    pub fn move_item(&self, source_path: &str, dest_folder: &str) -> StorageResult<String> {
        let source = self.existing_entry(source_path)?;
        let destination = self.guard.resolve(dest_folder)?;

        match fs::metadata(&destination) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(StorageError::NotADirectory(dest_folder.to_string())),
            Err(e) => return Err(StorageError::from_io(e, &destination)),
        }
        if destination.starts_with(&source) {
            return Err(StorageError::InvalidPath(format!(
                "Cannot move {source_path} into itself"
            )));
        }

        let item_name = source
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(source_path.to_string()))?;
        let target = destination.join(item_name);
        let new_path = self.guard.relative(&target);

        let _guard = self.lock();
        if exists(&target) {
            return Err(StorageError::AlreadyExists(new_path));
        }

        move_path(&source, &target).map_err(|e| {
            error!("Failed to move {} to {}: {}", source_path, dest_folder, e);
            StorageError::from_io(e, &source)
        })?;

        info!("Moved {} to {}", source_path, new_path);
        Ok(new_path)
    }

    /// Moves several objects into `dest_folder`, continuing past failures
    pub fn move_many(&self, sources: &[String], dest_folder: &str) -> BulkOutcome<String> {
        let mut outcome = BulkOutcome::default();
        for source in sources {
            outcome.record("Move", source, self.move_item(source, dest_folder));
        }
        outcome
    }

    /// Streams `reader` into the tree and commits it atomically.
    ///
    /// Bytes go to a hidden temp file beside the destination in fixed-size
    /// chunks; only after the stream ends cleanly is a free final name picked
    /// (`name_1.ext`, `name_2.ext`, ...) and the temp file renamed onto it.
    /// On any failure the temp file is removed and nothing appears at the
    /// final path.
    pub fn save_upload<R: Read>(
        &self,
        reader: &mut R,
        request: &UploadRequest,
    ) -> StorageResult<String> {
        let (subdirs, raw_name) = split_upload_name(request);
        let filename = validate_name(&raw_name, self.config.max_filename_length)?;

        let dest = self.guard.resolve(&request.dest_path)?;
        let mut upload_path = self.guard.relative(&dest);
        for dir in &subdirs {
            upload_path = join_relative(&upload_path, dir);
        }
        let directory = self.guard.resolve(&upload_path)?;
        if directory.exists() && !directory.is_dir() {
            return Err(StorageError::NotADirectory(upload_path));
        }

        self.ensure_free_space(request.expected_size.unwrap_or(0))?;

        {
            let _guard = self.lock();
            fs::create_dir_all(&directory).map_err(|e| {
                error!(
                    "Failed to create parent directories for {}: {}",
                    upload_path, e
                );
                StorageError::from_io(e, &directory)
            })?;
        }

        let temp_path = directory.join(format!(
            "{UPLOAD_TEMP_PREFIX}{}-{}.tmp",
            std::process::id(),
            UPLOAD_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));
        let written = match self.stream_to_file(reader, &temp_path) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                error!("Failed to upload file {}: {}", filename, e);
                return Err(StorageError::from_io(e, &temp_path));
            }
        };

        let _guard = self.lock();
        let final_path = first_free_name(&directory, &filename, true, |n| format!("_{n}"));
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            error!("Failed to commit upload {}: {}", filename, e);
            return Err(StorageError::from_io(e, &final_path));
        }

        let dest_path = self.guard.relative(&final_path);
        info!("Uploaded file: {} ({} bytes)", dest_path, written);
        Ok(dest_path)
    }

    fn stream_to_file<R: Read>(&self, reader: &mut R, temp_path: &Path) -> io::Result<u64> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp_path)?;
        let mut buffer = vec![0u8; self.config.chunk_size];
        let mut total = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            file.write_all(&buffer[..n])?;
            total += n as u64;
        }

        file.sync_all()?;
        Ok(total)
    }

    fn ensure_free_space(&self, incoming: u64) -> StorageResult<()> {
        let required = incoming.saturating_add(self.config.min_free_space_bytes);
        if required == 0 {
            return Ok(());
        }
        match usage::disk_usage(self.guard.root()) {
            Some(disk) if disk.free < required => {
                warn!(
                    "Rejecting upload: {} bytes required, {} available",
                    required, disk.free
                );
                Err(StorageError::InsufficientSpace {
                    required,
                    available: disk.free,
                })
            }
            _ => Ok(()),
        }
    }

    /// Opens a stored file for streaming out, with its size
    pub fn open_file(&self, path: &str) -> StorageResult<(File, u64)> {
        let full_path = self.guard.resolve(path)?;
        let metadata =
            fs::metadata(&full_path).map_err(|e| StorageError::from_io(e, &full_path))?;
        if !metadata.is_file() {
            return Err(StorageError::NotAFile(path.to_string()));
        }

        let file = File::open(&full_path).map_err(|e| StorageError::from_io(e, &full_path))?;
        info!("File opened for download: {}", path);
        Ok((file, metadata.len()))
    }

    /// Every folder up to the configured depth, for a move-target picker
    pub fn list_folders(&self) -> StorageResult<Vec<String>> {
        let root = self.guard.root();
        let mut folders = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.config.folder_listing_max_depth)
            .into_iter()
            .filter_entry(|entry| !is_internal_root_entry(entry));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    folders.push(self.guard.relative(entry.path()));
                }
                Ok(_) => {}
                Err(e) => warn!("Cannot read folder while listing: {}", e),
            }
        }

        folders.sort();
        Ok(folders)
    }

    /// Writes a ZIP of folder `path` into `sink`, honouring the size cap
    pub fn export_folder<W: Write + Seek>(
        &self,
        path: &str,
        sink: W,
    ) -> StorageResult<ArchiveSummary> {
        archive::export_folder(&self.guard, path, self.config.max_archive_size_bytes, sink)
    }

    /// JPEG thumbnail of image `path`. A missing or out-of-range `size`
    /// falls back to the configured default; `None` means serve the original.
    pub fn thumbnail(&self, path: &str, size: Option<u32>) -> StorageResult<Option<Vec<u8>>> {
        let size = size
            .filter(|size| THUMBNAIL_SIZE_RANGE.contains(size))
            .unwrap_or(self.config.thumbnail_size);
        thumbnail::render_thumbnail(
            &self.guard,
            path,
            size,
            self.config.thumbnail_max_source_bytes,
        )
    }

    /// Volume statistics for the partition holding the root
    pub fn disk_usage(&self) -> Option<DiskUsage> {
        usage::disk_usage(self.guard.root())
    }

    /// Bytes and files stored under the root
    pub fn storage_usage(&self) -> StorageUsage {
        usage::storage_usage(self.guard.root())
    }

    fn existing_entry(&self, path: &str) -> StorageResult<PathBuf> {
        let full_path = self.guard.resolve_entry(path)?;
        if full_path == self.guard.root() {
            return Err(StorageError::InvalidPath(
                "The storage root cannot be modified".into(),
            ));
        }
        if !exists(&full_path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(full_path)
    }
}

/// Join a relative folder and a child name with `/`
pub(crate) fn join_relative(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

/// Folder components and file name for an upload. Folder uploads carry the
/// file's position in the tree; each folder component is sanitized and empty
/// results are dropped.
fn split_upload_name(request: &UploadRequest) -> (Vec<String>, String) {
    match request.relative_path.as_deref() {
        Some(relative) if !relative.trim().is_empty() => {
            let mut parts: Vec<&str> = relative
                .split(['/', '\\'])
                .filter(|p| !p.is_empty())
                .collect();
            let name = parts.pop().unwrap_or_default().to_string();
            let dirs = parts.into_iter().filter_map(sanitize_filename).collect();
            (dirs, name)
        }
        _ => (Vec::new(), request.filename.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::QUARANTINE_DIR_NAME;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let config = StorageConfig {
            min_free_space_bytes: 0,
            ..StorageConfig::with_root(&root)
        };
        let guard = Arc::new(PathGuard::new(&root).unwrap());
        (temp, FileStore::new(guard, Arc::new(config)))
    }

    /// Yields some bytes, then fails like a dropped connection
    struct BrokenStream {
        sent: bool,
    }

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "client went away",
                ));
            }
            self.sent = true;
            let n = buf.len().min(16);
            buf[..n].fill(b'x');
            Ok(n)
        }
    }

    #[test]
    fn list_missing_directory_is_empty() {
        let (_temp, store) = store();
        assert!(store.list("nowhere").unwrap().is_empty());
    }

    #[test]
    fn list_file_is_not_a_directory() {
        let (_temp, store) = store();
        fs::write(store.guard().root().join("a.txt"), b"x").unwrap();
        assert!(matches!(
            store.list("a.txt"),
            Err(StorageError::NotADirectory(_))
        ));
    }

    #[test]
    fn list_sorts_case_insensitively() {
        let (_temp, store) = store();
        let root = store.guard().root().to_path_buf();
        for name in ["beta.txt", "Alpha.txt", "charlie.txt"] {
            fs::write(root.join(name), b"x").unwrap();
        }
        fs::create_dir(root.join("zoo")).unwrap();
        fs::create_dir(root.join("Apes")).unwrap();

        let listing = store.list("").unwrap();
        let files: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        let folders: Vec<_> = listing.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(files, vec!["Alpha.txt", "beta.txt", "charlie.txt"]);
        assert_eq!(folders, vec!["Apes", "zoo"]);
    }

    #[test]
    fn create_folder_twice_conflicts() {
        let (_temp, store) = store();
        assert_eq!(store.create_folder("", "Photos").unwrap(), "Photos");
        assert!(matches!(
            store.create_folder("", "Photos"),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn create_folder_rejects_unusable_names() {
        let (_temp, store) = store();
        assert!(matches!(
            store.create_folder("", "../.."),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            store.create_folder("", &"n".repeat(300)),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn rename_refuses_to_overwrite() {
        let (_temp, store) = store();
        let root = store.guard().root().to_path_buf();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("b.txt"), b"b").unwrap();

        assert!(matches!(
            store.rename("a.txt", "b.txt"),
            Err(StorageError::AlreadyExists(_))
        ));
        assert_eq!(store.rename("a.txt", "c.txt").unwrap(), "c.txt");
        assert_eq!(fs::read(root.join("c.txt")).unwrap(), b"a");
        assert_eq!(fs::read(root.join("b.txt")).unwrap(), b"b");
    }

    #[test]
    fn rename_missing_source_is_not_found() {
        let (_temp, store) = store();
        assert!(matches!(
            store.rename("ghost.txt", "x.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn move_into_folder_and_collision() {
        let (_temp, store) = store();
        let root = store.guard().root().to_path_buf();
        fs::create_dir(root.join("Docs")).unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();

        assert_eq!(store.move_item("a.txt", "Docs").unwrap(), "Docs/a.txt");
        assert!(!root.join("a.txt").exists());

        fs::write(root.join("a.txt"), b"again").unwrap();
        assert!(matches!(
            store.move_item("a.txt", "Docs"),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn move_folder_into_itself_is_refused() {
        let (_temp, store) = store();
        store.create_folder("", "Outer").unwrap();
        store.create_folder("Outer", "Inner").unwrap();
        assert!(matches!(
            store.move_item("Outer", "Outer/Inner"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn move_many_collects_failures() {
        let (_temp, store) = store();
        let root = store.guard().root().to_path_buf();
        fs::create_dir(root.join("Dest")).unwrap();
        fs::write(root.join("one.txt"), b"1").unwrap();

        let outcome = store.move_many(
            &["one.txt".to_string(), "missing.txt".to_string()],
            "Dest",
        );
        assert_eq!(outcome.succeeded, vec!["Dest/one.txt".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].item, "missing.txt");
    }

    #[test]
    fn uploads_with_same_name_get_suffixes() {
        let (_temp, store) = store();
        let request = UploadRequest::new("", "a.txt");

        let first = store.save_upload(&mut Cursor::new(b"one"), &request).unwrap();
        let second = store.save_upload(&mut Cursor::new(b"two"), &request).unwrap();

        assert_eq!(first, "a.txt");
        assert_eq!(second, "a_1.txt");
        let root = store.guard().root();
        assert_eq!(fs::read(root.join("a.txt")).unwrap(), b"one");
        assert_eq!(fs::read(root.join("a_1.txt")).unwrap(), b"two");
    }

    #[test]
    fn interrupted_upload_leaves_nothing_behind() {
        let (_temp, store) = store();
        store.create_folder("", "Inbox").unwrap();
        let request = UploadRequest::new("Inbox", "big.bin");

        let result = store.save_upload(&mut BrokenStream { sent: false }, &request);
        assert!(result.is_err());
        assert!(!store.guard().root().join("Inbox/big.bin").exists());
        assert!(store.list("Inbox").unwrap().is_empty());
        assert_eq!(fs::read_dir(store.guard().root().join("Inbox")).unwrap().count(), 0);
    }

    #[test]
    fn folder_upload_rebuilds_tree() {
        let (_temp, store) = store();
        let request =
            UploadRequest::new("", "ignored.jpg").with_relative_path("Trip/day 1/beach.jpg");

        let stored = store.save_upload(&mut Cursor::new(b"sand"), &request).unwrap();
        assert_eq!(stored, "Trip/day_1/beach.jpg");
        assert_eq!(
            fs::read(store.guard().root().join("Trip/day_1/beach.jpg")).unwrap(),
            b"sand"
        );
    }

    #[test]
    fn upload_fails_without_free_space() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let guard = Arc::new(PathGuard::new(&root).unwrap());
        let store = FileStore::new(guard, Arc::new(StorageConfig::with_root(&root)));

        if store.disk_usage().is_none() {
            return;
        }
        let request = UploadRequest::new("", "huge.iso").with_expected_size(u64::MAX / 2);
        assert!(matches!(
            store.save_upload(&mut Cursor::new(b"x"), &request),
            Err(StorageError::InsufficientSpace { .. })
        ));
    }

    #[test]
    fn open_file_rejects_folders() {
        let (_temp, store) = store();
        store.create_folder("", "Docs").unwrap();
        assert!(matches!(store.open_file("Docs"), Err(StorageError::NotAFile(_))));
        assert!(matches!(
            store.open_file("missing.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn list_folders_skips_internal_directories() {
        let (_temp, store) = store();
        let root = store.guard().root().to_path_buf();
        fs::create_dir_all(root.join("A/B")).unwrap();
        fs::create_dir_all(root.join(TRASH_DIR_NAME)).unwrap();
        fs::create_dir_all(root.join(QUARANTINE_DIR_NAME).join("deadbeef")).unwrap();

        assert_eq!(
            store.list_folders().unwrap(),
            vec!["A".to_string(), "A/B".to_string()]
        );
    }

    #[test]
    fn list_hides_in_flight_uploads() {
        let (_temp, store) = store();
        let root = store.guard().root().to_path_buf();
        fs::write(root.join(".upload-1-0.tmp"), b"partial").unwrap();
        fs::write(root.join("done.txt"), b"done").unwrap();

        let listing = store.list("").unwrap();
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["done.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn broken_and_escaping_links_can_be_listed_and_renamed() {
        let (temp, store) = store();
        let root = store.guard().root().to_path_buf();
        std::os::unix::fs::symlink("/nonexistent/target", root.join("dangling")).unwrap();
        std::os::unix::fs::symlink(temp.path(), root.join("outside")).unwrap();

        let listing = store.list("").unwrap();
        let mut names: Vec<_> = listing
            .files
            .iter()
            .map(|f| f.name.as_str())
            .chain(listing.folders.iter().map(|f| f.name.as_str()))
            .collect();
        names.sort();
        assert_eq!(names, vec!["dangling", "outside"]);

        assert_eq!(store.rename("dangling", "fixed").unwrap(), "fixed");
        assert!(fs::symlink_metadata(root.join("fixed")).unwrap().is_symlink());

        store.create_folder("", "Links").unwrap();
        assert_eq!(store.move_item("outside", "Links").unwrap(), "Links/outside");
        assert!(fs::symlink_metadata(root.join("Links/outside")).unwrap().is_symlink());
        assert!(temp.path().join("root").is_dir());
    }
}
