//! Duplicate file detection
//!
//! Candidates are grouped by exact size first so only same-size files are
//! ever hashed. Large files get a cheap head+tail digest, and only those
//! whose partial digests collide are read in full.

use log::{error, info, warn};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, MutexGuard, PoisonError};
use walkdir::WalkDir;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::maintenance::MaintenanceLock;
use crate::maintenance::results::{DuplicateGroup, ScanReport};
use crate::storage::filesystem::{exists, remove_path, unix_seconds};
use crate::storage::{
    BulkFailure, BulkOutcome, FileEntry, PathGuard, QUARANTINE_DIR_NAME, is_internal_root_entry,
    is_upload_temp,
};

pub struct DuplicateScanner {
    guard: Arc<PathGuard>,
    config: Arc<StorageConfig>,
    lock: MaintenanceLock,
}

impl DuplicateScanner {
    pub fn new(guard: Arc<PathGuard>, config: Arc<StorageConfig>, lock: MaintenanceLock) -> Self {
        Self {
            guard,
            config,
            lock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.guard.root().join(QUARANTINE_DIR_NAME)
    }

    /// Find duplicate groups and copy their members into quarantine.
    ///
    /// The quarantine directory is wiped on every scan. Originals are never
    /// modified.
    pub fn scan(&self) -> StorageResult<ScanReport> {
        let _guard = self.lock();
        info!("Starting duplicate file scan");

        let (by_size, files_scanned) = self.group_by_size();
        let mut groups = Vec::new();
        for (size, paths) in by_size {
            if paths.len() < 2 {
                continue;
            }
            groups.extend(self.confirm_candidates(size, paths));
        }
        groups.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.hash.cmp(&b.hash)));

        let copy_errors = self.materialize(&groups)?;
        let report = ScanReport {
            groups,
            files_scanned,
            copy_errors,
        };
        info!(
            "Duplicate scan complete: {} files scanned, {} groups found",
            report.files_scanned,
            report.groups.len()
        );
        Ok(report)
    }

    /// Permanently delete confirmed duplicates, re-validating every path
    pub fn delete_files(&self, paths: &[String]) -> BulkOutcome<String> {
        let _guard = self.lock();
        let mut outcome = BulkOutcome::default();
        for path in paths {
            let result = self.delete_one(path).map(|()| path.clone());
            if result.is_ok() {
                info!("Deleted duplicate file: {}", path);
            }
            outcome.record("Delete duplicate", path, result);
        }
        outcome
    }

    fn delete_one(&self, path: &str) -> StorageResult<()> {
        let full_path = self.guard.resolve_entry(path)?;
        let metadata = fs::symlink_metadata(&full_path)
            .map_err(|_| StorageError::NotFound(format!("File not found: {path}")))?;
        if metadata.is_dir() {
            return Err(StorageError::NotAFile(path.to_string()));
        }
        fs::remove_file(&full_path).map_err(|e| StorageError::from_io(e, &full_path))
    }

    /// Walk the root (skipping trash and quarantine) and bucket files by size
    fn group_by_size(&self) -> (BTreeMap<u64, Vec<PathBuf>>, usize) {
        let mut by_size: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();
        let mut scanned = 0usize;

        let walker = WalkDir::new(self.guard.root())
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_internal_root_entry(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot access entry during scan: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file()
                || entry.file_name().to_str().is_some_and(is_upload_temp)
            {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) => {
                    scanned += 1;
                    by_size
                        .entry(metadata.len())
                        .or_default()
                        .push(entry.into_path());
                }
                Err(e) => warn!("Cannot stat {}: {}", entry.path().display(), e),
            }
        }

        (by_size, scanned)
    }

    fn is_large(&self, size: u64) -> bool {
        size >= self.config.large_file_threshold_bytes
            && size >= self.config.partial_hash_window_bytes.saturating_mul(2)
    }

    /// Hash same-size candidates and return the groups whose full digests match
    fn confirm_candidates(&self, size: u64, paths: Vec<PathBuf>) -> Vec<DuplicateGroup> {
        let large = self.is_large(size);
        let first_pass = self.bucket_by_digest(paths, |path| {
            if large {
                partial_hash(
                    path,
                    size,
                    self.config.partial_hash_window_bytes,
                    self.config.chunk_size,
                )
            } else {
                full_hash(path, self.config.chunk_size)
            }
        });

        let mut confirmed = Vec::new();
        for (digest, members) in first_pass {
            if members.len() < 2 {
                continue;
            }
            if !large {
                confirmed.push((digest, members));
                continue;
            }
            let full =
                self.bucket_by_digest(members, |path| full_hash(path, self.config.chunk_size));
            confirmed.extend(full.into_iter().filter(|(_, members)| members.len() >= 2));
        }

        confirmed
            .into_iter()
            .map(|(hash, members)| DuplicateGroup {
                hash,
                size,
                members: self.entries(members),
            })
            .collect()
    }

    fn bucket_by_digest(
        &self,
        paths: Vec<PathBuf>,
        digest: impl Fn(&Path) -> io::Result<String>,
    ) -> BTreeMap<String, Vec<PathBuf>> {
        let mut buckets: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in paths {
            match digest(&path) {
                Ok(hash) => buckets.entry(hash).or_default().push(path),
                Err(e) => warn!("Cannot hash {}: {}", path.display(), e),
            }
        }
        buckets
    }

    fn entries(&self, paths: Vec<PathBuf>) -> Vec<FileEntry> {
        let mut members: Vec<FileEntry> = paths
            .into_iter()
            .map(|path| {
                let metadata = fs::metadata(&path).ok();
                FileEntry {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    path: self.guard.relative(&path),
                    size: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
                    modified: metadata
                        .and_then(|m| m.modified().ok())
                        .map(unix_seconds)
                        .unwrap_or(0),
                }
            })
            .collect();
        members.sort_by(|a, b| a.path.cmp(&b.path));
        members
    }

    /// Recreate the quarantine directory and copy each group into it
    fn materialize(&self, groups: &[DuplicateGroup]) -> StorageResult<Vec<BulkFailure>> {
        let quarantine = self.quarantine_dir();
        if exists(&quarantine) {
            remove_path(&quarantine).map_err(|e| {
                error!("Cannot clear quarantine folder: {}", e);
                StorageError::from_io(e, &quarantine)
            })?;
        }

        let mut failures = Vec::new();
        if groups.is_empty() {
            return Ok(failures);
        }
        fs::create_dir_all(&quarantine).map_err(|e| StorageError::from_io(e, &quarantine))?;

        for group in groups {
            let group_dir = quarantine.join(group.folder_name());
            if let Err(e) = fs::create_dir_all(&group_dir) {
                let err = StorageError::from_io(e, &group_dir);
                warn!("Cannot create quarantine group {}: {}", group.folder_name(), err);
                failures.push(BulkFailure::new(group.folder_name(), &err));
                continue;
            }

            for (index, member) in group.members.iter().enumerate() {
                let source = self.guard.root().join(&member.path);
                let flattened = member.path.replace(['/', '\\'], "_");
                let target = group_dir.join(format!("{index}_{flattened}"));
                if let Err(e) = fs::copy(&source, &target) {
                    warn!("Cannot copy duplicate {}: {}", member.path, e);
                    let err = StorageError::from_io(e, &source);
                    failures.push(BulkFailure::new(&member.path, &err));
                }
            }
        }

        Ok(failures)
    }
}

fn feed<R: Read>(reader: &mut R, hasher: &mut Sha256, chunk_size: usize) -> io::Result<()> {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..read]);
    }
}

/// SHA-256 of the whole file, read in chunks
pub fn full_hash(path: &Path, chunk_size: usize) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    feed(&mut file, &mut hasher, chunk_size)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 over the first and last `window` bytes of a `size`-byte file
pub fn partial_hash(path: &Path, size: u64, window: u64, chunk_size: usize) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    feed(&mut (&mut file).take(window), &mut hasher, chunk_size)?;
    file.seek(SeekFrom::Start(size.saturating_sub(window)))?;
    feed(&mut (&mut file).take(window), &mut hasher, chunk_size)?;
    Ok(format!("{:x}", hasher.finalize()))
}
