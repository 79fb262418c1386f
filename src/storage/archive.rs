//! Folder export
//!
//! Streams a folder's files into a deflate-compressed ZIP archive with entry
//! names relative to the folder.

use log::{info, warn};
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::{StorageError, StorageResult};
use crate::storage::results::ArchiveSummary;
use crate::storage::validation::PathGuard;
use crate::storage::{is_internal_root_entry, is_upload_temp};

const COMPRESSION_LEVEL: i32 = 6;

/// Write the contents of folder `path` as a ZIP archive into `sink`.
///
/// Fails with `TooLarge` before writing anything when the uncompressed
/// content exceeds `max_bytes`. Files that cannot be opened are skipped.
pub fn export_folder<W: Write + Seek>(
    guard: &PathGuard,
    path: &str,
    max_bytes: u64,
    sink: W,
) -> StorageResult<ArchiveSummary> {
    let folder = guard.resolve(path)?;
    let metadata = fs::metadata(&folder).map_err(|e| StorageError::from_io(e, &folder))?;
    if !metadata.is_dir() {
        return Err(StorageError::NotADirectory(path.to_string()));
    }
    let mut summary = ArchiveSummary::default();

    let at_root = folder == guard.root();
    let files = collect_files(&folder, at_root, &mut summary);
    let total: u64 = files.iter().map(|(_, size)| size).sum();
    if total > max_bytes {
        return Err(StorageError::TooLarge {
            size: total,
            limit: max_bytes,
        });
    }

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));
    let mut zip = zip::ZipWriter::new(sink);

    for (path_in_folder, _) in &files {
        let name = entry_name(&folder, path_in_folder);
        let mut file = match File::open(path_in_folder) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to add {} to ZIP: {}", path_in_folder.display(), e);
                summary.skipped += 1;
                continue;
            }
        };

        zip.start_file(name, options)?;
        summary.uncompressed_bytes += io::copy(&mut file, &mut zip)?;
        summary.entries += 1;
    }

    zip.finish()?;
    info!(
        "Created ZIP for folder {} ({} entries, {} bytes uncompressed)",
        path, summary.entries, summary.uncompressed_bytes
    );
    Ok(summary)
}

/// Regular files under `folder` with their sizes, in name order. In-flight
/// uploads are never included, nor the trash and quarantine at the root.
fn collect_files(
    folder: &Path,
    at_root: bool,
    summary: &mut ArchiveSummary,
) -> Vec<(PathBuf, u64)> {
    let mut files = Vec::new();
    let walker = WalkDir::new(folder)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(at_root && is_internal_root_entry(entry)));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                summary.skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name().to_str().is_some_and(is_upload_temp)
        {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => files.push((entry.into_path(), metadata.len())),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                summary.skipped += 1;
            }
        }
    }
    files
}

fn entry_name(folder: &Path, file: &Path) -> String {
    file.strip_prefix(folder)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
