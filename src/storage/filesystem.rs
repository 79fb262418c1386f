//! File system operations
//!
//! Low-level helpers shared by the file store, trash and maintenance
//! services. Callers pass paths that already went through `PathGuard`.

use log::warn;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

/// Check whether anything (including a dangling symlink) occupies `path`
pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Move a file or directory tree, falling back to copy-then-delete when
/// source and destination live on different filesystems.
pub fn move_path(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            if let Err(copy_err) = copy_recursive(source, destination) {
                // Leave the source untouched and drop the partial copy
                let _ = remove_path(destination);
                return Err(copy_err);
            }
            remove_path(source)
        }
        Err(e) => Err(e),
    }
}

/// Copy a file, symlink or directory tree to `destination`
pub fn copy_recursive(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    fs::copy(source, target).map(|_| ())
}

/// Permanently delete a file, symlink or directory tree
pub fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Total size in bytes of every file under `path` (or of `path` itself)
pub fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cannot stat entry under {}: {}", path.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Seconds since the Unix epoch for `time`, zero if it predates the epoch
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current time as seconds since the Unix epoch
pub fn now_epoch() -> i64 {
    unix_seconds(SystemTime::now()) as i64
}

/// Split `name` into stem and extension (with its dot). Leading dots belong
/// to the stem, so `.profile` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(idx) => name.split_at(leading + idx),
        None => (name, ""),
    }
}

/// Find a free sibling of `directory/name`, inserting `suffix(n)` before the
/// extension for n = 1, 2, ... until nothing occupies the path.
pub fn first_free_name(
    directory: &Path,
    name: &str,
    keep_extension: bool,
    suffix: impl Fn(u32) -> String,
) -> PathBuf {
    let candidate = directory.join(name);
    if !exists(&candidate) {
        return candidate;
    }

    let (stem, ext) = if keep_extension {
        split_extension(name)
    } else {
        (name, "")
    };
    let mut counter = 1u32;
    loop {
        let candidate = directory.join(format!("{stem}{}{ext}", suffix(counter)));
        if !exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Replace `path` with `contents` by writing a sibling temp file, flushing it
/// to disk and renaming it into place. The old content stays intact if any
/// step fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let result = (|| {
        let mut file = owner_only_file(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(unix)]
fn owner_only_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn owner_only_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
