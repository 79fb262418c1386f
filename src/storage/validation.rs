//! Path validation
//!
//! Every user-supplied path passes through [`PathGuard`] before any
//! filesystem call. Resolution follows symlinks, collapses `.` and `..`, and
//! fails with `InvalidPath` as soon as the walk leaves the canonical root.

use log::warn;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{StorageError, StorageResult};
use crate::storage::TRASH_DIR_NAME;

/// Resolves relative paths against the fixed storage root
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Create the root if missing and pin its canonical form
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| StorageError::from_io(e, root))?;
        let root = fs::canonicalize(root).map_err(|e| StorageError::from_io(e, root))?;
        Ok(Self { root })
    }

    /// Canonical storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical trash directory
    pub fn trash_dir(&self) -> PathBuf {
        self.root.join(TRASH_DIR_NAME)
    }

    /// Resolve a user path to an absolute path inside the root.
    ///
    /// Empty input is the root itself. Components that do not exist yet are
    /// appended lexically so targets of create and upload operations can be
    /// resolved too. Anything inside the trash directory is refused.
    pub fn resolve(&self, relative: &str) -> StorageResult<PathBuf> {
        let resolved = self.resolve_within_root(relative)?;
        if self.is_reserved(&resolved) {
            warn!("Access to reserved trash path refused: {}", relative);
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(resolved)
    }

    /// Resolve a path naming an object to act on (rename, move, trash).
    ///
    /// Only the parent is resolved; the final component is joined as-is so
    /// a symlink is operated on itself rather than on its target, even when
    /// that target is missing or outside the root.
    pub fn resolve_entry(&self, relative: &str) -> StorageResult<PathBuf> {
        let path = Path::new(relative);
        let Some(Component::Normal(name)) = path.components().next_back() else {
            return self.resolve(relative);
        };
        let parent = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let entry = self.resolve(&parent)?.join(name);
        if self.is_reserved(&entry) {
            warn!("Access to reserved trash path refused: {}", relative);
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(entry)
    }

    /// Relative form of a path under the root, `/`-separated
    pub fn relative(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    fn is_reserved(&self, path: &Path) -> bool {
        path.starts_with(self.trash_dir())
    }

    fn reject(&self, relative: &str) -> StorageError {
        warn!("Path traversal attempt detected: {}", relative);
        StorageError::InvalidPath(relative.to_string())
    }

    fn resolve_within_root(&self, relative: &str) -> StorageResult<PathBuf> {
        if relative.contains('\0') {
            return Err(StorageError::InvalidPath("Path contains a NUL byte".into()));
        }
        if relative.is_empty() {
            return Ok(self.root.clone());
        }

        let mut current = self.root.clone();
        // Number of trailing components that do not exist on disk
        let mut missing = 0usize;

        for component in Path::new(relative).components() {
            match component {
                Component::CurDir => continue,
                Component::Normal(part) => {
                    current.push(part);
                    if missing > 0 {
                        missing += 1;
                    } else {
                        match fs::symlink_metadata(&current) {
                            Ok(_) => {
                                current = fs::canonicalize(&current)
                                    .map_err(|_| self.reject(relative))?;
                            }
                            Err(e) if e.kind() == io::ErrorKind::NotFound => missing = 1,
                            Err(_) => return Err(self.reject(relative)),
                        }
                    }
                }
                Component::ParentDir => {
                    current.pop();
                    missing = missing.saturating_sub(1);
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(self.reject(relative));
                }
            }

            if !current.starts_with(&self.root) {
                return Err(self.reject(relative));
            }
        }

        Ok(current)
    }
}

/// Reduce a user-supplied name to a filesystem-safe token.
///
/// Separators and whitespace become `_`, anything that is not alphanumeric,
/// `_`, `.` or `-` is dropped, and leading/trailing dots and underscores are
/// stripped. Returns `None` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Sanitize `name` and enforce the configured length limit
pub fn validate_name(name: &str, max_length: usize) -> StorageResult<String> {
    let name = sanitize_filename(name)
        .ok_or_else(|| StorageError::InvalidPath(format!("Invalid name: {name:?}")))?;
    if name.len() > max_length {
        return Err(StorageError::InvalidPath(format!(
            "Name too long (max {max_length} characters)"
        )));
    }
    Ok(name)
}
