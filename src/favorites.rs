//! Favourite folders
//!
//! A small JSON list of relative folder paths kept outside the storage root.
//! Entries that no longer point at a folder are dropped on load.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{StorageError, StorageResult};
use crate::storage::PathGuard;
use crate::storage::filesystem::write_atomic;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FavoritesFile {
    #[serde(default)]
    favorites: Vec<String>,
}

/// A favourite folder as shown in a sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoriteFolder {
    pub path: String,
    pub name: String,
}

pub struct Favorites {
    guard: Arc<PathGuard>,
    path: PathBuf,
    lock: Mutex<()>,
}

impl Favorites {
    pub fn new(guard: Arc<PathGuard>, path: impl Into<PathBuf>) -> Self {
        Self {
            guard,
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current favourites, pruning (and persisting the removal of) entries
    /// that are no longer existing folders
    pub fn load(&self) -> Vec<FavoriteFolder> {
        let _guard = self.lock();
        self.load_valid()
            .into_iter()
            .map(|path| {
                let name = path.rsplit('/').next().unwrap_or_default();
                let name = if name.is_empty() { "Home" } else { name }.to_string();
                FavoriteFolder { path, name }
            })
            .collect()
    }

    /// Add or remove `path`, returning whether it is now a favourite
    pub fn toggle(&self, path: &str) -> StorageResult<bool> {
        let full_path = self.guard.resolve(path)?;
        match fs::metadata(&full_path) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(StorageError::NotADirectory(path.to_string())),
            Err(e) => return Err(StorageError::from_io(e, &full_path)),
        }
        let relative = self.guard.relative(&full_path);

        let _guard = self.lock();
        let mut favorites = self.load_valid();
        let favorited = match favorites.iter().position(|f| *f == relative) {
            Some(index) => {
                favorites.remove(index);
                false
            }
            None => {
                favorites.push(relative.clone());
                true
            }
        };
        self.save(&favorites)?;

        info!(
            "Favourite {} {}",
            if favorited { "added:" } else { "removed:" },
            relative
        );
        Ok(favorited)
    }

    fn load_valid(&self) -> Vec<String> {
        let stored = read_file(&self.path).favorites;
        let valid: Vec<String> = stored
            .iter()
            .filter(|path| self.is_folder(path))
            .cloned()
            .collect();

        if valid.len() != stored.len() {
            warn!(
                "Dropping {} stale favourite(s)",
                stored.len() - valid.len()
            );
            if let Err(e) = self.save(&valid) {
                error!("Failed to persist pruned favourites: {}", e);
            }
        }
        valid
    }

    fn is_folder(&self, path: &str) -> bool {
        self.guard
            .resolve(path)
            .map(|full| full.is_dir())
            .unwrap_or(false)
    }

    fn save(&self, favorites: &[String]) -> StorageResult<()> {
        let file = FavoritesFile {
            favorites: favorites.to_vec(),
        };
        let contents = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &contents).map_err(|e| StorageError::from_io(e, &self.path))
    }
}

fn read_file(path: &Path) -> FavoritesFile {
    match fs::read(path) {
        Ok(contents) => serde_json::from_slice(&contents).unwrap_or_else(|e| {
            error!("Failed to parse favourites {}: {}", path.display(), e);
            FavoritesFile::default()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => FavoritesFile::default(),
        Err(e) => {
            error!("Failed to read favourites {}: {}", path.display(), e);
            FavoritesFile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn favorites() -> (TempDir, Favorites) {
        let temp = TempDir::new().unwrap();
        let guard = Arc::new(PathGuard::new(temp.path().join("root")).unwrap());
        let favorites = Favorites::new(guard, temp.path().join("favorites.json"));
        (temp, favorites)
    }

    #[test]
    fn toggle_adds_then_removes() {
        let (_temp, favorites) = favorites();
        fs::create_dir_all(favorites.guard.root().join("Photos/2024")).unwrap();

        assert!(favorites.toggle("Photos/2024").unwrap());
        assert_eq!(
            favorites.load(),
            vec![FavoriteFolder {
                path: "Photos/2024".into(),
                name: "2024".into()
            }]
        );
        assert!(!favorites.toggle("Photos/2024/").unwrap());
        assert!(favorites.load().is_empty());
    }

    #[test]
    fn root_is_named_home() {
        let (_temp, favorites) = favorites();
        assert!(favorites.toggle("").unwrap());
        assert_eq!(favorites.load()[0].name, "Home");
    }

    #[test]
    fn toggle_rejects_files_and_missing() {
        let (_temp, favorites) = favorites();
        fs::write(favorites.guard.root().join("a.txt"), b"a").unwrap();

        assert!(matches!(
            favorites.toggle("a.txt"),
            Err(StorageError::NotADirectory(_))
        ));
        assert!(matches!(
            favorites.toggle("missing"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            favorites.toggle("../outside"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn load_prunes_deleted_folders() {
        let (_temp, favorites) = favorites();
        fs::create_dir(favorites.guard.root().join("Old")).unwrap();
        fs::create_dir(favorites.guard.root().join("Kept")).unwrap();
        favorites.toggle("Old").unwrap();
        favorites.toggle("Kept").unwrap();
        fs::remove_dir(favorites.guard.root().join("Old")).unwrap();

        let loaded = favorites.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path, "Kept");

        let on_disk: FavoritesFile =
            serde_json::from_slice(&fs::read(&favorites.path).unwrap()).unwrap();
        assert_eq!(on_disk.favorites, vec!["Kept".to_string()]);
    }
}
