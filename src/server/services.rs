use log::info;
use std::sync::{Arc, Mutex};

use crate::config::StorageConfig;
use crate::error::StorageResult;
use crate::favorites::Favorites;
use crate::maintenance::{AutoSorter, DuplicateScanner};
use crate::storage::{FileStore, PathGuard};
use crate::trash::TrashManager;

/// Every storage service, sharing one canonical root.
///
/// This is what a request layer holds on to; each field is safe to call
/// from any thread.
pub struct Services {
    pub guard: Arc<PathGuard>,
    pub store: FileStore,
    pub trash: Arc<TrashManager>,
    pub duplicates: DuplicateScanner,
    pub sorter: AutoSorter,
    pub favorites: Favorites,
}

impl Services {
    pub fn new(config: Arc<StorageConfig>) -> StorageResult<Self> {
        let guard = Arc::new(PathGuard::new(config.storage_root_path())?);
        info!("Storage root: {}", guard.root().display());

        let maintenance_lock = Arc::new(Mutex::new(()));

        Ok(Self {
            store: FileStore::new(Arc::clone(&guard), Arc::clone(&config)),
            trash: Arc::new(TrashManager::new(Arc::clone(&guard))),
            duplicates: DuplicateScanner::new(
                Arc::clone(&guard),
                Arc::clone(&config),
                Arc::clone(&maintenance_lock),
            ),
            sorter: AutoSorter::new(Arc::clone(&guard), maintenance_lock),
            favorites: Favorites::new(Arc::clone(&guard), config.favorites_path()),
            guard,
        })
    }
}
