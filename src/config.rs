//! Configuration management for HomeDrive core
//!
//! Values are layered: built-in defaults, then an optional `config.toml`
//! in the working directory, then `HOMEDRIVE_*` environment variables.
//! Everything here is fixed at startup; the storage root is never relocated
//! while the process runs.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::thumbnail::THUMBNAIL_SIZE_RANGE;

const MIB: u64 = 1024 * 1024;

/// Complete storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    // ═══ LOCATIONS (Environment Override Supported) ═══
    /// Root directory all operations are confined to
    /// Environment: HOMEDRIVE_STORAGE_ROOT
    pub storage_root: String,

    /// File holding the favourite folders list
    /// Environment: HOMEDRIVE_FAVORITES_FILE
    pub favorites_file: String,

    // ═══ LIMITS ═══
    /// Longest accepted file or folder name
    pub max_filename_length: usize,

    /// Chunk size for uploads, hashing and copies
    pub chunk_size: usize,

    /// Free space that must remain on the volume after an upload
    pub min_free_space_bytes: u64,

    /// Largest uncompressed folder eligible for ZIP export
    pub max_archive_size_bytes: u64,

    /// Depth limit for the folder picker listing
    pub folder_listing_max_depth: usize,

    // ═══ THUMBNAILS ═══
    /// Edge length of a thumbnail when the caller asks for none or an
    /// out-of-range size
    pub thumbnail_size: u32,

    /// Images larger than this are never decoded for a thumbnail
    pub thumbnail_max_source_bytes: u64,

    // ═══ DUPLICATE SCAN ═══
    /// Files at or above this size are partially hashed first
    pub large_file_threshold_bytes: u64,

    /// Size of the head and tail windows used for partial hashes
    pub partial_hash_window_bytes: u64,

    // ═══ TRASH ═══
    /// Age after which trashed items are purged automatically
    pub trash_max_age_days: u64,

    /// Cadence of the background trash cleanup
    pub trash_cleanup_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_root: "./homedrive_storage".to_string(),
            favorites_file: "./homedrive.favorites.json".to_string(),
            max_filename_length: 255,
            chunk_size: 64 * 1024,
            min_free_space_bytes: 100 * MIB,
            max_archive_size_bytes: 2048 * MIB,
            folder_listing_max_depth: 5,
            thumbnail_size: 200,
            thumbnail_max_source_bytes: 50 * MIB,
            large_file_threshold_bytes: 100 * MIB,
            partial_hash_window_bytes: MIB,
            trash_max_age_days: 30,
            trash_cleanup_interval_secs: 24 * 60 * 60,
        }
    }
}

impl StorageConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("storage_root", defaults.storage_root)?
            .set_default("favorites_file", defaults.favorites_file)?
            .set_default("max_filename_length", defaults.max_filename_length as u64)?
            .set_default("chunk_size", defaults.chunk_size as u64)?
            .set_default("min_free_space_bytes", defaults.min_free_space_bytes)?
            .set_default("max_archive_size_bytes", defaults.max_archive_size_bytes)?
            .set_default(
                "folder_listing_max_depth",
                defaults.folder_listing_max_depth as u64,
            )?
            .set_default("thumbnail_size", defaults.thumbnail_size as u64)?
            .set_default(
                "thumbnail_max_source_bytes",
                defaults.thumbnail_max_source_bytes,
            )?
            .set_default(
                "large_file_threshold_bytes",
                defaults.large_file_threshold_bytes,
            )?
            .set_default(
                "partial_hash_window_bytes",
                defaults.partial_hash_window_bytes,
            )?
            .set_default("trash_max_age_days", defaults.trash_max_age_days)?
            .set_default(
                "trash_cleanup_interval_secs",
                defaults.trash_cleanup_interval_secs,
            )?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("HOMEDRIVE")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?;

        let config: StorageConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults around an explicit storage root
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            storage_root: root.to_string_lossy().to_string(),
            favorites_file: root
                .with_file_name(".homedrive.favorites.json")
                .to_string_lossy()
                .to_string(),
            ..Self::default()
        }
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.storage_root.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "storage_root cannot be empty".into(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "chunk_size must be greater than 0".into(),
            ));
        }

        if self.max_filename_length == 0 {
            return Err(config::ConfigError::Message(
                "max_filename_length must be greater than 0".into(),
            ));
        }

        if !THUMBNAIL_SIZE_RANGE.contains(&self.thumbnail_size) {
            return Err(config::ConfigError::Message(
                "thumbnail_size must be between 50 and 500".into(),
            ));
        }

        if self.trash_cleanup_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "trash_cleanup_interval_secs must be greater than 0".into(),
            ));
        }

        if self.partial_hash_window_bytes.saturating_mul(2) > self.large_file_threshold_bytes {
            return Err(config::ConfigError::Message(
                "partial_hash_window_bytes must be at most half of large_file_threshold_bytes"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Get storage root as PathBuf
    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    /// Get favourites file as PathBuf
    pub fn favorites_path(&self) -> PathBuf {
        PathBuf::from(&self.favorites_file)
    }

    /// Get the trash expiry age as Duration
    pub fn trash_max_age(&self) -> Duration {
        Duration::from_secs(self.trash_max_age_days.saturating_mul(24 * 60 * 60))
    }

    /// Get the background cleanup cadence as Duration
    pub fn trash_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.trash_cleanup_interval_secs)
    }
}
