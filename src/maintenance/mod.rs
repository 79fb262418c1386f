//! Storage maintenance
//!
//! Duplicate detection with quarantine copies, confirmed duplicate deletion
//! and extension-based sorting of loose root files. All three serialize on
//! one shared maintenance lock.

pub mod autosort;
pub mod duplicates;
pub mod results;

use std::sync::{Arc, Mutex};

/// Lock shared by every maintenance service
pub type MaintenanceLock = Arc<Mutex<()>>;

pub use autosort::AutoSorter;
pub use duplicates::DuplicateScanner;
pub use results::{DuplicateGroup, ScanReport};
