//! Error handling
//!
//! Defines the storage error taxonomy and its logging helpers.

pub mod handlers;
pub mod types;

pub use handlers::report_error;
pub use types::*;
