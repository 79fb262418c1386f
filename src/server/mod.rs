//! Service wiring
//!
//! Builds every storage service around one `PathGuard` and runs the
//! background trash expiry alongside them.

pub mod core;
pub mod scheduler;
pub mod services;

pub use core::Server;
pub use scheduler::spawn_trash_cleanup;
pub use services::Services;
