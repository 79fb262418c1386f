pub mod config;
pub mod error;
pub mod favorites;
pub mod maintenance;
pub mod server;
pub mod storage;
pub mod trash;
pub mod utils;

pub use error::{ErrorKind, StorageError, StorageResult};
pub use server::{Server, Services};
