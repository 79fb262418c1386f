//! HomeDrive storage core - Entry Point
//!
//! Loads configuration, builds the storage services and keeps the
//! background trash expiry running until interrupted.

use log::{error, info};
use std::process;

use homedrive_core::config::StorageConfig;
use homedrive_core::server::Server;
use homedrive_core::utils::logging::setup_logging;

#[tokio::main]
async fn main() {
    setup_logging();

    let config = match StorageConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    info!("Launching storage core...");

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!("Storage startup failed: {}", e);
            process::exit(1);
        }
    };
    server.start().await;
}
