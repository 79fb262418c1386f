use log::{error, info};
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::StorageResult;
use crate::server::scheduler::spawn_trash_cleanup;
use crate::server::services::Services;

/// Owns the services and the background maintenance for the process lifetime
pub struct Server {
    services: Arc<Services>,
    config: Arc<StorageConfig>,
}

impl Server {
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let config = Arc::new(config);
        let services = Arc::new(Services::new(Arc::clone(&config))?);
        Ok(Self { services, config })
    }

    pub fn services(&self) -> Arc<Services> {
        Arc::clone(&self.services)
    }

    /// Start background maintenance and wait for Ctrl-C
    pub async fn start(&self) {
        info!(
            "Starting HomeDrive storage core at {}",
            self.services.guard.root().display()
        );

        let cleanup = spawn_trash_cleanup(
            Arc::clone(&self.services.trash),
            self.config.trash_cleanup_interval(),
            self.config.trash_max_age(),
        );

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }

        info!("Shutting down");
        cleanup.abort();
    }
}
