//! Background trash expiry

use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::trash::TrashManager;

/// Run `cleanup_expired(max_age)` immediately and then every `every`.
///
/// Failures are logged and never end the loop. The blocking filesystem work
/// runs on tokio's blocking pool.
pub fn spawn_trash_cleanup(
    trash: Arc<TrashManager>,
    every: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Trash cleanup scheduled every {}s (max age {} days)",
            every.as_secs(),
            max_age.as_secs() / 86_400
        );
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let trash = Arc::clone(&trash);
            match tokio::task::spawn_blocking(move || trash.cleanup_expired(max_age)).await {
                Ok(Ok(report)) => {
                    for failure in &report.errors {
                        warn!("Could not expire {}: {}", failure.item, failure.reason);
                    }
                }
                Ok(Err(e)) => error!("Trash cleanup failed: {}", e),
                Err(e) => error!("Trash cleanup task aborted: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PathGuard;
    use crate::trash::TrashManifest;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn first_run_happens_immediately() {
        let temp = TempDir::new().unwrap();
        let guard = Arc::new(PathGuard::new(temp.path().join("root")).unwrap());
        let trash = Arc::new(TrashManager::new(Arc::clone(&guard)));

        fs::write(guard.root().join("old.txt"), b"o").unwrap();
        trash.move_to_trash("old.txt").unwrap();
        let manifest_path = trash.manifest_path();
        let mut manifest = TrashManifest::load(&manifest_path);
        manifest.items[0].deletion_time -= 40 * 86_400;
        manifest.save(&manifest_path).unwrap();

        let handle = spawn_trash_cleanup(
            Arc::clone(&trash),
            Duration::from_secs(3600),
            Duration::from_secs(30 * 86_400),
        );

        let mut remaining = trash.info().count;
        for _ in 0..100 {
            if remaining == 0 {
                break;
            }
            time::sleep(Duration::from_millis(20)).await;
            remaining = trash.info().count;
        }
        handle.abort();
        assert_eq!(remaining, 0);
    }
}
