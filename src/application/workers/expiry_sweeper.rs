//! ExpirySweeper - periodic driver for the expiry sweep.
//!
//! Access already ends when the validity window closes (effectiveness is
//! derived), so the sweep interval only bounds how long the ledger status
//! and platform roles lag behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::handlers::ExpireSweepHandler;
use crate::domain::foundation::Timestamp;

#[derive(Debug, Clone)]
pub struct ExpirySweeperConfig {
    pub sweep_interval: Duration,

    /// Upper bound on grants expired per sweep.
    pub batch_limit: u32,
}

impl Default for ExpirySweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            batch_limit: 200,
        }
    }
}

/// Background expiry worker.
pub struct ExpirySweeper {
    handler: Arc<ExpireSweepHandler>,
    config: ExpirySweeperConfig,
}

impl ExpirySweeper {
    pub fn new(handler: Arc<ExpireSweepHandler>, config: ExpirySweeperConfig) -> Self {
        Self { handler, config }
    }

    /// Runs the sweep loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => {
                    // A full batch means more work is waiting; keep sweeping
                    // within the same tick until the backlog drains.
                    loop {
                        match self
                            .handler
                            .sweep(Timestamp::now(), self.config.batch_limit)
                            .await
                        {
                            Ok(count) => {
                                if count > 0 {
                                    tracing::debug!(count, "expired grants");
                                }
                                if count < self.config.batch_limit {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "expiry sweep failed");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAuditLog, InMemoryGrantRepository, InMemorySyncQueue};
    use crate::domain::entitlement::{EntitlementGrant, GrantSource, GrantStatus};
    use crate::domain::foundation::{GroupId, SubjectId, TierId};
    use crate::ports::GrantRepository as _;

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let grants = Arc::new(InMemoryGrantRepository::new());
        let grant = EntitlementGrant::new(
            SubjectId::new("100000000000000001").unwrap(),
            TierId::new(),
            GroupId::new("812345678901234567").unwrap(),
            GrantStatus::Active,
            Timestamp::now().add_days(-30),
            Some(Timestamp::now().add_secs(-60)),
            GrantSource::Manual,
            None,
        )
        .unwrap();
        grants.save(&grant).await.unwrap();

        let handler = Arc::new(ExpireSweepHandler::new(
            grants.clone(),
            Arc::new(InMemorySyncQueue::new()),
            Arc::new(InMemoryAuditLog::new()),
        ));
        let sweeper = ExpirySweeper::new(
            handler,
            ExpirySweeperConfig {
                sweep_interval: Duration::from_millis(5),
                batch_limit: 10,
            },
        );

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(async move { sweeper.run(rx).await });

        // Let at least one tick land, then stop.
        time::sleep(Duration::from_millis(25)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(grants.all().await[0].status, GrantStatus::Expired);
    }
}
