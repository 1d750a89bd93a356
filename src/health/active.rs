//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe the upstream dependency
//! - Update its reachability state from probe results

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::upstream::client::SyncClient;

pub struct HealthMonitor {
    client: Arc<SyncClient>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(client: Arc<SyncClient>, config: HealthCheckConfig) -> Self {
        Self { client, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn sweep(&self) {
        let dependency = self.client.dependency();
        let reachable = self.client.probe().await;

        if reachable {
            dependency.mark_success(self.config.healthy_threshold);
        } else {
            dependency.mark_failure(self.config.unhealthy_threshold);
        }

        metrics::record_dependency_health(dependency.name(), dependency.is_up());
    }
}
