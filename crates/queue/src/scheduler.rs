//! Periodic scheduling for the interaction-counts refresher.

use futures::stream::{self, StreamExt};
use ghostpub_core::services::{CountsRefresher, RefreshSummary};
use ghostpub_db::repositories::PostRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the refresh sweep runs.
    pub counts_refresh_interval: Duration,
    /// How many recent posts each sweep considers.
    pub batch_size: u64,
    /// Maximum concurrent remote fetches during a sweep.
    pub max_concurrency: usize,
    /// Delay applied before each fetch (token-bucket style pacing).
    pub per_request_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            counts_refresh_interval: Duration::from_secs(300),
            batch_size: 200,
            max_concurrency: 4,
            per_request_delay: Duration::from_millis(100),
        }
    }
}

/// One sweep of the counts refresher over recent posts.
#[derive(Clone)]
pub struct CountsRefreshJob {
    post_repo: PostRepository,
    refresher: CountsRefresher,
    config: SchedulerConfig,
}

impl CountsRefreshJob {
    /// Create a new refresh job.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        refresher: CountsRefresher,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            post_repo,
            refresher,
            config,
        }
    }

    /// Run one sweep.
    pub async fn run(&self) -> RefreshSummary {
        let post_ids = match self.post_repo.recent_post_ids(self.config.batch_size).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Counts sweep could not list candidates");
                return RefreshSummary::default();
            }
        };

        let delay = self.config.per_request_delay;
        let results: Vec<Result<bool, _>> = stream::iter(post_ids)
            .map(|post_id| {
                let refresher = self.refresher.clone();
                async move {
                    tokio::time::sleep(delay).await;
                    refresher.refresh_post(post_id).await
                }
            })
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut summary = RefreshSummary::default();
        for result in results {
            match result {
                Ok(true) => summary.refreshed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!(error = %e, "Counts refresh failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Run the scheduler until the process shuts down.
pub async fn run_scheduler(job: Arc<CountsRefreshJob>) {
    let mut ticker = interval(job.config.counts_refresh_interval);
    loop {
        ticker.tick().await;
        let summary = job.run().await;
        info!(
            refreshed = summary.refreshed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Counts refresh sweep complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.counts_refresh_interval, Duration::from_secs(300));
        assert!(config.max_concurrency >= 1);
    }
}
