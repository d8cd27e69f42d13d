//! Redis-backed implementation of the core `JobQueue` seam.
//!
//! The primary and retry topics are two apalis Redis storages whose
//! namespaces come from configuration, so a managed Pub/Sub deployment
//! and the self-hosted Redis queue share the same message shapes.

use apalis::prelude::*;
use apalis_redis::RedisStorage;
use async_trait::async_trait;
use ghostpub_common::{AppError, AppResult};
use ghostpub_core::ports::{DeliverRequest, JobQueue};
use serde_json::Value;
use tracing::debug;

use crate::jobs::{DeliverJob, InboxJob};

/// Job queue over apalis Redis storages.
#[derive(Clone)]
pub struct RedisJobQueue {
    deliver: RedisStorage<DeliverJob>,
    retry: RedisStorage<DeliverJob>,
    inbox: RedisStorage<InboxJob>,
}

impl RedisJobQueue {
    /// Create a queue over the three storages.
    #[must_use]
    pub const fn new(
        deliver: RedisStorage<DeliverJob>,
        retry: RedisStorage<DeliverJob>,
        inbox: RedisStorage<InboxJob>,
    ) -> Self {
        Self {
            deliver,
            retry,
            inbox,
        }
    }

    /// Enqueue a delivery on the retry topic.
    pub async fn enqueue_retry(&self, job: DeliverJob) -> AppResult<()> {
        debug!(
            inbox = %job.inbox,
            attempt = job.attempt,
            "Enqueueing delivery on retry topic"
        );
        let mut storage = self.retry.clone();
        storage
            .push(job)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue_deliver(&self, request: DeliverRequest) -> AppResult<()> {
        debug!(inbox = %request.inbox, "Enqueueing delivery");
        let mut storage = self.deliver.clone();
        storage
            .push(DeliverJob::from(request))
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }

    async fn enqueue_inbox(&self, activity: Value) -> AppResult<()> {
        let mut storage = self.inbox.clone();
        storage
            .push(InboxJob::new(activity))
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }
}
