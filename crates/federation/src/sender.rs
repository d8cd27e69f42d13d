//! Fan-out of outgoing activities to recipient inboxes.

use ghostpub_common::AppResult;
use ghostpub_core::ports::{DeliverRequest, SharedJobQueue};
use ghostpub_db::entities::account;
use ghostpub_db::repositories::FollowRepository;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

/// Follower fan-out is bounded; a single-tenant site does not exceed this.
const FOLLOWER_RECIPIENT_LIMIT: u64 = 10_000;

/// Enqueues signed deliveries, one message per inbox.
#[derive(Clone)]
pub struct ActivitySender {
    follow_repo: FollowRepository,
    queue: SharedJobQueue,
}

impl ActivitySender {
    /// Create a new sender.
    #[must_use]
    pub fn new(follow_repo: FollowRepository, queue: SharedJobQueue) -> Self {
        Self { follow_repo, queue }
    }

    /// Deliver an activity to every follower of `sender`, preferring
    /// shared inboxes and deduplicating them.
    pub async fn send_to_followers(
        &self,
        sender: &account::Model,
        activity: &Value,
    ) -> AppResult<usize> {
        let followers = self
            .follow_repo
            .follower_accounts(sender.id, FOLLOWER_RECIPIENT_LIMIT)
            .await?;

        let mut inboxes = HashSet::new();
        for follower in &followers {
            let inbox = follower
                .ap_shared_inbox
                .as_ref()
                .or(follower.ap_inbox.as_ref());
            if let Some(inbox) = inbox {
                inboxes.insert(inbox.clone());
            } else {
                debug!(account_id = follower.id, "Follower has no inbox");
            }
        }

        for inbox in &inboxes {
            self.queue
                .enqueue_deliver(DeliverRequest {
                    account_id: sender.id,
                    inbox: inbox.clone(),
                    activity: activity.clone(),
                })
                .await?;
        }

        info!(
            sender = sender.id,
            followers = followers.len(),
            inboxes = inboxes.len(),
            activity_type = activity.get("type").and_then(|v| v.as_str()).unwrap_or("?"),
            "Queued activity for delivery"
        );

        Ok(inboxes.len())
    }

    /// Deliver an activity to one inbox.
    pub async fn send_to_inbox(
        &self,
        sender_account_id: i64,
        inbox: &str,
        activity: &Value,
    ) -> AppResult<()> {
        self.queue
            .enqueue_deliver(DeliverRequest {
                account_id: sender_account_id,
                inbox: inbox.to_string(),
                activity: activity.clone(),
            })
            .await
    }
}
