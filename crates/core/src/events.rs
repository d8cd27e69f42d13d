//! Domain events and the in-process event bus.
//!
//! Publishing awaits every subscriber before returning, so a `save()` call
//! only completes once its side effects (feed fan-out, delivery) have run.
//! That is also what guarantees a `post.created` is observed before any
//! later `post.deleted` for the same post.
//!
//! The same shapes serialize to the queue for cross-process fan-out; the
//! `kind` tag is the registry key.

use async_trait::async_trait;
use ghostpub_db::entities::{account, post};
use ghostpub_common::AppResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// How a set of feeds changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedChange {
    PostAdded,
    PostRemoved,
}

/// A domain event. The `kind` tag is the cross-process registry key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DomainEvent {
    #[serde(rename = "post.created")]
    PostCreated {
        post: post::Model,
    },
    #[serde(rename = "post.deleted")]
    PostDeleted {
        post: post::Model,
    },
    #[serde(rename = "post.liked")]
    PostLiked {
        post: post::Model,
        account_id: i64,
    },
    #[serde(rename = "post.reposted")]
    PostReposted {
        post: post::Model,
        reposted_by: i64,
    },
    #[serde(rename = "post.dereposted")]
    PostDereposted {
        post: post::Model,
        dereposted_by: i64,
    },
    #[serde(rename = "account.followed")]
    AccountFollowed {
        follower_id: i64,
        following_id: i64,
    },
    #[serde(rename = "account.unfollowed")]
    AccountUnfollowed {
        follower_id: i64,
        following_id: i64,
    },
    #[serde(rename = "account.updated")]
    AccountUpdated {
        account: account::Model,
    },
    #[serde(rename = "account.blocked")]
    AccountBlocked {
        blocker_id: i64,
        blocked_id: i64,
    },
    #[serde(rename = "feeds.updated")]
    FeedsUpdated {
        user_ids: Vec<i64>,
        change: FeedChange,
        post_id: i64,
    },
}

impl DomainEvent {
    /// The registry key for this event shape.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PostCreated { .. } => "post.created",
            Self::PostDeleted { .. } => "post.deleted",
            Self::PostLiked { .. } => "post.liked",
            Self::PostReposted { .. } => "post.reposted",
            Self::PostDereposted { .. } => "post.dereposted",
            Self::AccountFollowed { .. } => "account.followed",
            Self::AccountUnfollowed { .. } => "account.unfollowed",
            Self::AccountUpdated { .. } => "account.updated",
            Self::AccountBlocked { .. } => "account.blocked",
            Self::FeedsUpdated { .. } => "feeds.updated",
        }
    }
}

/// A subscriber to domain events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle one event. Errors are logged by the bus and do not stop
    /// delivery to other subscribers.
    async fn handle(&self, event: &DomainEvent) -> AppResult<()>;
}

/// In-process event bus with awaited delivery.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    pub async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().await.push(subscriber);
    }

    /// Publish an event, awaiting every subscriber in registration order.
    pub async fn publish(&self, event: &DomainEvent) {
        let subscribers = self.subscribers.read().await;
        for subscriber in subscribers.iter() {
            if let Err(e) = subscriber.handle(event).await {
                tracing::error!(
                    event = event.kind(),
                    error = %e,
                    "Event subscriber failed"
                );
            }
        }
    }
}

/// Shared handle to the bus.
pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ghostpub_db::test_utils::post_fixture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    #[async_trait]
    impl EventSubscriber for Counter {
        async fn handle(&self, _event: &DomainEvent) -> AppResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventSubscriber for Failing {
        async fn handle(&self, _event: &DomainEvent) -> AppResult<()> {
            Err(ghostpub_common::AppError::Internal("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_publish_awaits_all_subscribers() {
        let bus = EventBus::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bus.subscribe(counter.clone()).await;
        bus.subscribe(Arc::new(Failing)).await;

        let event = DomainEvent::PostCreated {
            post: post_fixture(1, "https://site.example/note/1", 1),
        };
        bus.publish(&event).await;
        bus.publish(&event).await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_event_kind_registry() {
        let post = post_fixture(1, "https://site.example/note/1", 1);
        assert_eq!(
            DomainEvent::PostCreated { post: post.clone() }.kind(),
            "post.created"
        );
        assert_eq!(
            DomainEvent::PostDeleted { post }.kind(),
            "post.deleted"
        );
    }

    #[test]
    fn test_event_round_trips_through_serde() {
        let post = post_fixture(1, "https://site.example/note/1", 1);
        let event = DomainEvent::PostReposted {
            post,
            reposted_by: 9,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"post.reposted\""));

        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        match back {
            DomainEvent::PostReposted { reposted_by, .. } => assert_eq!(reposted_by, 9),
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
