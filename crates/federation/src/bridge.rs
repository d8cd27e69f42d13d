//! Delivery bridge: domain events → outgoing activities.
//!
//! Subscribes to the event bus and, for each qualifying event, mints a
//! fresh activity IRI, persists the JSON-LD to the object store, and
//! queues per-inbox deliveries.

use activitypub_federation::kinds::public;
use async_trait::async_trait;
use ghostpub_common::{ApUrls, AppResult};
use ghostpub_core::events::{DomainEvent, EventSubscriber};
use ghostpub_db::entities::{account, post};
use ghostpub_db::repositories::AccountRepository;
use ghostpub_db::SharedObjectStore;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::activities::ACTIVITYSTREAMS_CONTEXT;
use crate::objects::{build_create_doc, build_object_doc, build_tombstone_doc, ApActor};
use crate::sender::ActivitySender;

/// Bridges domain events to federation deliveries.
#[derive(Clone)]
pub struct DeliveryBridge {
    account_repo: AccountRepository,
    store: SharedObjectStore,
    sender: ActivitySender,
    urls: ApUrls,
}

impl DeliveryBridge {
    /// Create a new bridge.
    #[must_use]
    pub fn new(
        account_repo: AccountRepository,
        store: SharedObjectStore,
        sender: ActivitySender,
        urls: ApUrls,
    ) -> Self {
        Self {
            account_repo,
            store,
            sender,
            urls,
        }
    }

    async fn internal_account(&self, account_id: i64) -> AppResult<Option<account::Model>> {
        if !self.account_repo.is_internal(account_id).await? {
            return Ok(None);
        }
        self.account_repo.find_by_id(account_id).await
    }

    async fn on_post_created(&self, post: &post::Model) -> AppResult<()> {
        let Some(author) = self.internal_account(post.author_id).await? else {
            return Ok(());
        };

        let object = build_object_doc(post, &author, &self.urls)?;
        self.store.set(&post.ap_id, object.clone()).await?;

        let create_id = self.urls.new_object("create")?;
        let create = build_create_doc(&create_id, post, &author, object, &self.urls)?;
        self.store.set(create_id.as_str(), create.clone()).await?;

        let queued = self.sender.send_to_followers(&author, &create).await?;
        info!(post_id = post.id, queued, "Bridged post.created to Create");
        Ok(())
    }

    async fn on_post_deleted(&self, post: &post::Model) -> AppResult<()> {
        let Some(author) = self.internal_account(post.author_id).await? else {
            return Ok(());
        };

        // The stored object becomes its tombstone shell.
        self.store
            .set(&post.ap_id, build_tombstone_doc(post))
            .await?;

        let delete_id = self.urls.new_object("delete")?;
        let followers = self.urls.followers(&author.username)?;
        let delete = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": delete_id.as_str(),
            "type": "Delete",
            "actor": author.ap_id,
            "to": [followers.as_str(), public().to_string()],
            "object": { "id": post.ap_id, "type": "Tombstone" },
        });
        self.store.set(delete_id.as_str(), delete.clone()).await?;

        let queued = self.sender.send_to_followers(&author, &delete).await?;
        info!(post_id = post.id, queued, "Bridged post.deleted to Delete");
        Ok(())
    }

    async fn on_account_updated(&self, account: &account::Model) -> AppResult<()> {
        if !self.account_repo.is_internal(account.id).await? {
            return Ok(());
        }

        let actor = serde_json::to_value(ApActor::from_internal_account(account, &self.urls)?)
            .unwrap_or_default();
        self.store.set(&account.ap_id, actor.clone()).await?;

        let update_id = self.urls.new_object("update")?;
        let followers = self.urls.followers(&account.username)?;
        let update = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": update_id.as_str(),
            "type": "Update",
            "actor": account.ap_id,
            "to": [followers.as_str(), public().to_string()],
            "object": actor,
        });
        self.store.set(update_id.as_str(), update.clone()).await?;

        let queued = self.sender.send_to_followers(account, &update).await?;
        info!(account_id = account.id, queued, "Bridged account.updated to Update");
        Ok(())
    }

    async fn on_account_blocked(&self, blocker_id: i64, blocked_id: i64) -> AppResult<()> {
        let Some(blocker) = self.internal_account(blocker_id).await? else {
            return Ok(());
        };
        let Some(blocked) = self.account_repo.find_by_id(blocked_id).await? else {
            return Ok(());
        };
        if self.account_repo.is_internal(blocked.id).await? {
            return Ok(());
        }
        let Some(inbox) = blocked.ap_inbox.clone() else {
            warn!(account_id = blocked.id, "Blocked account has no inbox");
            return Ok(());
        };

        let reject_id = self.urls.new_object("reject")?;
        let reject = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": reject_id.as_str(),
            "type": "Reject",
            "actor": blocker.ap_id,
            "object": {
                "type": "Follow",
                "actor": blocked.ap_id,
                "object": blocker.ap_id,
            },
        });
        self.store.set(reject_id.as_str(), reject.clone()).await?;

        self.sender
            .send_to_inbox(blocker.id, &inbox, &reject)
            .await?;
        info!(
            blocker = blocker.id,
            blocked = blocked.id,
            "Bridged account.blocked to Reject"
        );
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for DeliveryBridge {
    async fn handle(&self, event: &DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::PostCreated { post } => self.on_post_created(post).await,
            DomainEvent::PostDeleted { post } => self.on_post_deleted(post).await,
            DomainEvent::AccountUpdated { account } => self.on_account_updated(account).await,
            DomainEvent::AccountBlocked {
                blocker_id,
                blocked_id,
            } => self.on_account_blocked(*blocker_id, *blocked_id).await,
            other => {
                debug!(event = other.kind(), "Bridge ignores event");
                Ok(())
            }
        }
    }
}
