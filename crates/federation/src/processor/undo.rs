//! Undo activity processor.

use ghostpub_common::AppResult;
use ghostpub_core::services::{AccountService, PostService};
use ghostpub_db::repositories::AccountRepository;
use ghostpub_db::SharedObjectStore;
use serde_json::Value;
use tracing::info;
use url::Url;

use super::drop_or_retry;
use crate::activities::UndoActivity;

/// Processor for Undo activities.
#[derive(Clone)]
pub struct UndoProcessor {
    accounts: AccountService,
    posts: PostService,
    account_repo: AccountRepository,
    store: SharedObjectStore,
}

impl UndoProcessor {
    /// Create a new undo processor.
    #[must_use]
    pub fn new(
        accounts: AccountService,
        posts: PostService,
        account_repo: AccountRepository,
        store: SharedObjectStore,
    ) -> Self {
        Self {
            accounts,
            posts,
            account_repo,
            store,
        }
    }

    /// Process an incoming Undo of a Follow or Announce. Other targets
    /// are logged and ignored.
    pub async fn process(&self, activity: &UndoActivity) -> AppResult<()> {
        let inner = self.resolve_inner(activity).await?;
        let Some(inner) = inner else {
            info!(id = %activity.id, "Undo target unavailable");
            return Ok(());
        };

        let inner_type = inner.get("type").and_then(Value::as_str).unwrap_or("");

        match inner_type {
            "Follow" => self.undo_follow(activity, &inner).await?,
            "Announce" => self.undo_announce(activity, &inner).await?,
            other => {
                info!(id = %activity.id, inner_type = %other, "Ignoring Undo target");
            }
        }

        self.store
            .set(
                activity.id.as_str(),
                serde_json::to_value(activity).unwrap_or_default(),
            )
            .await?;

        Ok(())
    }

    /// The undone activity: embedded, or recalled from the object store
    /// where the original was persisted at receipt time.
    async fn resolve_inner(&self, activity: &UndoActivity) -> AppResult<Option<Value>> {
        if let Some(embedded) = activity.object.embedded() {
            return Ok(Some(embedded.clone()));
        }
        let Some(id) = activity.object.id() else {
            return Ok(None);
        };
        self.store.get(id.as_str()).await
    }

    async fn undo_follow(&self, activity: &UndoActivity, follow: &Value) -> AppResult<()> {
        let Some(followee_iri) = follow
            .get("object")
            .and_then(Value::as_str)
            .and_then(|s| Url::parse(s).ok())
        else {
            info!(id = %activity.id, "Undone Follow has no object");
            return Ok(());
        };

        let Some(followee) = self.account_repo.find_by_ap_id(followee_iri.as_str()).await?
        else {
            info!(followee = %followee_iri, "Undone Follow target unknown");
            return Ok(());
        };
        let Some(unfollower) = self
            .account_repo
            .find_by_ap_id(activity.actor.as_str())
            .await?
        else {
            info!(actor = %activity.actor, "Unfollower unknown");
            return Ok(());
        };

        let removed = self
            .accounts
            .record_account_unfollow(&followee, &unfollower)
            .await?;
        info!(
            follower = unfollower.id,
            followee = followee.id,
            removed,
            "Processed Undo(Follow)"
        );
        Ok(())
    }

    async fn undo_announce(&self, activity: &UndoActivity, announce: &Value) -> AppResult<()> {
        let target_iri = match announce.get("object") {
            Some(Value::String(s)) => Url::parse(s).ok(),
            Some(obj) => obj
                .get("id")
                .and_then(Value::as_str)
                .and_then(|s| Url::parse(s).ok()),
            None => None,
        };
        let Some(target_iri) = target_iri else {
            info!(id = %activity.id, "Undone Announce has no object");
            return Ok(());
        };

        let Some(post) = self
            .posts
            .repository()
            .find_by_ap_id(target_iri.as_str())
            .await?
        else {
            info!(target = %target_iri, "Undone Announce target unknown");
            return Ok(());
        };
        let Some(sender) = self
            .account_repo
            .find_by_ap_id(activity.actor.as_str())
            .await?
        else {
            info!(actor = %activity.actor, "Announce sender unknown");
            return Ok(());
        };

        drop_or_retry(
            self.posts.remove_repost(sender.id, &post).await,
            "undo announce",
        )?;

        info!(post_id = post.id, sender = sender.id, "Processed Undo(Announce)");
        Ok(())
    }
}
