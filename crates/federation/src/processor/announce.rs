//! Announce activity processor.
//!
//! Two shapes arrive here: a plain repost of an object, and the group
//! re-announcement of an inner Create (FEP-1b12). The latter is only
//! accepted from Group actors the site's default account follows, and the
//! inner Create must verify by network-lookup equality.

use ghostpub_common::AppResult;
use ghostpub_core::ports::SharedResolver;
use ghostpub_core::services::{AccountService, PostService};
use ghostpub_db::entities::notification::NotificationKind;
use ghostpub_db::repositories::{AccountRepository, FollowRepository, NotificationRepository};
use ghostpub_db::SharedObjectStore;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::{drop_or_retry, drop_or_retry_account};
use crate::activities::{AnnounceActivity, CreateActivity};
use crate::origin::same_origin;

/// Processor for Announce activities.
#[derive(Clone)]
pub struct AnnounceProcessor {
    accounts: AccountService,
    posts: PostService,
    account_repo: AccountRepository,
    follow_repo: FollowRepository,
    notification_repo: NotificationRepository,
    resolver: SharedResolver,
    store: SharedObjectStore,
    site_handle: String,
}

impl AnnounceProcessor {
    /// Create a new announce processor.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: AccountService,
        posts: PostService,
        account_repo: AccountRepository,
        follow_repo: FollowRepository,
        notification_repo: NotificationRepository,
        resolver: SharedResolver,
        store: SharedObjectStore,
        site_handle: String,
    ) -> Self {
        Self {
            accounts,
            posts,
            account_repo,
            follow_repo,
            notification_repo,
            resolver,
            store,
            site_handle,
        }
    }

    /// Process an incoming Announce.
    pub async fn process(&self, activity: &AnnounceActivity) -> AppResult<()> {
        if activity.object.embedded_type() == Some("Create") {
            return self.process_group_announce(activity).await;
        }
        self.process_repost(activity).await
    }

    /// Plain repost: ensure sender and target, add the repost row.
    async fn process_repost(&self, activity: &AnnounceActivity) -> AppResult<()> {
        let Some(object_id) = activity.object.id() else {
            info!(id = %activity.id, "Announce object has no id");
            return Ok(());
        };

        let Some(sender) = drop_or_retry_account(
            self.accounts.ensure_by_ap_id(&activity.actor).await,
            "announce actor",
        )?
        else {
            return Ok(());
        };

        self.persist_expanded(activity, &object_id).await?;

        let Some(post) = drop_or_retry(
            self.posts.repost_by_ap_id(&sender, &object_id).await,
            "announce object",
        )?
        else {
            return Ok(());
        };

        if let Some(user) = self
            .account_repo
            .find_user_for_account(post.author_id)
            .await?
        {
            self.notification_repo
                .create(user.id, sender.id, NotificationKind::Repost, Some(post.id))
                .await?;
        }

        info!(post_id = post.id, sender = sender.id, "Processed Announce");
        Ok(())
    }

    /// Store the Announce with its object expanded when we can get it.
    async fn persist_expanded(
        &self,
        activity: &AnnounceActivity,
        object_id: &Url,
    ) -> AppResult<()> {
        let mut value = serde_json::to_value(activity).unwrap_or_default();

        if activity.object.embedded().is_none()
            && let Ok(Some(object)) = self.resolver.lookup(object_id).await
        {
            value["object"] = object;
        }

        self.store.set(activity.id.as_str(), value).await
    }

    /// FEP-1b12: a Group actor the site follows relays a Create.
    async fn process_group_announce(&self, activity: &AnnounceActivity) -> AppResult<()> {
        let Some(announcer) = drop_or_retry_account(
            self.accounts.ensure_by_ap_id(&activity.actor).await,
            "group announcer",
        )?
        else {
            return Ok(());
        };

        // The persisted account does not carry the actor type; check the
        // live document.
        let is_group = match self.resolver.lookup_actor(&activity.actor).await {
            Ok(Some(actor)) => actor.get("type").and_then(Value::as_str) == Some("Group"),
            _ => false,
        };
        if !is_group {
            info!(actor = %activity.actor, "Announce(Create) from non-Group actor");
            return Ok(());
        }

        let Some(default_account) = self
            .account_repo
            .find_internal_by_username(&self.site_handle)
            .await?
        else {
            warn!("Site default account missing");
            return Ok(());
        };
        if !self
            .follow_repo
            .is_following(default_account.id, announcer.id)
            .await?
        {
            info!(actor = %activity.actor, "Announce(Create) from unfollowed group");
            return Ok(());
        }

        let Some(inner) = activity.object.embedded() else {
            return Ok(());
        };
        let Ok(inner_create) = serde_json::from_value::<CreateActivity>(inner.clone()) else {
            info!(id = %activity.id, "Embedded Create does not parse");
            return Ok(());
        };
        let Some(inner_object_id) = inner_create.object_id() else {
            info!(id = %inner_create.id, "Embedded Create has no object id");
            return Ok(());
        };

        // Verify by network lookup: the origin server must serve a Create
        // with the same id, a same-origin actor, and the same object.
        let Some(fetched) = self
            .resolver
            .lookup(&inner_create.id)
            .await
            .map_err(|e| ghostpub_common::AppError::Federation(e.to_string()))?
        else {
            info!(id = %inner_create.id, "Embedded Create not served by origin");
            return Ok(());
        };

        if !verify_fetched_create(&fetched, &inner_create.id, &inner_object_id) {
            warn!(id = %inner_create.id, "Embedded Create failed origin verification");
            return Ok(());
        }

        self.store.set(inner_create.id.as_str(), fetched).await?;

        let Some(post) = drop_or_retry(
            self.posts.get_by_ap_id(&inner_object_id).await,
            "group announce object",
        )?
        else {
            return Ok(());
        };

        match drop_or_retry(
            self.posts
                .repost_by_ap_id(&announcer, &inner_object_id)
                .await,
            "group announce repost",
        )? {
            Some(_) => {
                info!(
                    post_id = post.id,
                    group = announcer.id,
                    "Processed group Announce(Create)"
                );
            }
            None => {}
        }

        Ok(())
    }
}

/// The looked-up Create must match the embedded one: same id, an actor on
/// the Create's own origin, and the same object id.
#[must_use]
pub fn verify_fetched_create(fetched: &Value, create_id: &Url, object_id: &Url) -> bool {
    let Some(fetched_id) = fetched
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Url::parse(s).ok())
    else {
        return false;
    };
    if fetched_id != *create_id {
        return false;
    }

    let Some(actor) = fetched
        .get("actor")
        .and_then(Value::as_str)
        .and_then(|s| Url::parse(s).ok())
    else {
        return false;
    };
    if !same_origin(&actor, create_id) {
        return false;
    }

    let fetched_object_id = match fetched.get("object") {
        Some(Value::String(s)) => Url::parse(s).ok(),
        Some(obj) => obj
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Url::parse(s).ok()),
        None => None,
    };

    fetched_object_id.as_ref() == Some(object_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_verify_fetched_create_accepts_matching() {
        let fetched = json!({
            "id": "https://forum.example/create/1",
            "type": "Create",
            "actor": "https://forum.example/u/group",
            "object": { "id": "https://forum.example/note/1", "type": "Note" }
        });

        assert!(verify_fetched_create(
            &fetched,
            &url("https://forum.example/create/1"),
            &url("https://forum.example/note/1")
        ));
    }

    #[test]
    fn test_verify_fetched_create_rejects_cross_origin_actor() {
        let fetched = json!({
            "id": "https://forum.example/create/1",
            "actor": "https://evil.example/u/group",
            "object": "https://forum.example/note/1"
        });

        assert!(!verify_fetched_create(
            &fetched,
            &url("https://forum.example/create/1"),
            &url("https://forum.example/note/1")
        ));
    }

    #[test]
    fn test_verify_fetched_create_rejects_id_mismatch() {
        let fetched = json!({
            "id": "https://forum.example/create/other",
            "actor": "https://forum.example/u/group",
            "object": "https://forum.example/note/1"
        });

        assert!(!verify_fetched_create(
            &fetched,
            &url("https://forum.example/create/1"),
            &url("https://forum.example/note/1")
        ));
    }

    #[test]
    fn test_verify_fetched_create_rejects_object_mismatch() {
        let fetched = json!({
            "id": "https://forum.example/create/1",
            "actor": "https://forum.example/u/group",
            "object": "https://forum.example/note/2"
        });

        assert!(!verify_fetched_create(
            &fetched,
            &url("https://forum.example/create/1"),
            &url("https://forum.example/note/1")
        ));
    }
}
