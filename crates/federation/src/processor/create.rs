//! Create activity processor.

use ghostpub_common::AppResult;
use ghostpub_core::services::PostService;
use ghostpub_db::entities::notification::NotificationKind;
use ghostpub_db::repositories::{AccountRepository, NotificationRepository, PostRepository};
use ghostpub_db::SharedObjectStore;
use serde_json::Value;
use tracing::{info, warn};

use super::drop_or_retry;
use crate::activities::CreateActivity;
use crate::origin::same_origin;

/// Processor for Create activities.
#[derive(Clone)]
pub struct CreateProcessor {
    posts: PostService,
    post_repo: PostRepository,
    account_repo: AccountRepository,
    notification_repo: NotificationRepository,
    store: SharedObjectStore,
}

impl CreateProcessor {
    /// Create a new create processor.
    #[must_use]
    pub fn new(
        posts: PostService,
        post_repo: PostRepository,
        account_repo: AccountRepository,
        notification_repo: NotificationRepository,
        store: SharedObjectStore,
    ) -> Self {
        Self {
            posts,
            post_repo,
            account_repo,
            notification_repo,
            store,
        }
    }

    /// Process an incoming Create: persist the activity, ingest the post
    /// (reply chains included), and notify affected internal users.
    pub async fn process(&self, activity: &CreateActivity) -> AppResult<()> {
        let Some(object_id) = activity.object_id() else {
            info!(id = %activity.id, "Create object has no id");
            return Ok(());
        };

        let object_type = activity.object.get("type").and_then(Value::as_str);
        if !matches!(object_type, Some("Note" | "Article")) {
            info!(id = %activity.id, object_type = ?object_type, "Create object is not a post");
            return Ok(());
        }

        if activity.attribution_id().is_none() {
            info!(id = %activity.id, "Create object has no attribution");
            return Ok(());
        }

        // Created objects must share their creator's origin.
        if !same_origin(&object_id, &activity.actor) {
            warn!(
                object = %object_id,
                actor = %activity.actor,
                "Dropping Create with cross-origin object"
            );
            return Ok(());
        }

        self.store
            .set(
                activity.id.as_str(),
                serde_json::to_value(activity).unwrap_or_default(),
            )
            .await?;

        let Some(post) = drop_or_retry(self.posts.get_by_ap_id(&object_id).await, "create object")?
        else {
            return Ok(());
        };

        self.notify_reply_target(&post).await?;
        self.notify_mentions(activity, &post).await?;

        info!(post_id = post.id, ap_id = %post.ap_id, "Processed Create");
        Ok(())
    }

    /// A reply to an internal user's post notifies that user.
    async fn notify_reply_target(
        &self,
        post: &ghostpub_db::entities::post::Model,
    ) -> AppResult<()> {
        let Some(parent_id) = post.in_reply_to else {
            return Ok(());
        };
        let Some(parent) = self.post_repo.find_by_id(parent_id).await? else {
            return Ok(());
        };
        let Some(user) = self
            .account_repo
            .find_user_for_account(parent.author_id)
            .await?
        else {
            return Ok(());
        };

        self.notification_repo
            .create(
                user.id,
                post.author_id,
                NotificationKind::Reply,
                Some(post.id),
            )
            .await?;
        Ok(())
    }

    /// Mentioned internal users get a notification each.
    async fn notify_mentions(
        &self,
        activity: &CreateActivity,
        post: &ghostpub_db::entities::post::Model,
    ) -> AppResult<()> {
        let Some(tags) = activity.object.get("tag").and_then(Value::as_array) else {
            return Ok(());
        };

        for tag in tags {
            if tag.get("type").and_then(Value::as_str) != Some("Mention") {
                continue;
            }
            let Some(href) = tag.get("href").and_then(Value::as_str) else {
                continue;
            };
            let Some(mentioned) = self.account_repo.find_by_ap_id(href).await? else {
                continue;
            };
            let Some(user) = self
                .account_repo
                .find_user_for_account(mentioned.id)
                .await?
            else {
                continue;
            };
            self.notification_repo
                .create(
                    user.id,
                    post.author_id,
                    NotificationKind::Mention,
                    Some(post.id),
                )
                .await?;
        }
        Ok(())
    }
}
