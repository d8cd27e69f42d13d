//! Delete activity processor.

use ghostpub_common::AppResult;
use ghostpub_core::services::PostService;
use ghostpub_db::repositories::AccountRepository;
use tracing::{info, warn};

use super::drop_or_retry;
use crate::activities::DeleteActivity;
use crate::origin::same_origin;

/// Processor for Delete activities.
#[derive(Clone)]
pub struct DeleteProcessor {
    posts: PostService,
    account_repo: AccountRepository,
}

impl DeleteProcessor {
    /// Create a new delete processor.
    #[must_use]
    pub const fn new(posts: PostService, account_repo: AccountRepository) -> Self {
        Self {
            posts,
            account_repo,
        }
    }

    /// Process an incoming Delete: tombstone a known post when the sender
    /// owns it. Deletes by non-owners are no-ops.
    pub async fn process(&self, activity: &DeleteActivity) -> AppResult<()> {
        let Some(object_id) = activity.object.id() else {
            info!(id = %activity.id, "Delete object has no id");
            return Ok(());
        };

        // The sender can only delete objects on its own origin.
        if !same_origin(&activity.actor, &object_id) {
            warn!(
                actor = %activity.actor,
                object = %object_id,
                "Dropping Delete with cross-origin object"
            );
            return Ok(());
        }

        let Some(post) = self
            .posts
            .repository()
            .find_by_ap_id(object_id.as_str())
            .await?
        else {
            info!(object = %object_id, "Delete target is not a known post");
            return Ok(());
        };

        let Some(actor) = self
            .account_repo
            .find_by_ap_id(activity.actor.as_str())
            .await?
        else {
            info!(actor = %activity.actor, "Delete sender unknown");
            return Ok(());
        };

        match drop_or_retry(self.posts.delete_post(actor.id, &post).await, "delete post")? {
            Some(Some(_)) => info!(post_id = post.id, "Processed Delete"),
            Some(None) => info!(post_id = post.id, actor = actor.id, "Delete by non-owner ignored"),
            None => {}
        }

        Ok(())
    }
}
