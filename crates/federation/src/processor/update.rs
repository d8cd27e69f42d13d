//! Update activity processor.

use ghostpub_common::AppResult;
use ghostpub_core::services::{AccountService, PostService};
use ghostpub_db::repositories::AccountRepository;
use tracing::{info, warn};

use super::{drop_or_retry, drop_or_retry_account};
use crate::activities::UpdateActivity;
use crate::origin::same_origin;

const ACTOR_TYPES: &[&str] = &["Person", "Service", "Application", "Group", "Organization"];

/// Processor for Update activities.
#[derive(Clone)]
pub struct UpdateProcessor {
    accounts: AccountService,
    posts: PostService,
    account_repo: AccountRepository,
}

impl UpdateProcessor {
    /// Create a new update processor.
    #[must_use]
    pub const fn new(
        accounts: AccountService,
        posts: PostService,
        account_repo: AccountRepository,
    ) -> Self {
        Self {
            accounts,
            posts,
            account_repo,
        }
    }

    /// Process an incoming Update of an actor or of a known post.
    pub async fn process(&self, activity: &UpdateActivity) -> AppResult<()> {
        let Some(object_id) = activity.object_id() else {
            info!(id = %activity.id, "Update object has no id");
            return Ok(());
        };

        match activity.object_type() {
            Some(t) if ACTOR_TYPES.contains(&t) => {
                // Actors only update themselves.
                if object_id != activity.actor {
                    warn!(
                        actor = %activity.actor,
                        object = %object_id,
                        "Dropping Update(Actor) for another actor"
                    );
                    return Ok(());
                }

                let Some(account) =
                    self.account_repo.find_by_ap_id(object_id.as_str()).await?
                else {
                    info!(object = %object_id, "Update(Actor) for unknown account");
                    return Ok(());
                };

                if drop_or_retry_account(
                    self.accounts
                        .update_from_remote_actor(&account, &activity.object)
                        .await,
                    "update actor",
                )?
                .is_some()
                {
                    info!(account_id = account.id, "Processed Update(Actor)");
                }
            }
            Some("Note" | "Article") => {
                if !same_origin(&activity.actor, &object_id) {
                    warn!(
                        actor = %activity.actor,
                        object = %object_id,
                        "Dropping Update with cross-origin object"
                    );
                    return Ok(());
                }

                let Some(post) = self
                    .posts
                    .repository()
                    .find_by_ap_id(object_id.as_str())
                    .await?
                else {
                    info!(object = %object_id, "Update for unknown post");
                    return Ok(());
                };

                if drop_or_retry(
                    self.posts.update_from_remote(&post, &activity.object).await,
                    "update post",
                )?
                .is_some()
                {
                    info!(post_id = post.id, "Processed Update(Object)");
                }
            }
            other => {
                info!(id = %activity.id, object_type = ?other, "Ignoring Update target");
            }
        }

        Ok(())
    }
}
