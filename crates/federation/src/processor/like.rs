//! Like activity processor.

use ghostpub_common::AppResult;
use ghostpub_core::services::{AccountService, PostService};
use ghostpub_db::entities::notification::NotificationKind;
use ghostpub_db::repositories::{AccountRepository, NotificationRepository};
use ghostpub_db::SharedObjectStore;
use tracing::info;

use super::{drop_or_retry, drop_or_retry_account};
use crate::activities::LikeActivity;

/// Processor for Like activities.
#[derive(Clone)]
pub struct LikeProcessor {
    accounts: AccountService,
    posts: PostService,
    account_repo: AccountRepository,
    notification_repo: NotificationRepository,
    store: SharedObjectStore,
}

impl LikeProcessor {
    /// Create a new like processor.
    #[must_use]
    pub fn new(
        accounts: AccountService,
        posts: PostService,
        account_repo: AccountRepository,
        notification_repo: NotificationRepository,
        store: SharedObjectStore,
    ) -> Self {
        Self {
            accounts,
            posts,
            account_repo,
            notification_repo,
            store,
        }
    }

    /// Process an incoming Like. Idempotent: a duplicate like leaves the
    /// row set unchanged.
    pub async fn process(&self, activity: &LikeActivity) -> AppResult<()> {
        let Some(object_id) = activity.object.id() else {
            info!(id = %activity.id, "Like object has no id");
            return Ok(());
        };

        let Some(liker) = drop_or_retry_account(
            self.accounts.ensure_by_ap_id(&activity.actor).await,
            "like actor",
        )?
        else {
            return Ok(());
        };

        self.store
            .set(
                activity.id.as_str(),
                serde_json::to_value(activity).unwrap_or_default(),
            )
            .await?;

        let Some(target) =
            drop_or_retry(self.posts.get_by_ap_id(&object_id).await, "like object")?
        else {
            return Ok(());
        };

        let Some(post) = drop_or_retry(
            self.posts.like_post(liker.id, &target).await,
            "like post",
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
                .create(user.id, liker.id, NotificationKind::Like, Some(post.id))
                .await?;
        }

        info!(post_id = post.id, liker = liker.id, "Processed Like");
        Ok(())
    }
}
