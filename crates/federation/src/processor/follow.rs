//! Follow activity processor.

use ghostpub_common::{ApUrls, AppResult};
use ghostpub_core::services::{AccountService, ModerationService};
use ghostpub_db::repositories::AccountRepository;
use ghostpub_db::SharedObjectStore;
use serde_json::json;
use tracing::info;

use super::drop_or_retry_account;
use crate::activities::{FollowActivity, ACTIVITYSTREAMS_CONTEXT};
use crate::sender::ActivitySender;

/// Processor for Follow activities.
#[derive(Clone)]
pub struct FollowProcessor {
    accounts: AccountService,
    account_repo: AccountRepository,
    moderation: ModerationService,
    store: SharedObjectStore,
    sender: ActivitySender,
    urls: ApUrls,
}

impl FollowProcessor {
    /// Create a new follow processor.
    #[must_use]
    pub fn new(
        accounts: AccountService,
        account_repo: AccountRepository,
        moderation: ModerationService,
        store: SharedObjectStore,
        sender: ActivitySender,
        urls: ApUrls,
    ) -> Self {
        Self {
            accounts,
            account_repo,
            moderation,
            store,
            sender,
            urls,
        }
    }

    /// Process an incoming Follow.
    ///
    /// Records the edge (once), persists the Follow, and answers with a
    /// freshly minted Accept. On redelivery the duplicate edge is ignored
    /// but the Accept is re-sent; the remote drops duplicates.
    pub async fn process(&self, activity: &FollowActivity) -> AppResult<()> {
        let Ok(handle) = self.urls.handle_from_actor(&activity.object) else {
            info!(object = %activity.object, "Follow target is not a local actor");
            return Ok(());
        };

        let Some(followee) = self.account_repo.find_internal_by_username(&handle).await? else {
            info!(handle = %handle, "Follow target account does not exist");
            return Ok(());
        };

        let Some(follower) = drop_or_retry_account(
            self.accounts.ensure_by_ap_id(&activity.actor).await,
            "follow actor",
        )?
        else {
            return Ok(());
        };

        if !self
            .moderation
            .can_interact_with_account(follower.id, followee.id)
            .await?
        {
            info!(
                follower = follower.id,
                followee = followee.id,
                "Follow blocked by moderation"
            );
            return Ok(());
        }

        self.store
            .set(
                activity.id.as_str(),
                serde_json::to_value(activity).unwrap_or_default(),
            )
            .await?;

        let created = self.accounts.follow_account(&follower, &followee).await?;
        info!(
            follower = follower.id,
            followee = followee.id,
            new_edge = created,
            "Recorded follow"
        );

        // Accept goes back regardless; duplicates are harmless.
        let accept_id = self.urls.new_object("accept")?;
        let accept = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": accept_id.as_str(),
            "type": "Accept",
            "actor": followee.ap_id,
            "object": {
                "id": activity.id.as_str(),
                "type": "Follow",
                "actor": follower.ap_id,
                "object": followee.ap_id,
            },
        });
        self.store.set(accept_id.as_str(), accept.clone()).await?;

        if let Some(inbox) = follower.ap_inbox.as_ref().or(follower.ap_shared_inbox.as_ref()) {
            self.sender
                .send_to_inbox(followee.id, inbox, &accept)
                .await?;
            info!(follower = follower.id, accept = %accept_id, "Queued Accept");
        } else {
            info!(follower = follower.id, "Follower has no inbox for Accept");
        }

        Ok(())
    }
}
