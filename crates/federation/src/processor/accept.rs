//! Accept activity processor.

use ghostpub_common::AppResult;
use ghostpub_core::services::AccountService;
use ghostpub_db::repositories::AccountRepository;
use ghostpub_db::SharedObjectStore;
use serde_json::Value;
use tracing::info;
use url::Url;

use super::drop_or_retry_account;
use crate::activities::AcceptActivity;

/// Processor for Accept activities answering follows we sent.
#[derive(Clone)]
pub struct AcceptProcessor {
    accounts: AccountService,
    account_repo: AccountRepository,
    store: SharedObjectStore,
}

impl AcceptProcessor {
    /// Create a new accept processor.
    #[must_use]
    pub fn new(
        accounts: AccountService,
        account_repo: AccountRepository,
        store: SharedObjectStore,
    ) -> Self {
        Self {
            accounts,
            account_repo,
            store,
        }
    }

    /// Process an incoming Accept.
    pub async fn process(&self, activity: &AcceptActivity) -> AppResult<()> {
        let Some(follow) = activity.object.embedded() else {
            info!(id = %activity.id, "Accept without embedded object");
            return Ok(());
        };

        if follow.get("type").and_then(Value::as_str) != Some("Follow") {
            info!(id = %activity.id, "Accept object is not a Follow");
            return Ok(());
        }

        let Some(follow_actor) = follow
            .get("actor")
            .and_then(Value::as_str)
            .and_then(|s| Url::parse(s).ok())
        else {
            info!(id = %activity.id, "Accepted Follow has no actor");
            return Ok(());
        };

        // The accepted follow must be one this site initiated.
        let Some(local) = self.account_repo.find_by_ap_id(follow_actor.as_str()).await? else {
            info!(actor = %follow_actor, "Accepted Follow actor is unknown");
            return Ok(());
        };
        if !self.account_repo.is_internal(local.id).await? {
            info!(actor = %follow_actor, "Accepted Follow actor is not local");
            return Ok(());
        }

        let Some(remote) = drop_or_retry_account(
            self.accounts.ensure_by_ap_id(&activity.actor).await,
            "accept actor",
        )?
        else {
            return Ok(());
        };

        let created = self.accounts.follow_account(&local, &remote).await?;
        info!(
            follower = local.id,
            followee = remote.id,
            new_edge = created,
            "Recorded accepted follow"
        );

        self.store
            .set(
                activity.id.as_str(),
                serde_json::to_value(activity).unwrap_or_default(),
            )
            .await?;

        Ok(())
    }
}
