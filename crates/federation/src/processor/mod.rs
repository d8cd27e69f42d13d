//! Activity processors for handling incoming `ActivityPub` activities.
//!
//! One processor per activity kind. Every processor is idempotent in
//! effect and tolerates redelivery: unretryable conditions are logged and
//! dropped (the message is acked), transient faults surface as errors so
//! the queue redelivers.

#![allow(missing_docs)]

mod accept;
mod announce;
mod create;
mod delete;
mod follow;
mod like;
mod undo;
mod update;

pub use accept::AcceptProcessor;
pub use announce::AnnounceProcessor;
pub use create::CreateProcessor;
pub use delete::DeleteProcessor;
pub use follow::FollowProcessor;
pub use like::LikeProcessor;
pub use undo::UndoProcessor;
pub use update::UpdateProcessor;

use ghostpub_common::{AppError, AppResult};
use ghostpub_core::services::post::PostError;
use ghostpub_core::services::AccountError;
use tracing::{info, warn};

use crate::activities::InboxActivity;

/// The full processor set, dispatched by activity tag.
#[derive(Clone)]
pub struct Processors {
    pub follow: FollowProcessor,
    pub accept: AcceptProcessor,
    pub create: CreateProcessor,
    pub announce: AnnounceProcessor,
    pub like: LikeProcessor,
    pub undo: UndoProcessor,
    pub delete: DeleteProcessor,
    pub update: UpdateProcessor,
}

impl Processors {
    /// Dispatch a verified activity to its processor.
    pub async fn dispatch(&self, activity: &InboxActivity) -> AppResult<()> {
        info!(
            activity_type = activity.activity_type(),
            actor = ?activity.actor(),
            "Processing activity"
        );

        match activity {
            InboxActivity::Follow(a) => self.follow.process(a).await,
            InboxActivity::Accept(a) => self.accept.process(a).await,
            InboxActivity::Create(a) => self.create.process(a).await,
            InboxActivity::Announce(a) => self.announce.process(a).await,
            InboxActivity::Like(a) => self.like.process(a).await,
            InboxActivity::Undo(a) => self.undo.process(a).await,
            InboxActivity::Delete(a) => self.delete.process(a).await,
            InboxActivity::Update(a) => self.update.process(a).await,
            InboxActivity::Reject(a) => {
                info!(id = %a.id, actor = %a.actor, "Ignoring inbound Reject");
                Ok(())
            }
            InboxActivity::Unknown(value) => {
                warn!(
                    activity_type = ?value.get("type"),
                    "Ignoring unknown activity type"
                );
                Ok(())
            }
        }
    }
}

/// Map a post-service result onto the handler error policy: unretryable
/// conditions become a logged drop (`Ok(None)`), transient faults and
/// storage errors propagate for queue-driven retry.
pub(crate) fn drop_or_retry<T>(
    result: Result<T, PostError>,
    context: &str,
) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PostError::UpstreamError(e)) => Err(AppError::Federation(format!("{context}: {e}"))),
        Err(PostError::App(e)) => Err(e),
        Err(e) => {
            info!(context = context, reason = %e, "Dropping activity");
            Ok(None)
        }
    }
}

/// Same policy for account resolution results.
pub(crate) fn drop_or_retry_account<T>(
    result: Result<T, AccountError>,
    context: &str,
) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AccountError::NetworkFailure(e)) => {
            Err(AppError::Federation(format!("{context}: {e}")))
        }
        Err(AccountError::App(e)) => Err(e),
        Err(e) => {
            info!(context = context, reason = %e, "Dropping activity");
            Ok(None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_or_retry_policy() {
        assert_eq!(drop_or_retry(Ok(1), "t").unwrap(), Some(1));

        // Unretryable conditions are dropped
        assert_eq!(
            drop_or_retry::<i32>(Err(PostError::NotAPost), "t").unwrap(),
            None
        );
        assert_eq!(
            drop_or_retry::<i32>(Err(PostError::CannotInteract), "t").unwrap(),
            None
        );
        assert_eq!(
            drop_or_retry::<i32>(Err(PostError::AlreadyReposted), "t").unwrap(),
            None
        );

        // Transient faults surface for retry
        assert!(drop_or_retry::<i32>(
            Err(PostError::UpstreamError("503".to_string())),
            "t"
        )
        .is_err());
    }

    #[test]
    fn test_drop_or_retry_account_policy() {
        assert_eq!(
            drop_or_retry_account::<i32>(Err(AccountError::NotFound), "t").unwrap(),
            None
        );
        assert!(drop_or_retry_account::<i32>(
            Err(AccountError::NetworkFailure("dns".to_string())),
            "t"
        )
        .is_err());
    }
}
