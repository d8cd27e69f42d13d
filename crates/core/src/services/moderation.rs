//! Moderation service: "can A interact with B?".

use ghostpub_db::entities::{account, block, domain_block};
use ghostpub_db::repositories::{AccountRepository, BlockRepository, FollowRepository};
use ghostpub_common::{AppError, AppResult};
use tracing::info;

use crate::events::{DomainEvent, SharedEventBus};

/// Moderation service: answers interaction questions from blocks and
/// domain blocks, and owns the block write path.
#[derive(Clone)]
pub struct ModerationService {
    account_repo: AccountRepository,
    block_repo: BlockRepository,
    follow_repo: FollowRepository,
    bus: SharedEventBus,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        account_repo: AccountRepository,
        block_repo: BlockRepository,
        follow_repo: FollowRepository,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            account_repo,
            block_repo,
            follow_repo,
            bus,
        }
    }

    /// Block an account: record the block, sever follow edges in both
    /// directions, and emit `account.blocked`.
    pub async fn block_account(&self, blocker_id: i64, blocked_id: i64) -> AppResult<()> {
        if blocker_id == blocked_id {
            return Err(AppError::BadRequest("Cannot block yourself".to_string()));
        }

        let created = self.block_repo.create_block(blocker_id, blocked_id).await?;

        // A block ends the relationship both ways.
        self.follow_repo.delete_by_pair(blocker_id, blocked_id).await?;
        self.follow_repo.delete_by_pair(blocked_id, blocker_id).await?;

        if created {
            info!(blocker = blocker_id, blocked = blocked_id, "Recorded block");
            self.bus
                .publish(&DomainEvent::AccountBlocked {
                    blocker_id,
                    blocked_id,
                })
                .await;
        }

        Ok(())
    }

    /// Remove a block.
    pub async fn unblock_account(&self, blocker_id: i64, blocked_id: i64) -> AppResult<()> {
        self.block_repo.delete_block(blocker_id, blocked_id).await
    }

    /// Block an entire domain for an account.
    pub async fn block_domain(&self, blocker_id: i64, domain: &str) -> AppResult<()> {
        let created = self.block_repo.create_domain_block(blocker_id, domain).await?;
        if created {
            info!(blocker = blocker_id, domain = %domain, "Recorded domain block");
        }
        Ok(())
    }

    /// Remove a domain block.
    pub async fn unblock_domain(&self, blocker_id: i64, domain: &str) -> AppResult<()> {
        self.block_repo.delete_domain_block(blocker_id, domain).await
    }

    /// Whether `viewer` may interact with `target`.
    ///
    /// False when either account blocks the other, or when either has
    /// blocked the other's domain.
    pub async fn can_interact_with_account(
        &self,
        viewer_id: i64,
        target_id: i64,
    ) -> AppResult<bool> {
        if viewer_id == target_id {
            return Ok(true);
        }

        let blocks = self.block_repo.find_between(viewer_id, target_id).await?;
        if !blocks.is_empty() {
            return Ok(false);
        }

        let accounts = self.account_repo.find_by_ids(&[viewer_id, target_id]).await?;
        let viewer = accounts
            .iter()
            .find(|a| a.id == viewer_id)
            .ok_or_else(|| AppError::AccountNotFound(viewer_id.to_string()))?;
        let target = accounts
            .iter()
            .find(|a| a.id == target_id)
            .ok_or_else(|| AppError::AccountNotFound(target_id.to_string()))?;

        let domain_blocks = self
            .block_repo
            .find_domain_blocks_for(&[viewer_id, target_id])
            .await?;

        Ok(interaction_allowed(viewer, target, &[], &domain_blocks))
    }

    /// Accounts the viewer must not see, for read-path filtering.
    pub async fn hidden_account_ids(&self, viewer_id: i64) -> AppResult<Vec<i64>> {
        self.block_repo.hidden_account_ids(viewer_id).await
    }
}

/// Pure interaction rule over already-fetched rows.
///
/// `blocks` holds the rows between the two accounts in either direction;
/// `domain_blocks` holds rows whose blocker is either account.
#[must_use]
pub fn interaction_allowed(
    viewer: &account::Model,
    target: &account::Model,
    blocks: &[block::Model],
    domain_blocks: &[domain_block::Model],
) -> bool {
    for row in blocks {
        let blocks_viewer = row.blocker_id == target.id && row.blocked_id == viewer.id;
        let blocks_target = row.blocker_id == viewer.id && row.blocked_id == target.id;
        if blocks_viewer || blocks_target {
            return false;
        }
    }

    for row in domain_blocks {
        let viewer_blocks_target_domain =
            row.blocker_id == viewer.id && row.domain_hash == target.domain_hash;
        let target_blocks_viewer_domain =
            row.blocker_id == target.id && row.domain_hash == viewer.domain_hash;
        if viewer_blocks_target_domain || target_blocks_viewer_domain {
            return false;
        }
    }

    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ghostpub_common::sha256_hex;
    use ghostpub_db::test_utils::account_fixture;

    fn block_row(blocker_id: i64, blocked_id: i64) -> block::Model {
        block::Model {
            id: 1,
            blocker_id,
            blocked_id,
            created_at: Utc::now(),
        }
    }

    fn domain_block_row(blocker_id: i64, domain: &str) -> domain_block::Model {
        domain_block::Model {
            id: 1,
            blocker_id,
            domain: domain.to_string(),
            domain_hash: sha256_hex(domain),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_allowed_when_no_blocks() {
        let a = account_fixture(1, "https://site.example/u/a", "site.example");
        let b = account_fixture(2, "https://r.example/u/b", "r.example");

        assert!(interaction_allowed(&a, &b, &[], &[]));
    }

    #[test]
    fn test_target_blocking_viewer_denies() {
        let a = account_fixture(1, "https://site.example/u/a", "site.example");
        let b = account_fixture(2, "https://r.example/u/b", "r.example");

        assert!(!interaction_allowed(&b, &a, &[block_row(1, 2)], &[]));
    }

    #[test]
    fn test_viewer_blocking_target_denies() {
        let a = account_fixture(1, "https://site.example/u/a", "site.example");
        let b = account_fixture(2, "https://r.example/u/b", "r.example");

        assert!(!interaction_allowed(&a, &b, &[block_row(1, 2)], &[]));
    }

    #[test]
    fn test_domain_block_denies_both_directions() {
        let a = account_fixture(1, "https://site.example/u/a", "site.example");
        let b = account_fixture(2, "https://r.example/u/b", "r.example");

        // a blocked b's domain
        let rows = [domain_block_row(1, "r.example")];
        assert!(!interaction_allowed(&a, &b, &[], &rows));
        assert!(!interaction_allowed(&b, &a, &[], &rows));
    }

    #[test]
    fn test_unrelated_domain_block_allows() {
        let a = account_fixture(1, "https://site.example/u/a", "site.example");
        let b = account_fixture(2, "https://r.example/u/b", "r.example");

        let rows = [domain_block_row(1, "other.example")];
        assert!(interaction_allowed(&a, &b, &[], &rows));
    }
}
