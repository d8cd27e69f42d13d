//! Interaction-counts refresher.
//!
//! External posts mirror like/repost totals from their origin server. The
//! refresh cadence decays with post age: fresh posts are re-checked every
//! ten minutes, week-old posts once a day.

use chrono::{DateTime, Duration, Utc};
use ghostpub_db::repositories::{AccountRepository, PostRepository};
use tracing::{debug, info, warn};
use url::Url;

use crate::ports::SharedResolver;
use crate::services::post::{parse_object, PostError, PostService};

/// Whether a post is due a counts refresh.
///
/// Bands by age since publication: under 6 h → refresh after 10 min;
/// 6–24 h → 2 h; 1–7 d → 6 h; older → 24 h.
#[must_use]
pub fn is_due(
    published_at: DateTime<Utc>,
    last_update: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    let age = now - published_at;
    let since_update = now - last_update;

    let threshold = if age < Duration::hours(6) {
        Duration::minutes(10)
    } else if age < Duration::hours(24) {
        Duration::hours(2)
    } else if age < Duration::days(7) {
        Duration::hours(6)
    } else {
        Duration::hours(24)
    };

    since_update > threshold
}

/// Result of one refresh sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Refreshes remote interaction counts for external posts.
#[derive(Clone)]
pub struct CountsRefresher {
    post_repo: PostRepository,
    account_repo: AccountRepository,
    posts: PostService,
    resolver: SharedResolver,
}

impl CountsRefresher {
    /// Create a new counts refresher.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        account_repo: AccountRepository,
        posts: PostService,
        resolver: SharedResolver,
    ) -> Self {
        Self {
            post_repo,
            account_repo,
            posts,
            resolver,
        }
    }

    /// Refresh one post if it is due. Returns whether a refresh ran.
    pub async fn refresh_post(&self, post_id: i64) -> Result<bool, PostError> {
        let Some(post) = self.post_repo.find_by_id(post_id).await? else {
            debug!(post_id, "Skipping counts refresh for unknown post");
            return Ok(false);
        };

        // Internal posts are authoritative locally.
        if self.account_repo.is_internal(post.author_id).await? {
            return Ok(false);
        }

        let now = Utc::now();
        let last_update = post.updated_at.unwrap_or(post.published_at);
        if !is_due(post.published_at, last_update, now) {
            debug!(post_id, "Counts refresh not due yet");
            return Ok(false);
        }

        let iri = Url::parse(&post.ap_id)
            .map_err(|e| PostError::UpstreamError(format!("Stored ap_id unparsable: {e}")))?;

        let Some(object) = self.resolver.lookup(&iri).await? else {
            debug!(post_id, "Remote object gone; leaving counts as stored");
            return Ok(false);
        };

        let parsed = parse_object(&object)?;
        let like_count = parsed.like_count.unwrap_or(post.like_count);
        let repost_count = parsed.repost_count.unwrap_or(post.repost_count);

        self.posts
            .mirror_remote_counts(&post, like_count, repost_count)
            .await?;

        info!(post_id, like_count, repost_count, "Refreshed interaction counts");
        Ok(true)
    }

    /// Refresh a batch of posts, logging per-post failures.
    pub async fn refresh_posts(&self, post_ids: &[i64]) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        for post_id in post_ids {
            match self.refresh_post(*post_id).await {
                Ok(true) => summary.refreshed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!(post_id, error = %e, "Counts refresh failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(hours_ago: i64, minutes_ago: i64) -> DateTime<Utc> {
        Utc::now() - Duration::hours(hours_ago) - Duration::minutes(minutes_ago)
    }

    #[test]
    fn test_fresh_post_refreshed_after_ten_minutes() {
        let now = Utc::now();
        // Published 3h ago, refreshed 9 minutes ago: not due.
        assert!(!is_due(at(3, 0), at(0, 9), now));
        // Same post, refreshed 20 minutes ago: due.
        assert!(is_due(at(3, 0), at(0, 20), now));
    }

    #[test]
    fn test_day_old_post_uses_two_hour_band() {
        let now = Utc::now();
        assert!(!is_due(at(12, 0), at(1, 0), now));
        assert!(is_due(at(12, 0), at(3, 0), now));
    }

    #[test]
    fn test_week_old_post_uses_six_hour_band() {
        let now = Utc::now();
        assert!(!is_due(at(72, 0), at(5, 0), now));
        assert!(is_due(at(72, 0), at(7, 0), now));
    }

    #[test]
    fn test_old_post_uses_daily_band() {
        let now = Utc::now();
        assert!(!is_due(at(24 * 30, 0), at(23, 0), now));
        assert!(is_due(at(24 * 30, 0), at(25, 0), now));
    }
}
