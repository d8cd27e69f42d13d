//! Feed engine: materialized per-user reverse-chronological feeds.
//!
//! Subscribes to post events and maintains the `feeds` rows; reads join
//! the rows back with posts, authors, and the viewer's own likes and
//! reposts.

use async_trait::async_trait;
use ghostpub_common::AppResult;
use ghostpub_db::entities::{
    account, feed,
    post::{self, Audience, PostType},
};
use ghostpub_db::repositories::{
    AccountRepository, FeedRepository, FollowRepository, NewFeedRow, PostRepository,
};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::events::{DomainEvent, EventSubscriber, FeedChange, SharedEventBus};
use crate::services::moderation::ModerationService;

/// Which materialized view to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Short-form timeline (notes).
    Feed,
    /// Long-form inbox (articles).
    Inbox,
}

impl FeedKind {
    const fn post_type(self) -> PostType {
        match self {
            Self::Feed => PostType::Note,
            Self::Inbox => PostType::Article,
        }
    }
}

/// One annotated feed entry.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub feed_id: i64,
    pub post: post::Model,
    pub author: account::Model,
    pub reposted_by: Option<account::Model>,
    pub liked_by_user: bool,
    pub reposted_by_user: bool,
}

/// A page of feed entries plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<i64>,
}

/// Feed service for fan-out and reads.
#[derive(Clone)]
pub struct FeedService {
    feed_repo: FeedRepository,
    follow_repo: FollowRepository,
    account_repo: AccountRepository,
    post_repo: PostRepository,
    moderation: ModerationService,
    bus: SharedEventBus,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        feed_repo: FeedRepository,
        follow_repo: FollowRepository,
        account_repo: AccountRepository,
        post_repo: PostRepository,
        moderation: ModerationService,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            feed_repo,
            follow_repo,
            account_repo,
            post_repo,
            moderation,
            bus,
        }
    }

    /// Fan a post out into the feeds that should carry it.
    ///
    /// Replies never enter feeds. The target set is the poster's own user
    /// plus the users following the poster; for a repost, "the poster" is
    /// the reposting account. Followers-only posts reach followers alone.
    pub async fn add_post_to_feeds(
        &self,
        post: &post::Model,
        reposted_by: Option<i64>,
    ) -> AppResult<()> {
        if post.is_reply() {
            debug!(post_id = post.id, "Replies are not fanned out");
            return Ok(());
        }

        let subject_account = reposted_by.unwrap_or(post.author_id);

        let mut user_ids = self.follow_repo.follower_user_ids(subject_account).await?;
        if post.audience == Audience::Public
            && let Some(own) = self
                .account_repo
                .find_user_for_account(subject_account)
                .await?
        {
            user_ids.push(own.id);
        }
        user_ids.sort_unstable();
        user_ids.dedup();

        if user_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<NewFeedRow> = user_ids
            .iter()
            .map(|user_id| NewFeedRow {
                user_id: *user_id,
                post_id: post.id,
                post_type: post.kind,
                audience: post.audience,
                author_id: post.author_id,
                reposted_by_id: reposted_by,
            })
            .collect();

        self.feed_repo.add_rows(rows).await?;

        info!(
            post_id = post.id,
            users = user_ids.len(),
            reposted_by = ?reposted_by,
            "Fanned post out to feeds"
        );

        self.bus
            .publish(&DomainEvent::FeedsUpdated {
                user_ids,
                change: FeedChange::PostAdded,
                post_id: post.id,
            })
            .await;

        Ok(())
    }

    /// Remove a post from feeds, mirroring insertion.
    pub async fn remove_post_from_feeds(
        &self,
        post: &post::Model,
        dereposted_by: Option<i64>,
    ) -> AppResult<()> {
        let user_ids = self.feed_repo.remove_rows(post.id, dereposted_by).await?;
        if user_ids.is_empty() {
            return Ok(());
        }

        info!(
            post_id = post.id,
            users = user_ids.len(),
            dereposted_by = ?dereposted_by,
            "Removed post from feeds"
        );

        self.bus
            .publish(&DomainEvent::FeedsUpdated {
                user_ids,
                change: FeedChange::PostRemoved,
                post_id: post.id,
            })
            .await;

        Ok(())
    }

    /// Read one page of a user's feed.
    pub async fn get_feed(
        &self,
        viewer_account_id: i64,
        user_id: i64,
        kind: FeedKind,
        cursor: Option<i64>,
        limit: u64,
    ) -> AppResult<FeedPage> {
        let hidden = self.moderation.hidden_account_ids(viewer_account_id).await?;

        // One extra row decides whether a next page exists.
        let mut rows = self
            .feed_repo
            .page(user_id, kind.post_type(), &hidden, cursor, limit + 1)
            .await?;

        let next_cursor = if rows.len() as u64 > limit {
            rows.truncate(limit as usize);
            rows.last().map(|row| row.id)
        } else {
            None
        };

        let items = self.annotate(viewer_account_id, rows).await?;
        Ok(FeedPage { items, next_cursor })
    }

    async fn annotate(
        &self,
        viewer_account_id: i64,
        rows: Vec<feed::Model>,
    ) -> AppResult<Vec<FeedItem>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<i64> = rows.iter().map(|row| row.post_id).collect();
        let mut account_ids: Vec<i64> = rows
            .iter()
            .flat_map(|row| {
                std::iter::once(row.author_id).chain(row.reposted_by_id.into_iter())
            })
            .collect();
        account_ids.sort_unstable();
        account_ids.dedup();

        let posts: HashMap<i64, post::Model> = self
            .post_repo
            .find_by_ids(&post_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let accounts: HashMap<i64, account::Model> = self
            .account_repo
            .find_by_ids(&account_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let liked: std::collections::HashSet<i64> = self
            .post_repo
            .liked_post_ids(viewer_account_id, &post_ids)
            .await?
            .into_iter()
            .collect();
        let reposted: std::collections::HashSet<i64> = self
            .post_repo
            .reposted_post_ids(viewer_account_id, &post_ids)
            .await?
            .into_iter()
            .collect();

        let items = rows
            .into_iter()
            .filter_map(|row| {
                let post = posts.get(&row.post_id)?.clone();
                let author = accounts.get(&row.author_id)?.clone();
                let reposted_by = row
                    .reposted_by_id
                    .and_then(|id| accounts.get(&id).cloned());
                Some(FeedItem {
                    feed_id: row.id,
                    liked_by_user: liked.contains(&row.post_id),
                    reposted_by_user: reposted.contains(&row.post_id),
                    post,
                    author,
                    reposted_by,
                })
            })
            .collect();

        Ok(items)
    }
}

#[async_trait]
impl EventSubscriber for FeedService {
    async fn handle(&self, event: &DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::PostCreated { post } => self.add_post_to_feeds(post, None).await,
            DomainEvent::PostReposted { post, reposted_by } => {
                self.add_post_to_feeds(post, Some(*reposted_by)).await
            }
            DomainEvent::PostDeleted { post } => self.remove_post_from_feeds(post, None).await,
            DomainEvent::PostDereposted {
                post,
                dereposted_by,
            } => {
                self.remove_post_from_feeds(post, Some(*dereposted_by))
                    .await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ghostpub_db::repositories::BlockRepository;
    use ghostpub_db::test_utils::post_fixture;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service_on(db: Arc<sea_orm::DatabaseConnection>) -> FeedService {
        let account_repo = AccountRepository::new(db.clone());
        let follow_repo = FollowRepository::new(db.clone());
        let bus = Arc::new(crate::events::EventBus::new());
        FeedService::new(
            FeedRepository::new(db.clone()),
            follow_repo.clone(),
            account_repo.clone(),
            PostRepository::new(db.clone()),
            ModerationService::new(
                account_repo,
                BlockRepository::new(db),
                follow_repo,
                bus.clone(),
            ),
            bus,
        )
    }

    #[tokio::test]
    async fn test_replies_do_not_fan_out() {
        // No queries expected: the mock would fail on any DB touch.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::MySql).into_connection());
        let service = service_on(db);

        let mut reply = post_fixture(2, "https://r.example/note/2", 1);
        reply.in_reply_to = Some(1);

        service.add_post_to_feeds(&reply, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_fan_out_with_no_targets_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // follower edges, then the author's own user row
                .append_query_results([Vec::<ghostpub_db::entities::follow::Model>::new()])
                .append_query_results([Vec::<ghostpub_db::entities::user::Model>::new()])
                .into_connection(),
        );
        let service = service_on(db);

        let post = post_fixture(1, "https://r.example/note/1", 1);
        service.add_post_to_feeds(&post, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_followers_only_excludes_author_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // follower edges only; the author's own user row must not
                // be queried for a followers-only post
                .append_query_results([Vec::<ghostpub_db::entities::follow::Model>::new()])
                .into_connection(),
        );
        let service = service_on(db);

        let mut post = post_fixture(1, "https://r.example/note/1", 1);
        post.audience = Audience::FollowersOnly;

        service.add_post_to_feeds(&post, None).await.unwrap();
    }
}
