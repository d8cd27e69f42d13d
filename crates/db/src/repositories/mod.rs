//! Repositories wrapping database access.

mod account;
mod block;
mod feed;
mod follow;
mod notification;
mod outbox;
mod post;
mod site;

pub use account::{is_unique_violation, AccountRepository};
pub use block::BlockRepository;
pub use feed::{FeedRepository, NewFeedRow};
pub use follow::FollowRepository;
pub use notification::NotificationRepository;
pub use outbox::OutboxRepository;
pub use post::{PostRepository, PostSave, SaveOutcome};
pub use site::SiteRepository;
