//! Domain services.

pub mod account;
pub mod counts;
pub mod feed;
pub mod moderation;
pub mod post;

pub use account::{parse_actor, AccountError, AccountPatch, AccountService, ParsedActor};
pub use counts::{is_due, CountsRefresher, RefreshSummary};
pub use feed::{FeedItem, FeedKind, FeedPage, FeedService};
pub use moderation::{interaction_allowed, ModerationService};
pub use post::{parse_object, ArticleDraft, ParsedObject, PostError, PostService};
