//! Domain services for ghostpub.

pub mod events;
pub mod ports;
pub mod services;

pub use events::{DomainEvent, EventBus, EventSubscriber, FeedChange, SharedEventBus};
pub use ports::{
    DeliverRequest, ImageError, ImageVerifier, JobQueue, NoOpImageVerifier, NoOpJobQueue,
    ObjectResolver, ResolveError, SharedImageVerifier, SharedJobQueue, SharedResolver,
};
pub use services::{
    interaction_allowed, is_due, parse_actor, parse_object, AccountError, AccountPatch,
    AccountService, ArticleDraft, CountsRefresher, FeedItem, FeedKind, FeedPage, FeedService,
    ModerationService, ParsedActor, ParsedObject, PostError, PostService, RefreshSummary,
};
