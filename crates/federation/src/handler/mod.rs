//! HTTP dispatchers for the federation surface.

#![allow(missing_docs)]

mod actor;
mod collections;
mod inbox;
mod nodeinfo;
mod objects;
mod webfinger;
mod webhook;

pub use actor::{actor_handler, ActorState, ACTIVITY_JSON};
pub use collections::{
    followers_handler, following_handler, liked_handler, outbox_handler, CollectionQuery,
    CollectionState,
};
pub use inbox::{inbox_handler, InboxState};
pub use nodeinfo::{nodeinfo_2_1, well_known_nodeinfo, NodeInfoState};
pub use objects::{object_handler, ObjectState, OBJECT_KINDS};
pub use webfinger::{webfinger_handler, WebfingerQuery, WebfingerState};
pub use webhook::{
    post_published_handler, verify_webhook_signature, PostPublishedPayload, WebhookState,
};
