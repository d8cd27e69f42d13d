//! Federation layer for ghostpub: `ActivityPub` types, the resolver,
//! inbox processors, the delivery bridge, and HTTP dispatchers.

pub mod activities;
pub mod bridge;
pub mod handler;
pub mod jwks;
pub mod middleware;
pub mod objects;
pub mod origin;
pub mod processor;
pub mod resolver;
pub mod sender;

pub use activities::{
    AcceptActivity, AnnounceActivity, CreateActivity, DeleteActivity, FollowActivity,
    InboxActivity, LikeActivity, ObjectRef, RejectActivity, UndoActivity, UpdateActivity,
    ACTIVITYSTREAMS_CONTEXT,
};
pub use bridge::DeliveryBridge;
pub use handler::{
    actor_handler, followers_handler, following_handler, inbox_handler, liked_handler,
    nodeinfo_2_1, object_handler, outbox_handler, post_published_handler,
    verify_webhook_signature, webfinger_handler, well_known_nodeinfo, ActorState,
    CollectionState, InboxState, NodeInfoState, ObjectState, WebfingerState, WebhookState,
};
pub use jwks::JwksCache;
pub use middleware::SignatureVerifier;
pub use objects::{ApActor, ApPublicKey};
pub use origin::{same_host, same_origin};
pub use processor::{
    AcceptProcessor, AnnounceProcessor, CreateProcessor, DeleteProcessor, FollowProcessor,
    LikeProcessor, Processors, UndoProcessor, UpdateProcessor,
};
pub use resolver::{ApResolver, FetchSigner};
pub use sender::ActivitySender;
