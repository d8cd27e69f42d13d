//! Durable job queue for ghostpub: delivery and inbox workers over
//! apalis + Redis, error classification, retry-topic routing, Pub/Sub
//! push endpoints, and the counts-refresh scheduler.

pub mod classifier;
pub mod jobs;
pub mod kv_redis;
pub mod push;
pub mod queue_impl;
pub mod retry;
pub mod scheduler;
pub mod workers;

pub use classifier::{classify, delivery_failure_message, ErrorClass};
pub use jobs::{DeliverJob, InboxJob};
pub use kv_redis::RedisObjectStore;
pub use push::{fedify_push_handler, ghost_push_handler, PushEnvelope, PushQuery, PushState};
pub use queue_impl::RedisJobQueue;
pub use retry::{route_failure, FailureRoute, RetryConfig};
pub use scheduler::{run_scheduler, CountsRefreshJob, SchedulerConfig};
pub use workers::{deliver_worker, inbox_worker, run_deliver, run_inbox, DeliverContext, InboxContext};
