//! Inbox handling job.

use serde::{Deserialize, Serialize};

/// One verified inbound activity awaiting processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxJob {
    /// The activity JSON as received.
    pub activity: serde_json::Value,
}

impl InboxJob {
    /// Create a new inbox job.
    #[must_use]
    pub const fn new(activity: serde_json::Value) -> Self {
        Self { activity }
    }
}
