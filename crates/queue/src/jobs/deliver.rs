//! Delivery job.

use chrono::{DateTime, Utc};
use ghostpub_core::ports::DeliverRequest;
use serde::{Deserialize, Serialize};

/// One signed delivery of an activity to one inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverJob {
    /// The local account whose key signs the request.
    pub account_id: i64,

    /// Target inbox URL.
    pub inbox: String,

    /// Activity JSON to deliver.
    pub activity: serde_json::Value,

    /// Delivery attempt number, 1-indexed.
    #[serde(default = "first_attempt")]
    pub attempt: u32,

    /// Earliest time this job should run (retry backoff).
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,
}

const fn first_attempt() -> u32 {
    1
}

impl DeliverJob {
    /// The delivered activity's IRI, for logging and error messages.
    #[must_use]
    pub fn activity_id(&self) -> &str {
        self.activity
            .get("id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("<no id>")
    }

    /// The follow-up job for the retry topic.
    #[must_use]
    pub fn next_attempt(&self, not_before: DateTime<Utc>) -> Self {
        Self {
            account_id: self.account_id,
            inbox: self.inbox.clone(),
            activity: self.activity.clone(),
            attempt: self.attempt + 1,
            not_before: Some(not_before),
        }
    }
}

impl From<DeliverRequest> for DeliverJob {
    fn from(request: DeliverRequest) -> Self {
        Self {
            account_id: request.account_id,
            inbox: request.inbox,
            activity: request.activity,
            attempt: 1,
            not_before: None,
        }
    }
}
