//! Reject activity.

use activitypub_federation::kinds::activity::RejectType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// `ActivityPub` Reject activity, sent when a block severs a follow.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectActivity {
    #[serde(rename = "type")]
    pub kind: RejectType,
    pub id: Url,
    pub actor: Url,
    pub object: Value,
}

impl RejectActivity {
    /// Create a new Reject activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: Value) -> Self {
        Self {
            kind: RejectType::Reject,
            id,
            actor,
            object,
        }
    }
}
