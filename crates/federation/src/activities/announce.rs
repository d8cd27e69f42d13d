//! Announce activity.

use activitypub_federation::kinds::activity::AnnounceType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;

/// `ActivityPub` Announce activity: a repost, or (from group actors) a
/// re-announcement of an inner Create.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceActivity {
    #[serde(rename = "type")]
    pub kind: AnnounceType,
    pub id: Url,
    pub actor: Url,
    pub object: ObjectRef,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<Url>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<Url>>,
}

impl AnnounceActivity {
    /// Create a new Announce activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: ObjectRef) -> Self {
        Self {
            kind: AnnounceType::Announce,
            id,
            actor,
            object,
            to: None,
            cc: None,
        }
    }
}
