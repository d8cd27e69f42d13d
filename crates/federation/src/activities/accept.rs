//! Accept activity.

use activitypub_federation::kinds::activity::AcceptType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;

/// `ActivityPub` Accept activity. The object is the accepted Follow,
/// usually embedded.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptActivity {
    #[serde(rename = "type")]
    pub kind: AcceptType,
    pub id: Url,
    pub actor: Url,
    pub object: ObjectRef,
}

impl AcceptActivity {
    /// Create a new Accept activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: ObjectRef) -> Self {
        Self {
            kind: AcceptType::Accept,
            id,
            actor,
            object,
        }
    }
}
