//! Delete activity.

use activitypub_federation::kinds::activity::DeleteType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;

/// `ActivityPub` Delete activity.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteActivity {
    #[serde(rename = "type")]
    pub kind: DeleteType,
    pub id: Url,
    pub actor: Url,
    pub object: ObjectRef,
}

impl DeleteActivity {
    /// Create a new Delete activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: ObjectRef) -> Self {
        Self {
            kind: DeleteType::Delete,
            id,
            actor,
            object,
        }
    }
}
