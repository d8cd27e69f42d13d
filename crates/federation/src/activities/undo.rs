//! Undo activity.

use activitypub_federation::kinds::activity::UndoType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;

/// `ActivityPub` Undo activity. The undone activity is usually embedded.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoActivity {
    #[serde(rename = "type")]
    pub kind: UndoType,
    pub id: Url,
    pub actor: Url,
    pub object: ObjectRef,
}

impl UndoActivity {
    /// Create a new Undo activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: ObjectRef) -> Self {
        Self {
            kind: UndoType::Undo,
            id,
            actor,
            object,
        }
    }
}
