//! Update activity.

use activitypub_federation::kinds::activity::UpdateType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// `ActivityPub` Update activity. The updated object arrives embedded.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivity {
    #[serde(rename = "type")]
    pub kind: UpdateType,
    pub id: Url,
    pub actor: Url,
    pub object: Value,
}

impl UpdateActivity {
    /// Create a new Update activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: Value) -> Self {
        Self {
            kind: UpdateType::Update,
            id,
            actor,
            object,
        }
    }

    /// The updated object's IRI.
    #[must_use]
    pub fn object_id(&self) -> Option<Url> {
        self.object
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Url::parse(s).ok())
    }

    /// The updated object's `type`.
    #[must_use]
    pub fn object_type(&self) -> Option<&str> {
        self.object.get("type").and_then(Value::as_str)
    }
}
