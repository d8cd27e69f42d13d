//! Create activity.

use activitypub_federation::kinds::activity::CreateType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// `ActivityPub` Create activity. The created object arrives embedded.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    #[serde(rename = "type")]
    pub kind: CreateType,
    pub id: Url,
    pub actor: Url,
    pub object: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<Url>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<Url>>,
}

impl CreateActivity {
    /// Create a new Create activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: Value) -> Self {
        Self {
            kind: CreateType::Create,
            id,
            actor,
            object,
            published: None,
            to: None,
            cc: None,
        }
    }

    /// The created object's IRI.
    #[must_use]
    pub fn object_id(&self) -> Option<Url> {
        self.object
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Url::parse(s).ok())
    }

    /// The created object's `attributedTo` IRI.
    #[must_use]
    pub fn attribution_id(&self) -> Option<Url> {
        let attributed = self.object.get("attributedTo")?;
        let iri = if let Some(s) = attributed.as_str() {
            s
        } else if let Some(arr) = attributed.as_array() {
            arr.first()?.as_str()?
        } else {
            attributed.get("id")?.as_str()?
        };
        Url::parse(iri).ok()
    }
}
