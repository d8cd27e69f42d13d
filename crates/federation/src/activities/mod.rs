//! `ActivityPub` activity types.

#![allow(missing_docs)]

mod accept;
mod announce;
mod create;
mod delete;
mod follow;
mod like;
mod reject;
mod undo;
mod update;

pub use accept::AcceptActivity;
pub use announce::AnnounceActivity;
pub use create::CreateActivity;
pub use delete::DeleteActivity;
pub use follow::FollowActivity;
pub use like::LikeActivity;
pub use reject::RejectActivity;
pub use undo::UndoActivity;
pub use update::UpdateActivity;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// The standard `ActivityStreams` context IRI.
pub const ACTIVITYSTREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// An activity's object: a bare IRI or an embedded document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Iri(Url),
    Embedded(Box<Value>),
}

impl ObjectRef {
    /// The object's IRI, from either form.
    #[must_use]
    pub fn id(&self) -> Option<Url> {
        match self {
            Self::Iri(url) => Some(url.clone()),
            Self::Embedded(value) => value
                .get("id")
                .and_then(Value::as_str)
                .and_then(|s| Url::parse(s).ok()),
        }
    }

    /// The embedded document, if present.
    #[must_use]
    pub fn embedded(&self) -> Option<&Value> {
        match self {
            Self::Iri(_) => None,
            Self::Embedded(value) => Some(value),
        }
    }

    /// The embedded document's `type`, if present.
    #[must_use]
    pub fn embedded_type(&self) -> Option<&str> {
        self.embedded()?.get("type")?.as_str()
    }
}

/// Wrapper for incoming activities of any supported kind.
///
/// The `type` markers make untagged deserialization unambiguous; anything
/// else lands in `Unknown`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InboxActivity {
    Create(CreateActivity),
    Delete(DeleteActivity),
    Follow(FollowActivity),
    Accept(AcceptActivity),
    Reject(RejectActivity),
    Like(LikeActivity),
    Undo(UndoActivity),
    Update(UpdateActivity),
    Announce(AnnounceActivity),
    Unknown(Value),
}

impl InboxActivity {
    /// The activity type as a string.
    #[must_use]
    pub const fn activity_type(&self) -> &'static str {
        match self {
            Self::Create(_) => "Create",
            Self::Delete(_) => "Delete",
            Self::Follow(_) => "Follow",
            Self::Accept(_) => "Accept",
            Self::Reject(_) => "Reject",
            Self::Like(_) => "Like",
            Self::Undo(_) => "Undo",
            Self::Update(_) => "Update",
            Self::Announce(_) => "Announce",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// The actor IRI.
    #[must_use]
    pub const fn actor(&self) -> Option<&Url> {
        match self {
            Self::Create(a) => Some(&a.actor),
            Self::Delete(a) => Some(&a.actor),
            Self::Follow(a) => Some(&a.actor),
            Self::Accept(a) => Some(&a.actor),
            Self::Reject(a) => Some(&a.actor),
            Self::Like(a) => Some(&a.actor),
            Self::Undo(a) => Some(&a.actor),
            Self::Update(a) => Some(&a.actor),
            Self::Announce(a) => Some(&a.actor),
            Self::Unknown(_) => None,
        }
    }
}
