//! `ActivityPub` object documents.

#![allow(missing_docs)]

mod actor;
mod note;

pub use actor::{ApActor, ApPublicKey};
pub use note::{build_announce_doc, build_create_doc, build_object_doc, build_tombstone_doc};
