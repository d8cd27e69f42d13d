//! Compatibility tests: activities as other fediverse servers send them.

#![allow(clippy::unwrap_used)]

use ghostpub_federation::activities::{InboxActivity, ObjectRef};
use ghostpub_federation::{same_origin, verify_webhook_signature};
use serde_json::json;
use url::Url;

#[test]
fn test_parse_mastodon_style_follow() {
    let body = json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": "https://r.example/f/1",
        "type": "Follow",
        "actor": "https://r.example/u/alice",
        "object": "https://site.example/.ghost/activitypub/users/index"
    });

    let activity: InboxActivity = serde_json::from_value(body).unwrap();
    match activity {
        InboxActivity::Follow(follow) => {
            assert_eq!(follow.id.as_str(), "https://r.example/f/1");
            assert_eq!(follow.actor.as_str(), "https://r.example/u/alice");
            assert_eq!(
                follow.object.as_str(),
                "https://site.example/.ghost/activitypub/users/index"
            );
        }
        other => panic!("parsed as {}", other.activity_type()),
    }
}

#[test]
fn test_parse_create_with_embedded_note() {
    let body = json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": "https://r.example/create/1",
        "type": "Create",
        "actor": "https://r.example/u/bob",
        "published": "2025-06-01T10:00:00Z",
        "to": ["https://www.w3.org/ns/activitystreams#Public"],
        "object": {
            "id": "https://r.example/note/1",
            "type": "Note",
            "attributedTo": "https://r.example/u/bob",
            "content": "<p>hello fediverse</p>",
            "inReplyTo": "https://site.example/.ghost/activitypub/note/42"
        }
    });

    let activity: InboxActivity = serde_json::from_value(body).unwrap();
    match activity {
        InboxActivity::Create(create) => {
            assert_eq!(
                create.object_id().unwrap().as_str(),
                "https://r.example/note/1"
            );
            assert_eq!(
                create.attribution_id().unwrap().as_str(),
                "https://r.example/u/bob"
            );
        }
        other => panic!("parsed as {}", other.activity_type()),
    }
}

#[test]
fn test_parse_announce_with_iri_object() {
    let body = json!({
        "id": "https://r.example/announce/1",
        "type": "Announce",
        "actor": "https://r.example/u/carol",
        "object": "https://site.example/.ghost/activitypub/article/abc"
    });

    let activity: InboxActivity = serde_json::from_value(body).unwrap();
    match activity {
        InboxActivity::Announce(announce) => {
            assert!(matches!(announce.object, ObjectRef::Iri(_)));
            assert_eq!(
                announce.object.id().unwrap().as_str(),
                "https://site.example/.ghost/activitypub/article/abc"
            );
            assert!(announce.object.embedded().is_none());
        }
        other => panic!("parsed as {}", other.activity_type()),
    }
}

#[test]
fn test_parse_group_announce_with_embedded_create() {
    let body = json!({
        "id": "https://forum.example/announce/1",
        "type": "Announce",
        "actor": "https://forum.example/u/lounge",
        "object": {
            "id": "https://forum.example/create/9",
            "type": "Create",
            "actor": "https://forum.example/u/poster",
            "object": {
                "id": "https://forum.example/note/9",
                "type": "Note",
                "attributedTo": "https://forum.example/u/poster",
                "content": "relayed"
            }
        }
    });

    let activity: InboxActivity = serde_json::from_value(body).unwrap();
    match activity {
        InboxActivity::Announce(announce) => {
            assert_eq!(announce.object.embedded_type(), Some("Create"));
        }
        other => panic!("parsed as {}", other.activity_type()),
    }
}

#[test]
fn test_parse_undo_with_embedded_follow() {
    let body = json!({
        "id": "https://r.example/undo/1",
        "type": "Undo",
        "actor": "https://r.example/u/alice",
        "object": {
            "id": "https://r.example/f/1",
            "type": "Follow",
            "actor": "https://r.example/u/alice",
            "object": "https://site.example/.ghost/activitypub/users/index"
        }
    });

    let activity: InboxActivity = serde_json::from_value(body).unwrap();
    match activity {
        InboxActivity::Undo(undo) => {
            assert_eq!(undo.object.embedded_type(), Some("Follow"));
        }
        other => panic!("parsed as {}", other.activity_type()),
    }
}

#[test]
fn test_parse_delete_with_tombstone_object() {
    let body = json!({
        "id": "https://r.example/delete/1",
        "type": "Delete",
        "actor": "https://r.example/u/bob",
        "object": {
            "id": "https://r.example/note/77",
            "type": "Tombstone"
        }
    });

    let activity: InboxActivity = serde_json::from_value(body).unwrap();
    match activity {
        InboxActivity::Delete(delete) => {
            assert_eq!(
                delete.object.id().unwrap().as_str(),
                "https://r.example/note/77"
            );
        }
        other => panic!("parsed as {}", other.activity_type()),
    }
}

#[test]
fn test_unknown_activity_type_is_tolerated() {
    let body = json!({
        "id": "https://r.example/x/1",
        "type": "Arrive",
        "actor": "https://r.example/u/alice"
    });

    let activity: InboxActivity = serde_json::from_value(body).unwrap();
    assert_eq!(activity.activity_type(), "Unknown");
    assert!(activity.actor().is_none());
}

#[test]
fn test_cross_origin_create_object_is_detectable() {
    // The handler drops a Create whose object lives on another host.
    let object = Url::parse("https://evil.example/note/1").unwrap();
    let actor = Url::parse("https://r.example/u/bob").unwrap();
    assert!(!same_origin(&object, &actor));
}

#[test]
fn test_activity_round_trips_byte_equal() {
    // Stored activity JSON must serve back unchanged.
    let body = json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": "https://site.example/.ghost/activitypub/create/abc",
        "type": "Create",
        "actor": "https://site.example/.ghost/activitypub/users/index",
        "object": {
            "id": "https://site.example/.ghost/activitypub/note/def",
            "type": "Note",
            "content": "<p>hi</p>"
        }
    });

    let first = serde_json::to_string(&body).unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&first).unwrap();
    let second = serde_json::to_string(&reparsed).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_webhook_signature_header_format() {
    // The publish webhook signs `body + timestamp` and embeds both parts
    // in one header.
    let now = chrono::Utc::now();
    let body = br#"{"post":{"current":{"title":"x"}}}"#;

    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(b"secret").unwrap();
    mac.update(body);
    mac.update(now.timestamp_millis().to_string().as_bytes());
    let header = format!(
        "sha256={}, t={}",
        hex::encode(mac.finalize().into_bytes()),
        now.timestamp_millis()
    );

    assert!(verify_webhook_signature("secret", body, &header, now));
    assert!(!verify_webhook_signature("wrong", body, &header, now));
}
