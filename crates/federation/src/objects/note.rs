//! Note/Article documents and their wrapping activities, built from
//! post rows.
//!
//! These builders feed the KV store at publish time and reconstitute
//! outbox items at read time. Stored documents are always served
//! verbatim; these shapes are only the source of those stored bytes.

use activitypub_federation::kinds::public;
use ghostpub_common::{ApUrls, AppResult};
use ghostpub_db::entities::{account, post};
use serde_json::{json, Value};
use url::Url;

use crate::activities::ACTIVITYSTREAMS_CONTEXT;

/// Build the Note/Article document for a post.
pub fn build_object_doc(
    post: &post::Model,
    author: &account::Model,
    urls: &ApUrls,
) -> AppResult<Value> {
    let kind = match post.kind {
        post::PostType::Article => "Article",
        post::PostType::Note => "Note",
        post::PostType::Tombstone => "Tombstone",
    };

    let to: Vec<String> = match post.audience {
        post::Audience::Public => vec![public().to_string()],
        post::Audience::FollowersOnly => {
            vec![followers_iri(author, urls)?]
        }
    };
    let cc: Vec<String> = match post.audience {
        post::Audience::Public => vec![followers_iri(author, urls)?],
        post::Audience::FollowersOnly => Vec::new(),
    };

    let mut doc = json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": post.ap_id,
        "type": kind,
        "attributedTo": author.ap_id,
        "published": post.published_at.to_rfc3339(),
        "to": to,
        "cc": cc,
        "attachment": post.attachments,
    });

    if let Some(title) = &post.title {
        doc["name"] = json!(title);
    }
    if let Some(content) = &post.content {
        doc["content"] = json!(content);
    }
    if let Some(summary) = &post.summary {
        doc["summary"] = json!(summary);
    }
    if let Some(excerpt) = &post.excerpt {
        doc["preview"] = json!({ "type": "Note", "content": excerpt });
    }
    if let Some(url) = &post.url {
        doc["url"] = json!(url);
    }
    if let Some(image_url) = &post.image_url {
        doc["image"] = json!({ "type": "Image", "url": image_url });
    }
    if let Some(updated_at) = post.updated_at {
        doc["updated"] = json!(updated_at.to_rfc3339());
    }

    Ok(doc)
}

/// Build the Tombstone shell left behind by a deletion.
#[must_use]
pub fn build_tombstone_doc(post: &post::Model) -> Value {
    json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": post.ap_id,
        "type": "Tombstone",
    })
}

/// Wrap an object document in a Create addressed to the author's
/// followers and the public collection.
pub fn build_create_doc(
    id: &Url,
    post: &post::Model,
    author: &account::Model,
    object: Value,
    urls: &ApUrls,
) -> AppResult<Value> {
    Ok(json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": id.as_str(),
        "type": "Create",
        "actor": author.ap_id,
        "published": post.published_at.to_rfc3339(),
        "to": [followers_iri(author, urls)?, public().to_string()],
        "object": object,
    }))
}

/// Build an Announce wrapping a post, for outbox reconstitution.
pub fn build_announce_doc(
    id: &Url,
    post: &post::Model,
    reposter: &account::Model,
    urls: &ApUrls,
) -> AppResult<Value> {
    Ok(json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": id.as_str(),
        "type": "Announce",
        "actor": reposter.ap_id,
        "published": post.published_at.to_rfc3339(),
        "to": [followers_iri(reposter, urls)?, public().to_string()],
        "object": post.ap_id,
    }))
}

fn followers_iri(account: &account::Model, urls: &ApUrls) -> AppResult<String> {
    match &account.ap_followers {
        Some(iri) => Ok(iri.clone()),
        None => Ok(urls.followers(&account.username)?.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ghostpub_db::entities::post::{Audience, PostType};
    use ghostpub_db::test_utils::{account_fixture, post_fixture};

    fn urls() -> ApUrls {
        ApUrls::new(Url::parse("https://site.example").unwrap())
    }

    #[test]
    fn test_note_doc_is_public() {
        let author = account_fixture(1, "https://site.example/.ghost/activitypub/users/index", "site.example");
        let post = post_fixture(1, "https://site.example/.ghost/activitypub/note/abc", 1);

        let doc = build_object_doc(&post, &author, &urls()).unwrap();

        assert_eq!(doc["type"], "Note");
        assert_eq!(doc["attributedTo"], author.ap_id);
        assert_eq!(
            doc["to"][0],
            "https://www.w3.org/ns/activitystreams#Public"
        );
    }

    #[test]
    fn test_followers_only_addressing() {
        let author = account_fixture(1, "https://site.example/.ghost/activitypub/users/index", "site.example");
        let mut post = post_fixture(1, "https://site.example/.ghost/activitypub/article/abc", 1);
        post.kind = PostType::Article;
        post.audience = Audience::FollowersOnly;
        post.title = Some("Members post".to_string());

        let doc = build_object_doc(&post, &author, &urls()).unwrap();

        assert_eq!(doc["type"], "Article");
        assert_eq!(doc["name"], "Members post");
        let to = doc["to"].as_array().unwrap();
        assert_eq!(to.len(), 1);
        assert!(to[0].as_str().unwrap().contains("/followers/"));
        assert!(doc["cc"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_create_doc_wraps_object() {
        let author = account_fixture(1, "https://site.example/.ghost/activitypub/users/index", "site.example");
        let post = post_fixture(1, "https://site.example/.ghost/activitypub/note/abc", 1);
        let object = build_object_doc(&post, &author, &urls()).unwrap();
        let create_id =
            Url::parse("https://site.example/.ghost/activitypub/create/xyz").unwrap();

        let create = build_create_doc(&create_id, &post, &author, object, &urls()).unwrap();

        assert_eq!(create["type"], "Create");
        assert_eq!(create["actor"], author.ap_id);
        assert_eq!(create["object"]["id"], post.ap_id);
    }

    #[test]
    fn test_announce_doc_references_by_iri() {
        let reposter = account_fixture(2, "https://site.example/.ghost/activitypub/users/index", "site.example");
        let post = post_fixture(1, "https://r.example/note/1", 3);
        let announce_id =
            Url::parse("https://site.example/.ghost/activitypub/announce/xyz").unwrap();

        let announce = build_announce_doc(&announce_id, &post, &reposter, &urls()).unwrap();

        assert_eq!(announce["type"], "Announce");
        assert_eq!(announce["object"], post.ap_id);
    }
}
