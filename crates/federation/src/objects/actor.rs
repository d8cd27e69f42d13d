//! Actor document built from an account row.

use ghostpub_common::{ApUrls, AppError, AppResult};
use ghostpub_db::entities::account;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

/// An actor's public key entry.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApPublicKey {
    pub id: Url,
    pub owner: Url,
    pub public_key_pem: String,
}

/// `ActivityPub` actor document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApActor {
    #[serde(rename = "@context")]
    pub context: Value,
    pub id: Url,
    #[serde(rename = "type")]
    pub kind: String,
    pub preferred_username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub inbox: Url,
    pub outbox: Url,
    pub followers: Url,
    pub following: Url,
    pub liked: Url,
    pub endpoints: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    pub public_key: ApPublicKey,
    pub manually_approves_followers: bool,
}

impl ApActor {
    /// Build the actor document for an internal account.
    pub fn from_internal_account(account: &account::Model, urls: &ApUrls) -> AppResult<Self> {
        let handle = &account.username;
        let id = urls.actor(handle)?;
        let public_key_pem = account
            .public_key
            .clone()
            .ok_or_else(|| AppError::Internal(format!("Account {} has no key", account.id)))?;

        Ok(Self {
            context: json!([
                "https://www.w3.org/ns/activitystreams",
                "https://w3id.org/security/v1"
            ]),
            id: id.clone(),
            kind: "Person".to_string(),
            preferred_username: handle.clone(),
            name: account.name.clone(),
            summary: account.bio.clone(),
            url: account.url.clone(),
            inbox: urls.inbox(handle)?,
            outbox: urls.outbox(handle)?,
            followers: urls.followers(handle)?,
            following: urls.following(handle)?,
            liked: urls.liked(handle)?,
            endpoints: json!({ "sharedInbox": urls.shared_inbox()?.as_str() }),
            icon: account
                .avatar_url
                .as_ref()
                .map(|u| json!({ "type": "Image", "url": u })),
            image: account
                .banner_image_url
                .as_ref()
                .map(|u| json!({ "type": "Image", "url": u })),
            public_key: ApPublicKey {
                id: urls.key_id(handle)?,
                owner: id,
                public_key_pem,
            },
            manually_approves_followers: false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ghostpub_db::test_utils::internal_account_fixture;

    #[test]
    fn test_actor_document_shape() {
        let mut account =
            internal_account_fixture(1, "https://site.example/.ghost/activitypub/users/index", "site.example");
        account.username = "index".to_string();
        let urls = ApUrls::new(Url::parse("https://site.example").unwrap());

        let actor = ApActor::from_internal_account(&account, &urls).unwrap();
        let value = serde_json::to_value(&actor).unwrap();

        assert_eq!(
            value["id"],
            "https://site.example/.ghost/activitypub/users/index"
        );
        assert_eq!(value["type"], "Person");
        assert_eq!(value["preferredUsername"], "index");
        assert_eq!(
            value["publicKey"]["id"],
            "https://site.example/.ghost/activitypub/users/index#main-key"
        );
        assert_eq!(
            value["endpoints"]["sharedInbox"],
            "https://site.example/.ghost/activitypub/inbox"
        );
        assert!(value["publicKey"]["publicKeyPem"]
            .as_str()
            .unwrap()
            .contains("PUBLIC KEY"));
    }

    #[test]
    fn test_actor_requires_public_key() {
        let mut account = internal_account_fixture(1, "https://site.example/u/index", "site.example");
        account.public_key = None;
        let urls = ApUrls::new(Url::parse("https://site.example").unwrap());

        assert!(ApActor::from_internal_account(&account, &urls).is_err());
    }
}
