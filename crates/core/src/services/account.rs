//! Account service.
//!
//! Ensures accounts exist for `ActivityPub` IRIs (locally provisioned or
//! lazily created from remote actor documents), maintains follow edges,
//! and resolves key material for internal accounts.

use chrono::Utc;
use ghostpub_common::{
    generate_rsa_keypair, keypair_to_jwk, sha256_hex, ApUrls, AppError, AppResult, JwkPair,
    RsaKeypair,
};
use ghostpub_db::entities::{account, notification::NotificationKind, site};
use ghostpub_db::repositories::{
    AccountRepository, FollowRepository, NotificationRepository, SiteRepository,
};
use sea_orm::{NotSet, Set};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::events::{DomainEvent, SharedEventBus};
use crate::ports::{ResolveError, SharedResolver};

/// Account resolution failures.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("not-found")]
    NotFound,
    #[error("invalid-type: {0}")]
    InvalidType(String),
    #[error("invalid-data: {0}")]
    InvalidData(String),
    #[error("network-failure: {0}")]
    NetworkFailure(String),
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ResolveError> for AccountError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(_) => Self::NotFound,
            ResolveError::InvalidType(t) => Self::InvalidType(t),
            ResolveError::InvalidData(d) => Self::InvalidData(d),
            ResolveError::NetworkFailure(e) | ResolveError::UpstreamError(e) => {
                Self::NetworkFailure(e)
            }
        }
    }
}

/// Actor document fields this service persists.
#[derive(Debug, Clone)]
pub struct ParsedActor {
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_image_url: Option<String>,
    pub inbox: String,
    pub shared_inbox: Option<String>,
    pub outbox: Option<String>,
    pub followers: Option<String>,
    pub following: Option<String>,
    pub liked: Option<String>,
    pub public_key_pem: Option<String>,
    pub is_group: bool,
}

const ACTOR_TYPES: &[&str] = &["Person", "Service", "Application", "Group", "Organization"];

/// Parse an actor document into the fields persisted on an account row.
pub fn parse_actor(json: &Value) -> Result<ParsedActor, AccountError> {
    let actor_type = json
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AccountError::InvalidData("Actor missing type".to_string()))?;

    if !ACTOR_TYPES.contains(&actor_type) {
        return Err(AccountError::InvalidType(actor_type.to_string()));
    }

    let username = json
        .get("preferredUsername")
        .and_then(Value::as_str)
        .ok_or_else(|| AccountError::InvalidData("Actor missing preferredUsername".to_string()))?
        .to_string();

    let inbox = json
        .get("inbox")
        .and_then(Value::as_str)
        .ok_or_else(|| AccountError::InvalidData("Actor missing inbox".to_string()))?
        .to_string();

    let shared_inbox = json
        .get("endpoints")
        .and_then(|e| e.get("sharedInbox"))
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| {
            json.get("sharedInbox")
                .and_then(Value::as_str)
                .map(String::from)
        });

    let public_key_pem = json
        .get("publicKey")
        .and_then(|pk| pk.get("publicKeyPem"))
        .and_then(Value::as_str)
        .map(String::from);

    Ok(ParsedActor {
        username,
        name: json.get("name").and_then(Value::as_str).map(String::from),
        bio: json
            .get("summary")
            .and_then(Value::as_str)
            .map(String::from),
        url: json.get("url").and_then(Value::as_str).map(String::from),
        avatar_url: image_url(json.get("icon")),
        banner_image_url: image_url(json.get("image")),
        inbox,
        shared_inbox,
        outbox: json.get("outbox").and_then(Value::as_str).map(String::from),
        followers: json
            .get("followers")
            .and_then(Value::as_str)
            .map(String::from),
        following: json
            .get("following")
            .and_then(Value::as_str)
            .map(String::from),
        liked: json.get("liked").and_then(Value::as_str).map(String::from),
        public_key_pem,
        is_group: actor_type == "Group",
    })
}

/// Icon/image fields arrive as objects or bare strings.
fn image_url(value: Option<&Value>) -> Option<String> {
    let value = value?;
    if value.is_object() {
        value
            .get("url")
            .and_then(Value::as_str)
            .map(String::from)
    } else {
        value.as_str().map(String::from)
    }
}

/// Account service for business logic.
#[derive(Clone)]
pub struct AccountService {
    account_repo: AccountRepository,
    site_repo: SiteRepository,
    follow_repo: FollowRepository,
    notification_repo: NotificationRepository,
    resolver: SharedResolver,
    urls: ApUrls,
    bus: SharedEventBus,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(
        account_repo: AccountRepository,
        site_repo: SiteRepository,
        follow_repo: FollowRepository,
        notification_repo: NotificationRepository,
        resolver: SharedResolver,
        urls: ApUrls,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            account_repo,
            site_repo,
            follow_repo,
            notification_repo,
            resolver,
            urls,
            bus,
        }
    }

    /// Look up an account by IRI without touching the network.
    pub async fn get_by_ap_id(&self, ap_id: &Url) -> AppResult<Option<account::Model>> {
        self.account_repo.find_by_ap_id(ap_id.as_str()).await
    }

    /// Look up an account by IRI, fetching and persisting the remote
    /// actor on first reference. Idempotent and race-safe: the unique
    /// `ap_id_hash` index collapses concurrent inserts.
    pub async fn ensure_by_ap_id(&self, ap_id: &Url) -> Result<account::Model, AccountError> {
        if let Some(existing) = self.account_repo.find_by_ap_id(ap_id.as_str()).await? {
            debug!(ap_id = %ap_id, "Account already known");
            return Ok(existing);
        }

        info!(ap_id = %ap_id, "Fetching remote actor");
        let actor_json = self
            .resolver
            .lookup_actor(ap_id)
            .await?
            .ok_or(AccountError::NotFound)?;

        let parsed = parse_actor(&actor_json)?;
        let domain = ap_id
            .host_str()
            .ok_or_else(|| AccountError::InvalidData("Actor IRI has no host".to_string()))?
            .to_string();

        let model = account::ActiveModel {
            id: NotSet,
            uuid: Set(Uuid::new_v4().to_string()),
            username: Set(parsed.username),
            name: Set(parsed.name),
            bio: Set(parsed.bio),
            url: Set(parsed.url),
            avatar_url: Set(parsed.avatar_url),
            banner_image_url: Set(parsed.banner_image_url),
            ap_id: Set(ap_id.to_string()),
            ap_id_hash: Set(sha256_hex(ap_id.as_str())),
            ap_inbox: Set(Some(parsed.inbox)),
            ap_shared_inbox: Set(parsed.shared_inbox),
            ap_outbox: Set(parsed.outbox),
            ap_followers: Set(parsed.followers),
            ap_following: Set(parsed.following),
            ap_liked: Set(parsed.liked),
            public_key: Set(parsed.public_key_pem),
            private_key: Set(None),
            domain: Set(domain.clone()),
            domain_hash: Set(sha256_hex(&domain)),
            custom_fields: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let account = self
            .account_repo
            .create_or_existing(model, ap_id.as_str())
            .await?;

        info!(
            account_id = account.id,
            username = %account.username,
            domain = %account.domain,
            "Created external account"
        );

        Ok(account)
    }

    /// Ensure a site's default internal account exists, generating its
    /// key pair on first creation.
    pub async fn ensure_internal_account(
        &self,
        site: &site::Model,
        handle: &str,
    ) -> AppResult<account::Model> {
        if let Some(existing) = self.site_repo.find_default_account(site.id).await? {
            return Ok(existing);
        }

        let ap_id = self.urls.actor(handle)?;
        let RsaKeypair {
            public_key_pem,
            private_key_pem,
        } = generate_rsa_keypair()?;

        let model = account::ActiveModel {
            id: NotSet,
            uuid: Set(Uuid::new_v4().to_string()),
            username: Set(handle.to_string()),
            name: Set(None),
            bio: Set(None),
            url: Set(Some(self.urls.base_url().to_string())),
            avatar_url: Set(None),
            banner_image_url: Set(None),
            ap_id: Set(ap_id.to_string()),
            ap_id_hash: Set(sha256_hex(ap_id.as_str())),
            ap_inbox: Set(Some(self.urls.inbox(handle)?.to_string())),
            ap_shared_inbox: Set(Some(self.urls.shared_inbox()?.to_string())),
            ap_outbox: Set(Some(self.urls.outbox(handle)?.to_string())),
            ap_followers: Set(Some(self.urls.followers(handle)?.to_string())),
            ap_following: Set(Some(self.urls.following(handle)?.to_string())),
            ap_liked: Set(Some(self.urls.liked(handle)?.to_string())),
            public_key: Set(Some(public_key_pem)),
            private_key: Set(Some(private_key_pem)),
            domain: Set(self.urls.host().to_string()),
            domain_hash: Set(sha256_hex(self.urls.host())),
            custom_fields: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let account = self
            .account_repo
            .create_or_existing(model, ap_id.as_str())
            .await?;
        self.site_repo.create_user(account.id, site.id).await?;

        info!(
            account_id = account.id,
            handle = %handle,
            site = %site.host,
            "Provisioned internal account"
        );

        Ok(account)
    }

    /// Record a follow edge. Duplicate edges are ignored; new edges emit
    /// `account.followed` and notify an internal followee.
    pub async fn follow_account(
        &self,
        follower: &account::Model,
        followee: &account::Model,
    ) -> AppResult<bool> {
        let created = self
            .follow_repo
            .create_if_absent(follower.id, followee.id)
            .await?;

        if !created {
            debug!(
                follower = follower.id,
                followee = followee.id,
                "Follow edge already present"
            );
            return Ok(false);
        }

        if let Some(user) = self.account_repo.find_user_for_account(followee.id).await? {
            self.notification_repo
                .create(user.id, follower.id, NotificationKind::Follow, None)
                .await?;
        }

        self.bus
            .publish(&DomainEvent::AccountFollowed {
                follower_id: follower.id,
                following_id: followee.id,
            })
            .await;

        Ok(true)
    }

    /// Remove a follow edge. Emits `account.unfollowed` when an edge was
    /// actually present.
    pub async fn record_account_unfollow(
        &self,
        followee: &account::Model,
        unfollower: &account::Model,
    ) -> AppResult<bool> {
        let removed = self
            .follow_repo
            .delete_by_pair(unfollower.id, followee.id)
            .await?;

        if removed {
            self.bus
                .publish(&DomainEvent::AccountUnfollowed {
                    follower_id: unfollower.id,
                    following_id: followee.id,
                })
                .await;
        }

        Ok(removed)
    }

    /// JWK key pair for an internal account.
    pub async fn get_key_pair(&self, account_id: i64) -> AppResult<JwkPair> {
        let account = self
            .account_repo
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        let (Some(public_key_pem), Some(private_key_pem)) =
            (account.public_key, account.private_key)
        else {
            return Err(AppError::Forbidden(
                "Key pairs exist for internal accounts only".to_string(),
            ));
        };

        keypair_to_jwk(&RsaKeypair {
            public_key_pem,
            private_key_pem,
        })
    }

    /// Apply a local profile update and emit `account.updated`.
    pub async fn update_account_profile(
        &self,
        account: &account::Model,
        patch: AccountPatch,
    ) -> AppResult<account::Model> {
        let mut active: account::ActiveModel = account.clone().into();
        if let Some(name) = patch.name {
            active.name = Set(Some(name));
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(avatar_url) = patch.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        if let Some(banner_image_url) = patch.banner_image_url {
            active.banner_image_url = Set(Some(banner_image_url));
        }
        if let Some(url) = patch.url {
            active.url = Set(Some(url));
        }
        if let Some(custom_fields) = patch.custom_fields {
            active.custom_fields = Set(Some(custom_fields));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = self.account_repo.update(active).await?;

        self.bus
            .publish(&DomainEvent::AccountUpdated {
                account: updated.clone(),
            })
            .await;

        Ok(updated)
    }

    /// Refresh an external account's columns from a remote actor document.
    pub async fn update_from_remote_actor(
        &self,
        account: &account::Model,
        actor_json: &Value,
    ) -> Result<account::Model, AccountError> {
        let parsed = parse_actor(actor_json)?;

        let mut active: account::ActiveModel = account.clone().into();
        active.username = Set(parsed.username);
        active.name = Set(parsed.name);
        active.bio = Set(parsed.bio);
        active.url = Set(parsed.url);
        active.avatar_url = Set(parsed.avatar_url);
        active.banner_image_url = Set(parsed.banner_image_url);
        active.ap_inbox = Set(Some(parsed.inbox));
        active.ap_shared_inbox = Set(parsed.shared_inbox);
        active.ap_outbox = Set(parsed.outbox);
        active.ap_followers = Set(parsed.followers);
        active.ap_following = Set(parsed.following);
        active.ap_liked = Set(parsed.liked);
        if parsed.public_key_pem.is_some() {
            active.public_key = Set(parsed.public_key_pem);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(self.account_repo.update(active).await?)
    }

    /// Accounts the given account follows, offset-paged (dispatcher
    /// snapshot shape).
    pub async fn get_following_accounts(
        &self,
        account: &account::Model,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        self.follow_repo
            .following_accounts(account.id, limit, offset)
            .await
    }

    /// Followers of the account, bounded (delivery recipient shape).
    pub async fn get_follower_accounts(
        &self,
        account: &account::Model,
        limit: u64,
    ) -> AppResult<Vec<account::Model>> {
        self.follow_repo.follower_accounts(account.id, limit).await
    }

    /// Follower count.
    pub async fn get_follower_accounts_count(&self, account: &account::Model) -> AppResult<u64> {
        self.follow_repo.count_followers(account.id).await
    }

    /// Following count.
    pub async fn get_following_accounts_count(&self, account: &account::Model) -> AppResult<u64> {
        self.follow_repo.count_following(account.id).await
    }
}

/// Mutable profile fields.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_image_url: Option<String>,
    pub url: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_actor_full() {
        let json = json!({
            "id": "https://r.example/u/alice",
            "type": "Person",
            "preferredUsername": "alice",
            "name": "Alice",
            "summary": "A writer",
            "inbox": "https://r.example/u/alice/inbox",
            "outbox": "https://r.example/u/alice/outbox",
            "followers": "https://r.example/u/alice/followers",
            "endpoints": { "sharedInbox": "https://r.example/inbox" },
            "publicKey": {
                "id": "https://r.example/u/alice#main-key",
                "publicKeyPem": "-----BEGIN PUBLIC KEY-----\nMIIB\n-----END PUBLIC KEY-----"
            },
            "icon": { "type": "Image", "url": "https://r.example/a.png" },
            "image": "https://r.example/b.png"
        });

        let actor = parse_actor(&json).unwrap();

        assert_eq!(actor.username, "alice");
        assert_eq!(actor.name.as_deref(), Some("Alice"));
        assert_eq!(actor.inbox, "https://r.example/u/alice/inbox");
        assert_eq!(actor.shared_inbox.as_deref(), Some("https://r.example/inbox"));
        assert_eq!(actor.avatar_url.as_deref(), Some("https://r.example/a.png"));
        assert_eq!(
            actor.banner_image_url.as_deref(),
            Some("https://r.example/b.png")
        );
        assert!(actor.public_key_pem.is_some());
        assert!(!actor.is_group);
    }

    #[test]
    fn test_parse_actor_group() {
        let json = json!({
            "type": "Group",
            "preferredUsername": "lounge",
            "inbox": "https://forum.example/inbox"
        });

        let actor = parse_actor(&json).unwrap();
        assert!(actor.is_group);
    }

    #[test]
    fn test_parse_actor_rejects_non_actor_type() {
        let json = json!({
            "type": "Note",
            "preferredUsername": "x",
            "inbox": "https://r.example/inbox"
        });

        match parse_actor(&json) {
            Err(AccountError::InvalidType(t)) => assert_eq!(t, "Note"),
            other => panic!("expected InvalidType, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_actor_requires_username_and_inbox() {
        let json = json!({ "type": "Person", "inbox": "https://r.example/inbox" });
        assert!(matches!(
            parse_actor(&json),
            Err(AccountError::InvalidData(_))
        ));

        let json = json!({ "type": "Person", "preferredUsername": "a" });
        assert!(matches!(
            parse_actor(&json),
            Err(AccountError::InvalidData(_))
        ));
    }
}
