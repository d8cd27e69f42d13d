//! `ActivityPub` URL construction for the hosted site.
//!
//! Every federation route lives under `/.ghost/activitypub/` on the site's
//! own host. Dispatchers reconstruct the same IRIs to look up stored
//! objects, so all construction goes through this one type.

use url::Url;
use uuid::Uuid;

use crate::{AppError, AppResult};

/// Root path for all federation routes.
pub const AP_BASE_PATH: &str = "/.ghost/activitypub";

/// URL builder for the site's `ActivityPub` surface.
#[derive(Debug, Clone)]
pub struct ApUrls {
    base_url: Url,
}

impl ApUrls {
    /// Create a builder for the given site base URL (scheme + host).
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// The site's base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The site's hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }

    fn join(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(&format!("{AP_BASE_PATH}/{path}"))
            .map_err(|e| AppError::Internal(format!("Failed to build AP URL: {e}")))
    }

    /// Actor document URL for a local account handle.
    pub fn actor(&self, handle: &str) -> AppResult<Url> {
        self.join(&format!("users/{handle}"))
    }

    /// Key id for a local account's public key.
    pub fn key_id(&self, handle: &str) -> AppResult<Url> {
        let mut url = self.actor(handle)?;
        url.set_fragment(Some("main-key"));
        Ok(url)
    }

    /// Per-actor inbox URL.
    pub fn inbox(&self, handle: &str) -> AppResult<Url> {
        self.join(&format!("inbox/{handle}"))
    }

    /// Shared inbox URL.
    pub fn shared_inbox(&self) -> AppResult<Url> {
        self.join("inbox")
    }

    /// Followers collection URL.
    pub fn followers(&self, handle: &str) -> AppResult<Url> {
        self.join(&format!("followers/{handle}"))
    }

    /// Following collection URL.
    pub fn following(&self, handle: &str) -> AppResult<Url> {
        self.join(&format!("following/{handle}"))
    }

    /// Outbox collection URL.
    pub fn outbox(&self, handle: &str) -> AppResult<Url> {
        self.join(&format!("outbox/{handle}"))
    }

    /// Liked collection URL.
    pub fn liked(&self, handle: &str) -> AppResult<Url> {
        self.join(&format!("liked/{handle}"))
    }

    /// URL of a stored object of the given kind (`article`, `note`,
    /// `create`, `accept`, ...) and identifier.
    pub fn object(&self, kind: &str, id: &str) -> AppResult<Url> {
        self.join(&format!("{kind}/{id}"))
    }

    /// Mint a fresh object URL of the given kind with a UUIDv4 identifier.
    pub fn new_object(&self, kind: &str) -> AppResult<Url> {
        self.object(kind, &Uuid::new_v4().to_string())
    }

    /// True if the given IRI is on this site's host.
    #[must_use]
    pub fn is_local(&self, iri: &Url) -> bool {
        iri.host_str() == self.base_url.host_str()
    }

    /// Extract the account handle from a local actor URL.
    pub fn handle_from_actor(&self, iri: &Url) -> AppResult<String> {
        let prefix = format!("{AP_BASE_PATH}/users/");
        iri.path()
            .strip_prefix(&prefix)
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(String::from)
            .ok_or_else(|| {
                AppError::BadRequest(format!("Cannot extract account handle from URL: {iri}"))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn urls() -> ApUrls {
        ApUrls::new(Url::parse("https://site.example").unwrap())
    }

    #[test]
    fn test_actor_url() {
        assert_eq!(
            urls().actor("index").unwrap().as_str(),
            "https://site.example/.ghost/activitypub/users/index"
        );
    }

    #[test]
    fn test_key_id() {
        assert_eq!(
            urls().key_id("index").unwrap().as_str(),
            "https://site.example/.ghost/activitypub/users/index#main-key"
        );
    }

    #[test]
    fn test_object_url() {
        assert_eq!(
            urls().object("create", "abc-123").unwrap().as_str(),
            "https://site.example/.ghost/activitypub/create/abc-123"
        );
    }

    #[test]
    fn test_new_object_is_unique() {
        let a = urls().new_object("accept").unwrap();
        let b = urls().new_object("accept").unwrap();
        assert_ne!(a, b);
        assert!(a
            .as_str()
            .starts_with("https://site.example/.ghost/activitypub/accept/"));
    }

    #[test]
    fn test_handle_from_actor() {
        let urls = urls();
        let actor = urls.actor("index").unwrap();
        assert_eq!(urls.handle_from_actor(&actor).unwrap(), "index");

        let bad = Url::parse("https://site.example/users/index").unwrap();
        assert!(urls.handle_from_actor(&bad).is_err());
    }

    #[test]
    fn test_is_local() {
        let urls = urls();
        assert!(urls.is_local(&Url::parse("https://site.example/anything").unwrap()));
        assert!(!urls.is_local(&Url::parse("https://other.example/anything").unwrap()));
    }
}
