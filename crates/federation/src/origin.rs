//! Origin integrity checks.
//!
//! A looked-up or embedded object is only trusted when its identifiers
//! sit on the host it claims. Mismatches discard the activity; they are
//! never retried.

use url::Url;

/// Same scheme, host, and port.
#[must_use]
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Same host only (scheme-agnostic comparisons for stored references).
#[must_use]
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str().is_some() && a.host_str() == b.host_str()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin(
            &url("https://r.example/u/alice"),
            &url("https://r.example/note/1")
        ));
        assert!(!same_origin(
            &url("https://r.example/u/alice"),
            &url("https://evil.example/note/1")
        ));
        assert!(!same_origin(
            &url("http://r.example/u/alice"),
            &url("https://r.example/u/alice")
        ));
    }

    #[test]
    fn test_same_origin_respects_ports() {
        assert!(!same_origin(
            &url("https://r.example:8443/u/alice"),
            &url("https://r.example/u/alice")
        ));
        // Explicit default port equals implicit
        assert!(same_origin(
            &url("https://r.example:443/u/alice"),
            &url("https://r.example/u/alice")
        ));
    }

    #[test]
    fn test_same_host() {
        assert!(same_host(
            &url("http://r.example/a"),
            &url("https://r.example/b")
        ));
        assert!(!same_host(
            &url("https://r.example/a"),
            &url("https://other.example/a")
        ));
    }
}
