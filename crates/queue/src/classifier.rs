//! Delivery error classification.
//!
//! Every delivery failure is mapped onto two bits: whether the queue
//! should retry it, and whether it is our fault (reportable) or the
//! remote's (not). Remote 4xx, DNS misses, and certificate mismatches
//! stay quiet; anything unrecognized is an application fault and is
//! surfaced loudly.

use once_cell::sync::Lazy;
use regex::Regex;

/// Permanent HTTP statuses: delivery will never succeed, stop retrying.
const PERMANENT_STATUSES: &[u16] = &[400, 401, 403, 404, 405, 410, 422, 501];

#[allow(clippy::unwrap_used)] // pattern literals are verified by tests
static DNS_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"getaddrinfo (ENOTFOUND|EAI_AGAIN)").unwrap());

#[allow(clippy::unwrap_used)]
static CERT_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Hostname/IP does not match certificate's altnames").unwrap());

#[allow(clippy::unwrap_used)]
static DELIVERY_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Failed to send activity .+ to .+ \((\d{3})[^)]*\):").unwrap());

/// Classification of one delivery error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClass {
    /// Re-enqueue on the retry topic.
    pub retryable: bool,
    /// Surface to the error tracker.
    pub reportable: bool,
}

/// Classify a delivery error message.
#[must_use]
pub fn classify(message: &str) -> ErrorClass {
    if DNS_ERROR.is_match(message) || CERT_ERROR.is_match(message) {
        return ErrorClass {
            retryable: false,
            reportable: false,
        };
    }

    if let Some(captures) = DELIVERY_STATUS.captures(message) {
        let status: u16 = captures
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        // Remote status codes are never our fault.
        return ErrorClass {
            retryable: !PERMANENT_STATUSES.contains(&status),
            reportable: false,
        };
    }

    ErrorClass {
        retryable: true,
        reportable: true,
    }
}

/// Build the canonical delivery failure message for a remote status.
#[must_use]
pub fn delivery_failure_message(
    activity_id: &str,
    inbox: &str,
    status: u16,
    reason: &str,
    body: &str,
) -> String {
    format!("Failed to send activity {activity_id} to {inbox} ({status} {reason}): {body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_errors_are_silent_and_final() {
        for message in [
            "getaddrinfo ENOTFOUND mastodon.gone.example",
            "request to https://x.example failed: getaddrinfo EAI_AGAIN x.example",
        ] {
            let class = classify(message);
            assert!(!class.retryable, "{message}");
            assert!(!class.reportable, "{message}");
        }
    }

    #[test]
    fn test_cert_mismatch_is_silent_and_final() {
        let class =
            classify("Hostname/IP does not match certificate's altnames: Host: a.example");
        assert!(!class.retryable);
        assert!(!class.reportable);
    }

    #[test]
    fn test_permanent_statuses_are_not_retried() {
        for status in [400u16, 401, 403, 404, 405, 410, 422, 501] {
            let message = delivery_failure_message(
                "https://site.example/.ghost/activitypub/create/1",
                "https://r.example/inbox",
                status,
                "Some Reason",
                "",
            );
            let class = classify(&message);
            assert!(!class.retryable, "status {status}");
            assert!(!class.reportable, "status {status}");
        }
    }

    #[test]
    fn test_gone_is_acked_not_retried_not_reported() {
        let message = delivery_failure_message(
            "https://site.example/.ghost/activitypub/create/1",
            "https://r.example/inbox",
            410,
            "Gone",
            "",
        );
        let class = classify(&message);
        assert_eq!(
            class,
            ErrorClass {
                retryable: false,
                reportable: false
            }
        );
    }

    #[test]
    fn test_bad_gateway_is_retried() {
        let message = delivery_failure_message(
            "https://site.example/.ghost/activitypub/create/1",
            "https://r.example/inbox",
            502,
            "Bad Gateway",
            "upstream connect error",
        );
        let class = classify(&message);
        assert!(class.retryable);
        assert!(!class.reportable);
    }

    #[test]
    fn test_rate_limit_is_retried() {
        let message = delivery_failure_message(
            "https://site.example/.ghost/activitypub/create/1",
            "https://r.example/inbox",
            429,
            "Too Many Requests",
            "",
        );
        assert!(classify(&message).retryable);
    }

    #[test]
    fn test_unknown_errors_are_retried_and_reported() {
        let class = classify("database connection pool exhausted");
        assert!(class.retryable);
        assert!(class.reportable);
    }
}
