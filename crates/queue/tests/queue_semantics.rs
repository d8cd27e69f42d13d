//! Queue semantics: classification, retry routing, and message shapes.

#![allow(clippy::unwrap_used)]

use ghostpub_queue::{
    classify, delivery_failure_message, route_failure, DeliverJob, ErrorClass, FailureRoute,
    InboxJob, RetryConfig,
};
use serde_json::json;

fn outbound_create_failure(status: u16, reason: &str) -> String {
    delivery_failure_message(
        "https://site.example/.ghost/activitypub/create/7f9",
        "https://r.example/inbox",
        status,
        reason,
        "upstream said no",
    )
}

#[test]
fn test_gone_inbox_is_acked_without_retry_or_report() {
    // Outbound Create to an inbox returning 410 Gone: acked, not
    // retried, not reported.
    let class = classify(&outbound_create_failure(410, "Gone"));
    assert_eq!(
        class,
        ErrorClass {
            retryable: false,
            reportable: false
        }
    );
    assert_eq!(
        route_failure(class, 1, &RetryConfig::default()),
        FailureRoute::Ack
    );
}

#[test]
fn test_bad_gateway_requeues_until_max_attempts() {
    let config = RetryConfig {
        max_delivery_attempts: 5,
        ..RetryConfig::default()
    };
    let class = classify(&outbound_create_failure(502, "Bad Gateway"));
    assert!(class.retryable);
    assert!(!class.reportable);

    for attempt in 1..5 {
        assert!(
            matches!(route_failure(class, attempt, &config), FailureRoute::Retry(_)),
            "attempt {attempt}"
        );
    }
    assert_eq!(route_failure(class, 5, &config), FailureRoute::Ack);
}

#[test]
fn test_retry_delays_grow_exponentially() {
    let config = RetryConfig::default();
    let class = ErrorClass {
        retryable: true,
        reportable: false,
    };

    let FailureRoute::Retry(first) = route_failure(class, 1, &config) else {
        panic!("expected retry");
    };
    let FailureRoute::Retry(second) = route_failure(class, 2, &config) else {
        panic!("expected retry");
    };

    assert_eq!(second, first * 2);
}

#[test]
fn test_application_faults_are_reported() {
    let class = classify("panicked while rendering activity");
    assert!(class.retryable);
    assert!(class.reportable);
}

#[test]
fn test_deliver_job_attempt_chain() {
    let job = DeliverJob {
        account_id: 1,
        inbox: "https://r.example/inbox".to_string(),
        activity: json!({ "id": "https://site.example/.ghost/activitypub/create/1" }),
        attempt: 1,
        not_before: None,
    };

    let not_before = chrono::Utc::now() + chrono::Duration::seconds(60);
    let retried = job.next_attempt(not_before);

    assert_eq!(retried.attempt, 2);
    assert_eq!(retried.inbox, job.inbox);
    assert_eq!(retried.not_before, Some(not_before));
    assert_eq!(
        retried.activity_id(),
        "https://site.example/.ghost/activitypub/create/1"
    );
}

#[test]
fn test_deliver_job_deserializes_without_retry_fields() {
    // Messages published before a retry carry neither field.
    let job: DeliverJob = serde_json::from_value(json!({
        "account_id": 1,
        "inbox": "https://r.example/inbox",
        "activity": { "id": "https://site.example/.ghost/activitypub/create/1" }
    }))
    .unwrap();

    assert_eq!(job.attempt, 1);
    assert!(job.not_before.is_none());
}

#[test]
fn test_inbox_job_round_trips() {
    let job = InboxJob::new(json!({
        "id": "https://r.example/f/1",
        "type": "Follow",
        "actor": "https://r.example/u/alice",
        "object": "https://site.example/.ghost/activitypub/users/index"
    }));

    let serialized = serde_json::to_string(&job).unwrap();
    let back: InboxJob = serde_json::from_str(&serialized).unwrap();
    assert_eq!(back.activity["type"], "Follow");
}
