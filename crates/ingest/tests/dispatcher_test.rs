//! End-to-end dispatcher tests over in-memory collaborators.
//!
//! Each test builds a push envelope the way the queue would deliver it and
//! checks both the [`Outcome`] and what reached the sink.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ingest::verifier::{hmac_sha1_hex, hmac_sha256_hex};
use ingest::{
    EventDispatcher, Headers, InboundEvent, MessageId, Outcome, RecordingSink, RelayError,
    SecretName, SecretVersion, SourceRegistry, SourceResolver, StaticSecretStore,
};
use serde_json::{json, Value};

const HMAC_KEY: &[u8] = b"s3cr3t";
const TOKEN: &str = "gitlab-token";

fn body() -> Vec<u8> {
    json!({
        "event_type": "deployment",
        "id": "dep-1",
        "metadata": {"environment": "prod"},
        "timestamp": "2020-06-01 12:00:00",
        "source": "drone"
    })
    .to_string()
    .into_bytes()
}

fn envelope(headers: Value, body: &[u8], message_id: &str) -> Value {
    json!({
        "message": {
            "attributes": { "headers": headers.to_string() },
            "data": STANDARD.encode(body),
            "message_id": message_id
        },
        "subscription": "projects/demo/subscriptions/events"
    })
}

struct Harness {
    dispatcher: EventDispatcher,
    sink: Arc<RecordingSink>,
}

fn harness_with(secrets: StaticSecretStore, sink: RecordingSink) -> Harness {
    let sink = Arc::new(sink);
    let dispatcher = EventDispatcher::new(
        SourceRegistry::builtin(),
        SourceResolver::standard(),
        Arc::new(secrets),
        sink.clone(),
        SecretName::new("event-handler").unwrap(),
    );
    Harness { dispatcher, sink }
}

fn harness() -> Harness {
    let name = SecretName::new("event-handler").unwrap();
    let secrets = StaticSecretStore::new()
        .with_secret(&name, SecretVersion::Latest, HMAC_KEY)
        .with_secret(&name, SecretVersion::Pinned(1), TOKEN);
    harness_with(secrets, RecordingSink::new())
}

fn dropped_error(outcome: Outcome) -> String {
    match outcome {
        Outcome::Dropped(diagnostic) => {
            assert_eq!(diagnostic.severity, "WARNING");
            assert_eq!(diagnostic.msg, "Data not saved to analytics sink");
            diagnostic.errors
        }
        Outcome::Delivered(record) => panic!("expected drop, delivered {record:?}"),
    }
}

// ---------------------------------------------------------------------------
// Delivered
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verified_sha256_event_yields_one_delivery() {
    let h = harness();
    let body = body();
    let signature = hmac_sha256_hex(HMAC_KEY, &body).unwrap();
    let env = envelope(
        json!({"User-Agent": "drone-deployment/1.0", "X-Deployment-Signature": signature}),
        &body,
        "msg-1",
    );

    let outcome = h.dispatcher.handle_push(&env).await;

    assert!(outcome.is_delivered());
    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.source, "drone-deployment");
    assert_eq!(record.event_type, "deployment");
    assert_eq!(record.id, "dep-1");
    assert_eq!(record.metadata, r#"{"environment":"prod"}"#);
    assert_eq!(record.time_created, "2020-06-01 12:00:00");
    assert_eq!(record.signature, signature);
    assert_eq!(record.msg_id, "msg-1");
    assert_eq!(outcome, Outcome::Delivered(record.clone()));
}

#[tokio::test]
async fn verified_github_event_uses_sha1_header() {
    let h = harness();
    let body = body();
    let signature = format!("sha1={}", hmac_sha1_hex(HMAC_KEY, &body).unwrap());
    let env = envelope(
        json!({"user-agent": "GitHub-Hookshot/044aadd", "x-hub-signature": signature}),
        &body,
        "msg-2",
    );

    assert!(h.dispatcher.handle_push(&env).await.is_delivered());
    assert_eq!(h.sink.records()[0].source, "github");
}

#[tokio::test]
async fn gitlab_marker_selects_token_strategy_despite_user_agent() {
    let h = harness();
    let body = body();
    let env = envelope(
        json!({
            "X-Gitlab-Event": "Push Hook",
            "User-Agent": "GitHub-Hookshot/spoofed",
            "X-Gitlab-Token": TOKEN
        }),
        &body,
        "msg-3",
    );

    assert!(h.dispatcher.handle_push(&env).await.is_delivered());
    let records = h.sink.records();
    assert_eq!(records[0].source, "gitlab");
    assert_eq!(records[0].signature, TOKEN);
}

#[tokio::test]
async fn tekton_cloud_event_is_verified_by_token() {
    let h = harness();
    let body = body();
    let env = envelope(
        json!({
            "Ce-Type": "dev.tekton.event.pipelinerun.successful.v1",
            "User-Agent": "Go-http-client/1.1",
            "tekton-secret": TOKEN
        }),
        &body,
        "msg-4",
    );

    assert!(h.dispatcher.handle_push(&env).await.is_delivered());
    assert_eq!(h.sink.records()[0].source, "tekton");
}

#[tokio::test]
async fn direct_delivery_runs_the_same_pipeline() {
    let h = harness();
    let body = body();
    let headers: Headers = [
        ("User-Agent", "golang-incident-bot"),
        ("X-Incident-Signature", hmac_sha256_hex(HMAC_KEY, &body).unwrap().as_str()),
    ]
    .into_iter()
    .collect();
    let event = InboundEvent {
        headers,
        raw_body: body,
        message_id: MessageId::new("direct-1").unwrap(),
    };

    let outcome = h.dispatcher.handle_direct(event).await;

    assert!(outcome.is_delivered());
    let records = h.sink.records();
    assert_eq!(records[0].source, "incident-bot");
    assert_eq!(records[0].msg_id, "direct-1");
}

#[tokio::test]
async fn replayed_envelope_is_delivered_again() {
    let h = harness();
    let body = body();
    let env = envelope(
        json!({"User-Agent": "drone-deployment", "X-Deployment-Signature": hmac_sha256_hex(HMAC_KEY, &body).unwrap()}),
        &body,
        "msg-dup",
    );

    assert!(h.dispatcher.handle_push(&env).await.is_delivered());
    assert!(h.dispatcher.handle_push(&env).await.is_delivered());

    let records = h.sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
}

// ---------------------------------------------------------------------------
// Dropped
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_signature_yields_no_delivery_and_one_diagnostic() {
    let h = harness();
    let body = body();
    let env = envelope(
        json!({"User-Agent": "drone-deployment/1.0", "X-Deployment-Signature": hmac_sha256_hex(b"wrong", &body).unwrap()}),
        &body,
        "msg-5",
    );

    let outcome = h.dispatcher.handle_push(&env).await;

    let Outcome::Dropped(diagnostic) = outcome else {
        panic!("expected drop");
    };
    assert_eq!(
        diagnostic.errors,
        "Signature verification failed for source 'drone-deployment'"
    );
    assert_eq!(diagnostic.json_payload, env);
    assert!(h.sink.records().is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_reported_as_aborted_verification() {
    let h = harness();
    let body = body();
    let env = envelope(json!({"User-Agent": "GitHub-Hookshot/1"}), &body, "msg-6");

    let errors = dropped_error(h.dispatcher.handle_push(&env).await);

    assert!(errors.contains("Verification aborted for source 'github'"), "{errors}");
    assert!(h.sink.records().is_empty());
}

#[tokio::test]
async fn unknown_product_token_is_unauthorized() {
    let h = harness();
    let body = body();
    let env = envelope(json!({"User-Agent": "curl/8.4.0"}), &body, "msg-7");

    let errors = dropped_error(h.dispatcher.handle_push(&env).await);

    assert_eq!(errors, "Unauthorized event source 'curl'");
}

#[tokio::test]
async fn envelope_without_headers_cannot_be_attributed() {
    let h = harness();
    let env = json!({
        "message": { "attributes": {}, "data": STANDARD.encode(body()), "message_id": "m" }
    });

    let errors = dropped_error(h.dispatcher.handle_push(&env).await);

    assert_eq!(
        errors,
        RelayError::SourceUndetermined.to_string()
    );
}

#[tokio::test]
async fn malformed_envelopes_are_dropped_not_raised() {
    let h = harness();

    for env in [
        json!(null),
        json!({}),
        json!({"attributes": {}}),
        json!({"message": {"data": "", "message_id": "1"}}),
    ] {
        let errors = dropped_error(h.dispatcher.handle_push(&env).await);
        assert!(errors.starts_with("Malformed envelope"), "{errors}");
    }
    assert!(h.sink.records().is_empty());
}

#[tokio::test]
async fn verified_but_unparseable_body_is_malformed_payload() {
    let h = harness();
    let body = b"{\"event_type\": \"push\"}".to_vec();
    let env = envelope(
        json!({"User-Agent": "drone-deployment", "X-Deployment-Signature": hmac_sha256_hex(HMAC_KEY, &body).unwrap()}),
        &body,
        "msg-8",
    );

    let errors = dropped_error(h.dispatcher.handle_push(&env).await);

    assert!(errors.starts_with("Malformed payload"), "{errors}");
}

#[tokio::test]
async fn secret_store_outage_drops_event() {
    let h = harness_with(
        StaticSecretStore::unavailable("deadline exceeded"),
        RecordingSink::new(),
    );
    let body = body();
    let env = envelope(
        json!({"User-Agent": "drone-deployment", "X-Deployment-Signature": hmac_sha256_hex(HMAC_KEY, &body).unwrap()}),
        &body,
        "msg-9",
    );

    let errors = dropped_error(h.dispatcher.handle_push(&env).await);

    assert!(errors.starts_with("Signature verification failed"), "{errors}");
}

#[tokio::test]
async fn sink_failure_is_reported_in_diagnostic() {
    let name = SecretName::new("event-handler").unwrap();
    let secrets = StaticSecretStore::new().with_secret(&name, SecretVersion::Latest, HMAC_KEY);
    let h = harness_with(secrets, RecordingSink::rejecting("table not found"));
    let body = body();
    let env = envelope(
        json!({"User-Agent": "drone-deployment", "X-Deployment-Signature": hmac_sha256_hex(HMAC_KEY, &body).unwrap()}),
        &body,
        "msg-10",
    );

    let errors = dropped_error(h.dispatcher.handle_push(&env).await);

    assert_eq!(
        errors,
        "Analytics sink rejected record 'msg-10': table not found"
    );
}

#[tokio::test]
async fn direct_delivery_diagnostic_carries_headers_and_body() {
    let h = harness();
    let event = InboundEvent {
        headers: [("User-Agent", "drone-deployment")].into_iter().collect(),
        raw_body: b"{}".to_vec(),
        message_id: MessageId::new("direct-2").unwrap(),
    };

    let Outcome::Dropped(diagnostic) = h.dispatcher.handle_direct(event).await else {
        panic!("expected drop");
    };

    assert_eq!(
        diagnostic.json_payload,
        json!({
            "headers": {"user-agent": "drone-deployment"},
            "body": "{}",
            "message_id": "direct-2"
        })
    );
}
