//! Router tests: every delivery is acknowledged with 204, and only verified
//! events reach the sink.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use ingest::verifier::{hmac_sha1_hex, hmac_sha256_hex};
use ingest::{
    EventDispatcher, RecordingSink, SecretName, SecretVersion, SourceRegistry, SourceResolver,
    StaticSecretStore,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const HMAC_KEY: &[u8] = b"s3cr3t";

fn app() -> (Router, Arc<RecordingSink>) {
    let name = SecretName::new("event-handler").unwrap();
    let secrets = StaticSecretStore::new()
        .with_secret(&name, SecretVersion::Latest, HMAC_KEY)
        .with_secret(&name, SecretVersion::Pinned(1), "gitlab-token");
    let sink = Arc::new(RecordingSink::new());
    let dispatcher = EventDispatcher::new(
        SourceRegistry::builtin(),
        SourceResolver::standard(),
        Arc::new(secrets),
        sink.clone(),
        name,
    );
    (listener::create_router(Arc::new(dispatcher)), sink)
}

fn event_body() -> String {
    json!({
        "event_type": "deployment",
        "id": "dep-1",
        "metadata": {},
        "timestamp": "2020-06-01T00:00:00Z"
    })
    .to_string()
}

fn push(envelope: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(envelope.to_string()))
        .unwrap()
}

async fn assert_acknowledged(app: Router, request: Request<Body>) {
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

#[tokio::test]
async fn verified_push_is_delivered_and_acknowledged() {
    let (app, sink) = app();
    let body = event_body();
    let envelope = json!({
        "message": {
            "attributes": {
                "headers": json!({
                    "User-Agent": "drone-deployment/1.0",
                    "X-Deployment-Signature": hmac_sha256_hex(HMAC_KEY, body.as_bytes()).unwrap()
                }).to_string()
            },
            "data": STANDARD.encode(&body),
            "message_id": "push-1"
        }
    });

    assert_acknowledged(app, push(&envelope)).await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "drone-deployment");
    assert_eq!(records[0].msg_id, "push-1");
}

#[tokio::test]
async fn forged_push_is_acknowledged_but_not_delivered() {
    let (app, sink) = app();
    let body = event_body();
    let envelope = json!({
        "message": {
            "attributes": {
                "headers": json!({
                    "User-Agent": "drone-deployment/1.0",
                    "X-Deployment-Signature": hmac_sha256_hex(b"guess", body.as_bytes()).unwrap()
                }).to_string()
            },
            "data": STANDARD.encode(&body),
            "message_id": "push-2"
        }
    });

    assert_acknowledged(app, push(&envelope)).await;
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn envelope_without_message_is_acknowledged() {
    let (app, sink) = app();

    assert_acknowledged(app, push(&json!({"subscription": "s"}))).await;
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn non_json_push_body_is_acknowledged() {
    let (app, sink) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from("definitely not json"))
        .unwrap();

    assert_acknowledged(app, request).await;
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn direct_github_webhook_is_delivered_with_its_delivery_id() {
    let (app, sink) = app();
    let body = event_body();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("User-Agent", "GitHub-Hookshot/044aadd")
        .header("X-GitHub-Delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
        .header(
            "X-Hub-Signature",
            format!("sha1={}", hmac_sha1_hex(HMAC_KEY, body.as_bytes()).unwrap()),
        )
        .body(Body::from(body))
        .unwrap();

    assert_acknowledged(app, request).await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "github");
    assert_eq!(records[0].msg_id, "72d3162e-cc78-11e3-81ab-4c9367dc0958");
}

#[tokio::test]
async fn direct_gitlab_webhook_without_delivery_id_gets_generated_id() {
    let (app, sink) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("X-Gitlab-Event", "Push Hook")
        .header("X-Gitlab-Token", "gitlab-token")
        .body(Body::from(event_body()))
        .unwrap();

    assert_acknowledged(app, request).await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "gitlab");
    assert_eq!(records[0].msg_id.len(), 36);
}

#[tokio::test]
async fn direct_webhook_with_bad_token_is_acknowledged_but_not_delivered() {
    let (app, sink) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("X-Gitlab-Event", "Push Hook")
        .header("X-Gitlab-Token", "wrong")
        .body(Body::from(event_body()))
        .unwrap();

    assert_acknowledged(app, request).await;
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn oversized_bodies_are_acknowledged_but_not_delivered() {
    for uri in ["/", "/webhook"] {
        let (app, sink) = app();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("X-Gitlab-Event", "Push Hook")
            .header("X-Gitlab-Token", "gitlab-token")
            .body(Body::from(vec![b' '; listener::MAX_BODY_BYTES + 1]))
            .unwrap();

        assert_acknowledged(app, request).await;
        assert!(sink.records().is_empty(), "{uri} delivered an oversized body");
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}
