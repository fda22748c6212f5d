//! Endpoint handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use ingest::{EventDispatcher, Headers, InboundEvent, MessageId};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// Headers in which platforms carry their own delivery id, checked in order.
const DELIVERY_ID_HEADERS: [&str; 3] = ["X-GitHub-Delivery", "X-Gitlab-Event-UUID", "Ce-Id"];

/// Receives a queue push envelope.
///
/// Always answers `204 No Content`. A body that is not JSON is passed on as
/// a JSON string so the resulting diagnostic still carries it. A body the
/// transport refused (over [`crate::MAX_BODY_BYTES`]) is dropped with a
/// diagnostic.
#[instrument(name = "receive_push", skip_all)]
pub async fn receive_push(
    State(dispatcher): State<Arc<EventDispatcher>>,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            dispatcher.handle_unreadable("/", rejection.body_text());
            return StatusCode::NO_CONTENT;
        }
    };
    debug!(content_length = body.len(), "Push received");

    let envelope = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
        debug!(error = %e, "Push body is not JSON");
        Value::String(String::from_utf8_lossy(&body).into_owned())
    });

    dispatcher.handle_push(&envelope).await;
    StatusCode::NO_CONTENT
}

/// Receives a webhook sent straight to the relay.
///
/// The message id is the platform's own delivery id when one is present,
/// otherwise a fresh UUID. Always answers `204 No Content`.
#[instrument(name = "receive_webhook", skip_all)]
pub async fn receive_webhook(
    State(dispatcher): State<Arc<EventDispatcher>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            dispatcher.handle_unreadable("/webhook", rejection.body_text());
            return StatusCode::NO_CONTENT;
        }
    };
    debug!(content_length = body.len(), "Webhook received");

    let headers = collect_headers(&headers);

    let message_id = DELIVERY_ID_HEADERS
        .iter()
        .find_map(|name| headers.get(name))
        .and_then(MessageId::new)
        .unwrap_or_else(MessageId::generate);

    let event = InboundEvent {
        headers,
        raw_body: body.to_vec(),
        message_id,
    };

    dispatcher.handle_direct(event).await;
    StatusCode::NO_CONTENT
}

/// Copies UTF-8 header values into a [`Headers`] map.
///
/// Values that [`axum::http::HeaderValue::to_str`] rejects are skipped. For
/// a repeated name the last value wins.
fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            debug!(header = %name, "Skipping header with non-UTF-8 value");
            continue;
        };
        if headers.contains(name.as_str()) {
            debug!(header = %name, "Repeated header; keeping the last value");
        }
        headers.insert(name.as_str(), value);
    }
    headers
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
