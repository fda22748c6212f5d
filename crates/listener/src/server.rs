//! Router construction and server lifecycle.
//!
//! Requests flow through:
//! 1. Request ID generation (`X-Request-Id` on every response)
//! 2. Request/response tracing
//! 3. Body size limit
//! 4. Handler execution

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use ingest::EventDispatcher;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::handlers;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Per-request identifier stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Creates the router serving every endpoint over `dispatcher`.
pub fn create_router(dispatcher: Arc<EventDispatcher>) -> Router {
    Router::new()
        .route("/", post(handlers::receive_push))
        .route("/webhook", post(handlers::receive_webhook))
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(dispatcher)
}

/// Middleware to inject a request ID into extensions and responses.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Binds `addr` and serves `router` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after `shutdown` resolves.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or the accept
/// loop fails.
pub async fn serve(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening for events");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
