//! Event relay inbound HTTP surface.
//!
//! Receives events two ways and hands both to the same
//! [`ingest::EventDispatcher`]:
//!
//! - **Queue push** (`POST /`): a push subscription wraps the original
//!   webhook (headers serialized into `attributes.headers`, body base64 in
//!   `data`) and posts the envelope here.
//! - **Direct webhook** (`POST /webhook`): the sending platform calls the
//!   relay itself; headers and body are taken from the request as-is.
//!
//! Both endpoints answer `204 No Content` with an empty body whatever the
//! outcome, so a push subscription never retries an event that the
//! dispatcher already dropped and logged.
//!
//! ## Deployment Scenarios
//!
//! | Scenario | Endpoint | Notes |
//! |----------|----------|-------|
//! | Queue push subscription | `POST /` | Envelope carries the original headers |
//! | Platform webhook | `POST /webhook` | Requires a public HTTPS endpoint |
//! | Health probe | `GET /health` | No authentication |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details and request decoding live here.
//! The [`ingest`] crate sees only [`ingest::InboundEvent`] and JSON envelopes.

pub mod handlers;
pub mod server;

pub use server::{create_router, serve, RequestId, MAX_BODY_BYTES};
