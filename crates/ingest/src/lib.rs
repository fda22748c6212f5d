//! Core ingestion domain for the event relay.
//!
//! This crate owns every rule about *which* inbound events are trusted and
//! *what* gets written to the analytics sink. Infrastructure crates implement
//! the port traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Secret retrieval and sink delivery are reached only through
//! [`SecretStore`] and [`AnalyticsSink`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`SourceId`, `MessageId`, `SecretName`, ...) |
//! | [`headers`] | Case-insensitive inbound header map |
//! | [`registry`] | `EventSource`, `VerificationStrategy`, `SourceRegistry` |
//! | [`resolver`] | Ordered header rules that identify the sending platform |
//! | [`verifier`] | HMAC-SHA1 / HMAC-SHA256 / static-token verification |
//! | [`envelope`] | Push envelope unwrapping and `InboundEvent` |
//! | [`record`] | `NormalizedRecord` extraction |
//! | [`dispatcher`] | Resolve → verify → normalize → deliver orchestration |
//! | [`ports`] | `SecretStore` and `AnalyticsSink` traits |
//! | [`memory`] | In-process port implementations for local runs and tests |
//! | [`errors`] | Per-stage error types |

pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod headers;
pub mod identifiers;
pub mod memory;
pub mod ports;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod verifier;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use dispatcher::{Diagnostic, EventDispatcher, Outcome};
pub use envelope::{InboundEvent, PushMessage};
pub use errors::{RegistryError, RelayError, VerificationError};
pub use headers::Headers;
pub use identifiers::{MessageId, ProjectId, SecretName, SecretVersion, SourceId};
pub use memory::{LogSink, RecordingSink, StaticSecretStore};
pub use ports::{AnalyticsSink, Secret, SecretStore, SecretStoreError, SinkError};
pub use record::NormalizedRecord;
pub use registry::{EventSource, SourceRegistry, VerificationStrategy};
pub use resolver::{ResolverRule, SourceResolver};
