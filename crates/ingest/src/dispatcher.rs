//! Request-level orchestration: resolve → verify → normalize → deliver.
//!
//! Every stage returns `Result<_, RelayError>`. The stages are chained with
//! `?` inside [`EventDispatcher::process`], and the single `Err` that comes
//! out is mapped at the boundary to one structured [`Diagnostic`] log entry.
//! Callers always receive an [`Outcome`], never an error, so the HTTP layer
//! can acknowledge unconditionally and the upstream queue does not retry.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::{
    AnalyticsSink, InboundEvent, NormalizedRecord, PushMessage, RelayError, SecretName,
    SecretStore, SourceRegistry, SourceResolver,
};

/// Message attached to every dropped-event diagnostic.
pub const DROPPED_MESSAGE: &str = "Data not saved to analytics sink";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Structured log entry describing a dropped event.
///
/// `json_payload` holds the original envelope (or, for direct deliveries,
/// the headers and body) so the event can be replayed by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Log severity, in the operational log stream's vocabulary.
    pub severity: &'static str,
    /// Short human-readable summary.
    pub msg: &'static str,
    /// The stringified error.
    pub errors: String,
    /// The original inbound payload.
    pub json_payload: Value,
}

impl Diagnostic {
    fn dropped(error: &RelayError, payload: Value) -> Self {
        Self {
            severity: "WARNING",
            msg: DROPPED_MESSAGE,
            errors: error.to_string(),
            json_payload: payload,
        }
    }

    /// Emits this diagnostic as a single WARN event.
    fn emit(&self) {
        let payload = self.json_payload.to_string();
        warn!(
            severity = self.severity,
            errors = %self.errors,
            json_payload = %payload,
            "{}",
            self.msg
        );
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The event was verified and the record was accepted by the sink.
    Delivered(NormalizedRecord),
    /// The event was dropped; the diagnostic has already been logged.
    Dropped(Diagnostic),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Delivered`].
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Stateless per-request pipeline over an immutable registry and shared
/// collaborators. One instance serves every request concurrently.
pub struct EventDispatcher {
    registry: SourceRegistry,
    resolver: SourceResolver,
    secrets: Arc<dyn SecretStore>,
    sink: Arc<dyn AnalyticsSink>,
    secret_name: SecretName,
}

impl EventDispatcher {
    /// Creates a dispatcher.
    ///
    /// `secret_name` names the secret holding every source's HMAC key or
    /// token.
    pub fn new(
        registry: SourceRegistry,
        resolver: SourceResolver,
        secrets: Arc<dyn SecretStore>,
        sink: Arc<dyn AnalyticsSink>,
        secret_name: SecretName,
    ) -> Self {
        Self {
            registry,
            resolver,
            secrets,
            sink,
            secret_name,
        }
    }

    /// Handles one queue push delivery.
    ///
    /// Never fails: malformed envelopes, unknown sources, bad signatures and
    /// sink errors all become [`Outcome::Dropped`] with one logged
    /// [`Diagnostic`].
    #[instrument(name = "handle_push", skip_all)]
    pub async fn handle_push(&self, envelope: &Value) -> Outcome {
        let result = match PushMessage::from_envelope(envelope)
            .and_then(PushMessage::into_inbound_event)
        {
            Ok(event) => self.process(&event).await,
            Err(e) => Err(e),
        };
        Self::conclude(result, || envelope.clone())
    }

    /// Handles one webhook delivered straight to the relay.
    ///
    /// Same guarantees as [`EventDispatcher::handle_push`].
    #[instrument(name = "handle_direct", skip_all, fields(msg_id = %event.message_id))]
    pub async fn handle_direct(&self, event: InboundEvent) -> Outcome {
        let result = self.process(&event).await;
        Self::conclude(result, || {
            json!({
                "headers": event.headers,
                "body": String::from_utf8_lossy(&event.raw_body),
                "message_id": event.message_id,
            })
        })
    }

    /// Records a delivery whose body never reached the relay.
    ///
    /// Produces the same single [`Diagnostic`] as any other drop. The
    /// payload carries the request path and the transport's reason, since
    /// there is no body to replay.
    #[instrument(name = "handle_unreadable", skip_all, fields(path = path))]
    pub fn handle_unreadable(&self, path: &str, reason: impl Into<String>) -> Outcome {
        let reason = reason.into();
        let payload = json!({ "path": path, "reason": reason });
        Self::conclude(Err(RelayError::UnreadableBody { reason }), || payload)
    }

    /// The resolve → verify → normalize → deliver pipeline.
    async fn process(&self, event: &InboundEvent) -> Result<NormalizedRecord, RelayError> {
        let identifier = self
            .resolver
            .resolve(&event.headers)
            .ok_or(RelayError::SourceUndetermined)?;

        let source = self
            .registry
            .lookup(&identifier)
            .ok_or_else(|| RelayError::UnknownSource {
                identifier: identifier.clone(),
            })?;
        debug!(source = %source.id, strategy = %source.strategy, "Source resolved");

        let credential = event
            .headers
            .get(&source.signature_header)
            .unwrap_or_default();

        let verified = source
            .strategy
            .verify(
                credential,
                &event.raw_body,
                self.secrets.as_ref(),
                &self.secret_name,
            )
            .await
            .map_err(|error| RelayError::VerificationAborted {
                source_id: source.id.clone(),
                error,
            })?;
        if !verified {
            return Err(RelayError::VerificationFailed {
                source_id: source.id.clone(),
            });
        }

        let record = NormalizedRecord::from_verified_body(
            &event.raw_body,
            credential,
            &event.message_id,
            &source.id,
        )?;

        self.sink.deliver_record(&record).await?;
        info!(
            source = %record.source,
            msg_id = %record.msg_id,
            event_type = %record.event_type,
            "Event delivered"
        );
        Ok(record)
    }

    /// Maps the pipeline result to an [`Outcome`], logging one diagnostic on
    /// failure. `payload` is only built when needed.
    fn conclude(
        result: Result<NormalizedRecord, RelayError>,
        payload: impl FnOnce() -> Value,
    ) -> Outcome {
        match result {
            Ok(record) => Outcome::Delivered(record),
            Err(error) => {
                let diagnostic = Diagnostic::dropped(&error, payload());
                diagnostic.emit();
                Outcome::Dropped(diagnostic)
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .field("secret_name", &self.secret_name)
            .finish_non_exhaustive()
    }
}
