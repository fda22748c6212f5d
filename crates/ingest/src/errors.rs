//! Error types for each stage of the ingestion pipeline.
//!
//! [`RelayError`] is the single error type flowing out of the
//! resolve → verify → normalize → deliver pipeline. The dispatcher collapses
//! every variant into one structured diagnostic at its boundary; none of them
//! ever reaches the HTTP caller.
//!
//! Port-level errors ([`crate::SecretStoreError`], [`crate::SinkError`]) are
//! defined next to their traits in [`crate::ports`].

use thiserror::Error;

use crate::{SinkError, SourceId, VerificationStrategy};

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Reasons an inbound event was dropped instead of delivered.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The transport could not hand over the request body (for example it
    /// exceeded the size limit).
    #[error("Request body unreadable: {reason}")]
    UnreadableBody {
        /// Transport-level explanation.
        reason: String,
    },

    /// The push envelope is missing required structure (`message`,
    /// `attributes`, `data`, `message_id`) or a field has the wrong shape.
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Which structural piece was missing or invalid.
        reason: String,
    },

    /// No resolver rule matched the inbound headers.
    #[error("Could not determine the event source from request headers")]
    SourceUndetermined,

    /// A resolver rule matched, but the identifier is not in the registry.
    #[error("Unauthorized event source '{identifier}'")]
    UnknownSource {
        /// The identifier the resolver produced.
        identifier: String,
    },

    /// Verification could not run: the credential was structurally absent
    /// or the secret could not key the MAC.
    #[error("Verification aborted for source '{source_id}': {error}")]
    VerificationAborted {
        /// Source whose strategy was selected.
        source_id: SourceId,
        /// The structural failure.
        #[source]
        error: VerificationError,
    },

    /// The presented credential did not match, or no secret was available to
    /// check it against.
    #[error("Signature verification failed for source '{source_id}'")]
    VerificationFailed {
        /// Source whose strategy rejected the event.
        source_id: SourceId,
    },

    /// The verified body could not be turned into a
    /// [`crate::NormalizedRecord`].
    #[error("Malformed payload: {reason}")]
    MalformedPayload {
        /// Which field was missing or invalid.
        reason: String,
    },

    /// The analytics sink refused or failed to store the record.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl RelayError {
    /// Shorthand for [`RelayError::MalformedEnvelope`].
    pub fn malformed_envelope(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`RelayError::MalformedPayload`].
    pub fn malformed_payload(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Verification errors
// ---------------------------------------------------------------------------

/// Structural verification failures.
///
/// A credential that is present but wrong is *not* an error; it is a valid
/// `Ok(false)` from [`VerificationStrategy::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The signature header was missing or empty. Raised before any secret
    /// lookup is attempted.
    #[error("{strategy} credential is empty")]
    EmptyCredential {
        /// Strategy that required the credential.
        strategy: VerificationStrategy,
    },

    /// The fetched secret could not be used as an HMAC key.
    #[error("{strategy} key was rejected")]
    InvalidKey {
        /// Strategy that tried to use the key.
        strategy: VerificationStrategy,
    },
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Errors raised while building a [`crate::SourceRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two entries claimed the same caller-presented identifier.
    #[error("Duplicate source identifier '{identifier}'")]
    DuplicateIdentifier {
        /// The repeated identifier.
        identifier: String,
    },
}
