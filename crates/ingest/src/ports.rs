//! Port traits for the two external collaborators.
//!
//! Infrastructure crates implement these traits; the dispatcher and verifier
//! depend only on the trait objects. Both traits are `Send + Sync` so a single
//! instance can serve every request concurrently.

use async_trait::async_trait;
use thiserror::Error;

use crate::{NormalizedRecord, SecretName, SecretVersion};

// ---------------------------------------------------------------------------
// Secret store
// ---------------------------------------------------------------------------

/// Raw secret bytes returned by a [`SecretStore`].
///
/// `Debug` output is redacted so secrets never reach the log stream.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wraps raw secret bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the secret as UTF-8 text, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Secret").field(&"<REDACTED>").finish()
    }
}

/// Errors returned by a [`SecretStore`].
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The named secret or version does not exist.
    #[error("Secret '{name}' version '{version}' not found")]
    NotFound {
        /// Secret name that was requested.
        name: String,
        /// Version that was requested.
        version: String,
    },

    /// The store could not be reached or answered with an error.
    #[error("Secret store unavailable: {message}")]
    Unavailable {
        /// Transport or service error description.
        message: String,
    },

    /// The store answered but the payload could not be decoded.
    #[error("Secret payload invalid: {message}")]
    InvalidPayload {
        /// Decoding error description.
        message: String,
    },
}

/// Versioned secret lookup.
///
/// Implementations are constructed with whatever scoping they need (e.g. the
/// cloud project id); callers only name the secret and version. Secrets are
/// fetched on every call and must not be cached across requests.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches the bytes of `name` at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError`] when the secret is missing, the store is
    /// unreachable, or the payload cannot be decoded.
    async fn fetch_secret(
        &self,
        name: &SecretName,
        version: SecretVersion,
    ) -> Result<Secret, SecretStoreError>;
}

// ---------------------------------------------------------------------------
// Analytics sink
// ---------------------------------------------------------------------------

/// Errors returned by an [`AnalyticsSink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink could not be reached or answered with an error status.
    #[error("Analytics sink unavailable: {message}")]
    Unavailable {
        /// Transport or service error description.
        message: String,
    },

    /// The sink accepted the request but refused the row.
    #[error("Analytics sink rejected record '{msg_id}': {message}")]
    Rejected {
        /// Message id of the rejected record.
        msg_id: String,
        /// Reason reported by the sink.
        message: String,
    },
}

/// Destination for verified, normalized records.
///
/// One call per verified event; the core never retries.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Stores `record`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the record was not stored.
    async fn deliver_record(&self, record: &NormalizedRecord) -> Result<(), SinkError>;
}
