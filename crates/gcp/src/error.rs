//! Adapter-level errors and their mapping onto the port error types.

use ingest::{SecretStoreError, SinkError};
use thiserror::Error;

/// Errors raised while talking to a Google Cloud API.
#[derive(Debug, Error)]
pub enum GcpError {
    /// The request could not be sent or the response body could not be read.
    #[error("HTTP transport error calling {service}: {source}")]
    Transport {
        /// API that was being called.
        service: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        /// API that was being called.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The API answered successfully but the body had an unexpected shape.
    #[error("Unexpected response from {service}: {message}")]
    Decode {
        /// API that was being called.
        service: &'static str,
        /// What was wrong with the body.
        message: String,
    },
}

impl GcpError {
    pub(crate) fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { service, source }
    }

    /// Reads the body of a non-success `response` into a [`GcpError::Status`].
    pub(crate) async fn from_status(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::Status {
            service,
            status,
            body,
        }
    }
}

impl From<GcpError> for SecretStoreError {
    fn from(error: GcpError) -> Self {
        match error {
            GcpError::Decode { message, .. } => Self::InvalidPayload { message },
            other => Self::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

impl From<GcpError> for SinkError {
    fn from(error: GcpError) -> Self {
        Self::Unavailable {
            message: error.to_string(),
        }
    }
}
