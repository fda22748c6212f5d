//! Push-subscription envelope unwrapping.
//!
//! A queue push delivery wraps the original webhook like this:
//!
//! ```json
//! {
//!   "message": {
//!     "attributes": { "headers": "{\"User-Agent\": \"GitHub-Hookshot/...\"}" },
//!     "data": "<base64 of the original request body>",
//!     "message_id": "1234567890"
//!   }
//! }
//! ```
//!
//! [`PushMessage::from_envelope`] validates that structure and
//! [`PushMessage::into_inbound_event`] turns it into the transport-neutral
//! [`InboundEvent`] that direct webhook deliveries also produce.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};

use crate::{Headers, MessageId, RelayError};

/// Attribute carrying the original request headers as a JSON string.
pub const HEADERS_ATTRIBUTE: &str = "headers";

/// One inbound event, independent of how it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Original request headers.
    pub headers: Headers,
    /// Original request body, exactly as signed by the sender.
    pub raw_body: Vec<u8>,
    /// Delivery identifier.
    pub message_id: MessageId,
}

/// The validated `message` object of a push envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    /// Message attributes (string-valued in practice, kept as JSON).
    pub attributes: Map<String, Value>,
    /// Base64-decoded `data`.
    pub data: Vec<u8>,
    /// `message_id` (or `messageId`).
    pub message_id: MessageId,
}

impl PushMessage {
    /// Validates `envelope` and extracts its message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedEnvelope`] when the envelope is empty,
    /// `message` or `message.attributes` is missing or not an object, `data`
    /// is missing or not valid base64, or no message id is present.
    pub fn from_envelope(envelope: &Value) -> Result<Self, RelayError> {
        let root = envelope
            .as_object()
            .filter(|root| !root.is_empty())
            .ok_or_else(|| RelayError::malformed_envelope("expecting a JSON object payload"))?;

        let message = root
            .get("message")
            .ok_or_else(|| RelayError::malformed_envelope("not a valid push message: missing 'message'"))?
            .as_object()
            .ok_or_else(|| RelayError::malformed_envelope("'message' is not an object"))?;

        let attributes = message
            .get("attributes")
            .ok_or_else(|| RelayError::malformed_envelope("missing message attributes"))?
            .as_object()
            .ok_or_else(|| RelayError::malformed_envelope("'attributes' is not an object"))?
            .clone();

        let encoded = message
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::malformed_envelope("missing message data"))?;
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| RelayError::malformed_envelope(format!("message data is not base64: {e}")))?;

        let message_id = message
            .get("message_id")
            .or_else(|| message.get("messageId"))
            .and_then(Value::as_str)
            .and_then(MessageId::new)
            .ok_or_else(|| RelayError::malformed_envelope("missing message_id"))?;

        Ok(Self {
            attributes,
            data,
            message_id,
        })
    }

    /// Converts the message into an [`InboundEvent`], deserializing the
    /// `headers` attribute when present.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedEnvelope`] when the `headers` attribute
    /// is not a string holding a JSON object of strings.
    pub fn into_inbound_event(self) -> Result<InboundEvent, RelayError> {
        let headers = match self.attributes.get(HEADERS_ATTRIBUTE) {
            None => Headers::new(),
            Some(Value::String(blob)) => Headers::from_json_blob(blob).map_err(|e| {
                RelayError::malformed_envelope(format!("headers attribute is not a JSON object: {e}"))
            })?,
            Some(_) => {
                return Err(RelayError::malformed_envelope(
                    "headers attribute is not a string",
                ))
            }
        };

        Ok(InboundEvent {
            headers,
            raw_body: self.data,
            message_id: self.message_id,
        })
    }
}
