//! Source-agnostic record written to the analytics sink.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{MessageId, RelayError, SourceId};

/// One verified event, flattened for the analytics store.
///
/// Field names are the sink's column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Event type reported by the sender.
    pub event_type: String,
    /// Sender-assigned event id.
    pub id: String,
    /// Sender metadata, re-serialized as a JSON string.
    pub metadata: String,
    /// Sender timestamp, verbatim.
    pub time_created: String,
    /// The credential that passed verification.
    pub signature: String,
    /// Delivery message id.
    pub msg_id: String,
    /// Id of the resolved [`crate::EventSource`].
    pub source: String,
}

impl NormalizedRecord {
    /// Extracts a record from a verified request body.
    ///
    /// The body must be a JSON object with `event_type`, `id`, `metadata`
    /// and `timestamp`. String or number `id` and `timestamp` values are
    /// accepted; `metadata` may be any JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedPayload`] when the body is not UTF-8
    /// JSON or a required field is missing or mistyped.
    pub fn from_verified_body(
        body: &[u8],
        signature: &str,
        msg_id: &MessageId,
        source: &SourceId,
    ) -> Result<Self, RelayError> {
        let text = std::str::from_utf8(body)
            .map_err(|e| RelayError::malformed_payload(format!("body is not UTF-8: {e}")))?;
        let data: Value = serde_json::from_str(text.trim())
            .map_err(|e| RelayError::malformed_payload(format!("body is not JSON: {e}")))?;

        let metadata = data
            .get("metadata")
            .ok_or_else(|| RelayError::malformed_payload("missing field 'metadata'"))?;
        let metadata = serde_json::to_string(metadata)
            .map_err(|e| RelayError::malformed_payload(format!("metadata not serializable: {e}")))?;

        Ok(Self {
            event_type: scalar_field(&data, "event_type")?,
            id: scalar_field(&data, "id")?,
            metadata,
            time_created: scalar_field(&data, "timestamp")?,
            signature: signature.to_string(),
            msg_id: msg_id.to_string(),
            source: source.to_string(),
        })
    }
}

/// Reads `field` as a string, stringifying numbers.
fn scalar_field(data: &Value, field: &str) -> Result<String, RelayError> {
    match data.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(RelayError::malformed_payload(format!(
            "field '{field}' is not a string or number"
        ))),
        None => Err(RelayError::malformed_payload(format!("missing field '{field}'"))),
    }
}
