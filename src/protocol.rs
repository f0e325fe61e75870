//! Wire protocol: the JSON envelope exchanged over the connection.
//!
//! Every message, inbound and outbound, is a single text frame holding one
//! JSON object:
//!
//! ```text
//! { "type": "<non-empty string>", "data": <any JSON value> }
//! ```
//!
//! `type` selects the handler list on the receiving side; `data` is the
//! opaque payload handed to handlers. There is no framing beyond what the
//! transport itself provides — one WebSocket text frame is one envelope.
//!
//! An envelope with a missing or empty `type` is undeliverable and is
//! rejected at decode time rather than dispatched. A missing `data` field
//! decodes as `null`.

// Rust guideline compliant 2026-02

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BusError;

/// The `{type, data}` structure exchanged over the connection.
///
/// Field order matters on the wire: `type` is always serialized before
/// `data`, which keeps the encoding byte-stable for tests and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type tag; selects the handler list on receipt.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Opaque payload handed to handlers. Defaults to `null` when the
    /// field is absent on the wire.
    #[serde(default)]
    pub data: Value,
}

/// Encode a `(type, data)` pair as envelope wire text.
///
/// # Errors
///
/// Returns [`BusError::InvalidEnvelope`] if `msg_type` is empty or `data`
/// does not serialize to JSON.
pub fn encode<T: Serialize>(msg_type: &str, data: &T) -> Result<String, BusError> {
    if msg_type.is_empty() {
        return Err(BusError::InvalidEnvelope("empty message type".to_string()));
    }
    let envelope = Envelope {
        msg_type: msg_type.to_string(),
        data: serde_json::to_value(data)
            .map_err(|e| BusError::InvalidEnvelope(format!("unserializable payload: {e}")))?,
    };
    serde_json::to_string(&envelope)
        .map_err(|e| BusError::InvalidEnvelope(format!("encode failed: {e}")))
}

/// Decode envelope wire text.
///
/// # Errors
///
/// Returns [`BusError::Parse`] if `raw` is not valid JSON, is not an
/// envelope object, or carries a missing or empty `type`.
pub fn decode(raw: &str) -> Result<Envelope, BusError> {
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|e| BusError::Parse(e.to_string()))?;
    if envelope.msg_type.is_empty() {
        return Err(BusError::Parse("empty message type".to_string()));
    }
    Ok(envelope)
}
