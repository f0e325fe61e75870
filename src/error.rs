//! Error taxonomy for bus operations.

/// Errors that can occur during bus operations.
#[derive(Debug)]
pub enum BusError {
    /// `connect` was called while a connection handle is already live.
    ///
    /// The bus never overwrites a live handle; call [`close`] first.
    ///
    /// [`close`]: crate::MessageBus::close
    AlreadyConnected,
    /// `send` was called with no live connection, or before the open
    /// event fired for the current connection.
    NotConnected,
    /// The outbound queue rejected the message because the connection
    /// task has exited (transport error or server-side close).
    SendFailed(String),
    /// An outbound envelope could not be built: empty message type, or a
    /// payload that does not serialize to JSON.
    InvalidEnvelope(String),
    /// Inbound text that is not a valid envelope: malformed JSON, or a
    /// missing or empty `type` field.
    Parse(String),
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyConnected => write!(f, "a connection is already live"),
            Self::NotConnected => write!(f, "no open connection"),
            Self::SendFailed(msg) => write!(f, "send failed: {msg}"),
            Self::InvalidEnvelope(msg) => write!(f, "invalid envelope: {msg}"),
            Self::Parse(msg) => write!(f, "undeliverable message: {msg}"),
        }
    }
}

impl std::error::Error for BusError {}
