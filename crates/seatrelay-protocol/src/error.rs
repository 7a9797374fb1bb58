//! Error types for the protocol layer.
//!
//! Each crate in Seatrelay defines its own error enum. A `ProtocolError`
//! always means the bytes themselves were the problem, never the
//! network or the room.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `type` tag,
    /// or a missing required field.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The message decoded but breaks a protocol rule, such as a join
    /// without a usable room name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
