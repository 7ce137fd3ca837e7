//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, missing required envelope fields,
    /// or a truncated datagram.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The service definition parsed as JSON but has the wrong shape:
    /// not an object, not exactly one service, or a service body that
    /// is not an object.
    #[error("invalid service definition: {0}")]
    InvalidDefinition(String),
}
