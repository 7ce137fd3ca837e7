//! Error types for the service layer.

use iotscape_protocol::ProtocolError;

use crate::DeviceKey;

/// Errors raised while building, identifying or registering a service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The definition text could not be parsed or rewritten.
    #[error(transparent)]
    Definition(#[from] ProtocolError),

    /// The hardware identity source returned no bytes.
    #[error("hardware identity unavailable")]
    IdentityUnavailable,

    /// A textual hardware identity was not valid hex.
    #[error("invalid hardware identity: {0}")]
    InvalidIdentity(String),

    /// Another service already answers for this key.
    #[error("device {0} is already registered to another service")]
    DuplicateDevice(DeviceKey),

    /// The service has no device ID yet, so it can't address the server.
    #[error("service `{0}` has not been announced")]
    NotAnnounced(String),
}

/// A handler could not produce a result.
///
/// The message is sent back to the server in an error reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The message sent to the server.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}
