//! Unified error type for the IoTScape engine.

use iotscape_protocol::ProtocolError;
use iotscape_service::{ServiceError, ServiceHandle};
use iotscape_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum IotScapeError {
    /// Sending or receiving a datagram failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding an envelope failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Building, identifying or registering a service failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The handle does not refer to a service owned by this engine.
    #[error("unknown service handle {0}")]
    UnknownService(ServiceHandle),
}
