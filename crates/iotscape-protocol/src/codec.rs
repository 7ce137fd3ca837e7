//! Codec trait and the JSON implementation.
//!
//! The engine never calls `serde_json` directly for envelopes; it goes
//! through a [`Codec`] so the wire format stays swappable in one place.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to datagram bytes and decodes them back.
///
/// ## Trait bounds
///
/// - `Send + Sync`: the engine owning the codec may be moved into a tokio
///   task and driven from whichever worker thread picks it up.
/// - `'static`: the codec owns everything it needs, so it can live as long
///   as the engine does.
///
/// ## Generic methods
///
/// `encode` accepts anything `Serialize` (replies, error replies, events)
/// and `decode` produces anything `DeserializeOwned` (calls). The owned
/// bound matters: the datagram is dropped once routing is done, so a
/// decoded call must not borrow from it.
///
/// A codec is stateless from the engine's point of view. It never sees
/// the service definition text, which goes on the wire exactly as the
/// definition stores it.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks UTF-8 JSON, the only format IoTScape servers
/// understand.
///
/// ```rust
/// use iotscape_protocol::{CallEnvelope, Codec, JsonCodec};
///
/// let raw = br#"{"service":"Light","device":"AABBCC","id":"1","function":"heartbeat","params":[]}"#;
/// let call: CallEnvelope = JsonCodec.decode(raw).unwrap();
/// assert_eq!(call.function, "heartbeat");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
