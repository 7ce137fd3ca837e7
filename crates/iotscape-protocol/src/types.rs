//! Envelope types for IoTScape's wire format.
//!
//! Every datagram carries exactly one JSON document. Inbound datagrams
//! are calls; outbound datagrams are replies, error replies, events, or
//! the service definition itself (see [`ServiceDefinition`](crate::ServiceDefinition)).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Server → device: "run `function` on this service instance."
///
/// ```json
/// {"service": "Light", "device": "AABBCC", "id": "req1",
///  "function": "turnOn", "params": []}
/// ```
///
/// `service` and `device` together select the target instance; `id` is
/// the server's request id and is echoed back as `request` in the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    /// Name of the target service.
    pub service: String,
    /// Device ID of the target service instance.
    pub device: String,
    /// Request id, echoed in the reply.
    pub id: String,
    /// Method to invoke.
    pub function: String,
    /// Positional arguments. Missing or `null` `params` is treated as `[]`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub params: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Device → server: the result of a call.
///
/// `id` is the replying device's ID (not the request id, that goes in
/// `request`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    /// Device ID of the replying service.
    pub id: String,
    /// The call's request id.
    pub request: String,
    /// Service name, echoed from the call.
    pub service: String,
    /// Whatever the handler returned, usually a JSON array.
    pub response: Value,
}

/// Device → server: the call reached the device but could not be served.
///
/// Sent when a handler fails, and for unknown functions or devices when
/// the engine is configured to report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReplyEnvelope {
    /// Device ID of the replying service (or the addressed device ID if
    /// no such service exists here).
    pub id: String,
    /// The call's request id.
    pub request: String,
    /// Service name, echoed from the call.
    pub service: String,
    /// Human-readable reason.
    pub error: String,
}

/// The body of an [`EventEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name as declared in the service definition.
    #[serde(rename = "type")]
    pub kind: String,
    /// Named arguments. Omitted from the wire when empty.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, Value>,
}

/// Device → server: something happened, no request involved.
///
/// ```json
/// {"id": "AABBCC", "service": "Button", "event": {"type": "pressed"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Device ID of the emitting service.
    pub id: String,
    /// Name of the emitting service.
    pub service: String,
    /// The event itself.
    pub event: Event,
}
