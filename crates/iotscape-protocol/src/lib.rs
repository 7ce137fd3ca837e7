//! Wire protocol for IoTScape devices.
//!
//! This crate defines what a device and the IoTScape server say to each
//! other:
//!
//! - **Envelopes** ([`CallEnvelope`], [`ReplyEnvelope`],
//!   [`ErrorReplyEnvelope`], [`EventEnvelope`]): the JSON documents that
//!   travel in datagrams.
//! - **Service definitions** ([`ServiceDefinition`]): the document a
//!   device announces to describe one service, with its device ID
//!   embedded.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (datagrams) → Protocol (envelopes) → Service (handlers)
//! ```

mod codec;
mod definition;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use definition::ServiceDefinition;
pub use error::ProtocolError;
pub use types::{
    CallEnvelope, ErrorReplyEnvelope, Event, EventEnvelope, ReplyEnvelope,
};

/// Re-exported so handlers and callers share one JSON value type.
pub use serde_json::{Map, Value};
