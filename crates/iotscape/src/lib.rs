//! # IoTScape
//!
//! Device-side engine for the IoTScape protocol.
//!
//! A device describes each of its capabilities as a [`Service`] (a JSON
//! definition plus method handlers), hands the services to an
//! [`IotScape`] engine, announces them, and then calls
//! [`IotScape::pump_once`] as often as it likes. Each pump handles at most
//! one inbound call and re-announces any service whose announce is due.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iotscape::prelude::*;
//!
//! # fn main() -> Result<(), IotScapeError> {
//! let mut engine = IotScape::builder()
//!     .server("129.59.105.37:1975".parse().unwrap())
//!     .build(&FixedIdentity::from_hex("AA:BB:CC:DD:EE:FF")?)?;
//!
//! let mut light = Service::new(r#"{"Light": {"methods": {"turnOn": {}}}}"#)?;
//! light.add_handler("turnOn", |_| Ok(serde_json::json!([true])));
//! let light = engine.add_service(light);
//! engine.announce(light)?;
//!
//! loop {
//!     engine.pump_once();
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! # }
//! ```

mod config;
mod dispatch;
mod engine;
mod error;
pub mod logging;

pub use config::{EngineConfig, UnknownCallPolicy};
pub use dispatch::{DropReason, InboundOutcome, PumpReport};
pub use engine::{IotScape, IotScapeBuilder};
pub use error::IotScapeError;

pub use iotscape_protocol::{
    CallEnvelope, Codec, ErrorReplyEnvelope, Event, EventEnvelope, JsonCodec, Map,
    ProtocolError, ReplyEnvelope, ServiceDefinition, Value,
};
pub use iotscape_schedule::{AnnounceConfig, AnnounceScheduler};
pub use iotscape_service::{
    DeviceIdentity, DeviceKey, DeviceRegistry, FixedIdentity, HandlerError, HandlerResult,
    HardwareIdentity, Service, ServiceError, ServiceHandle, param,
};
pub use iotscape_transport::{
    DatagramTransport, MemoryTransport, TransportError, UdpConfig, UdpTransport,
};

pub mod prelude {
    //! Everything an embedding application usually needs.

    pub use crate::{
        AnnounceConfig, DatagramTransport, EngineConfig, FixedIdentity, HandlerError,
        HandlerResult, HardwareIdentity, InboundOutcome, IotScape, IotScapeError, JsonCodec,
        Map, MemoryTransport, PumpReport, Service, ServiceHandle, UdpConfig, UdpTransport,
        UnknownCallPolicy, Value, param,
    };
}
