//! Services, handlers and device identity for IoTScape.
//!
//! This crate holds everything that belongs to one logical capability of
//! the device:
//!
//! 1. **Identity**: deriving the hex device ID from hardware bytes
//!    ([`HardwareIdentity`], [`DeviceIdentity`])
//! 2. **Handlers**: what runs when the server calls a method
//!    ([`HandlerTable`], [`HandlerError`], [`param`])
//! 3. **Services**: a definition, its handlers and its announce timer
//!    ([`Service`])
//! 4. **Routing**: which service answers for `"<service>:<device>"`
//!    ([`DeviceRegistry`], [`DeviceKey`], [`ServiceHandle`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)     ← owns services and the registry, pumps datagrams
//!     ↕
//! Service (this crate)
//!     ↕
//! Protocol (below)   ← envelopes and the definition document
//! ```

mod error;
mod handler;
mod identity;
mod registry;
mod service;

pub use error::{HandlerError, ServiceError};
pub use handler::{Handler, HandlerResult, HandlerTable, param};
pub use identity::{DeviceIdentity, FixedIdentity, HardwareIdentity};
pub use registry::{DeviceKey, DeviceRegistry, ServiceHandle};
pub use service::{CallOutcome, Service};
