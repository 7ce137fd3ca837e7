//! Datagram transport layer for IoTScape devices.
//!
//! Provides the [`DatagramTransport`] trait that the engine polls for
//! inbound calls and writes replies, events and announces through. Every
//! send goes to one fixed server endpoint; every receive comes from the
//! local port regardless of source.
//!
//! # Feature Flags
//!
//! - `udp` (default): non-blocking UDP transport over `std::net::UdpSocket`

mod error;
mod memory;
#[cfg(feature = "udp")]
mod udp;

pub use error::TransportError;
pub use memory::MemoryTransport;
#[cfg(feature = "udp")]
pub use udp::{UdpConfig, UdpTransport};

/// Sends and receives whole datagrams to/from the server.
///
/// Both methods must return immediately. The engine calls
/// [`poll_recv`](Self::poll_recv) once per pump and treats `Ok(None)` as
/// "nothing ready yet".
pub trait DatagramTransport: Send + 'static {
    /// Sends one datagram to the server endpoint.
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError>;

    /// Returns the next received datagram, or `None` if none is ready.
    fn poll_recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

impl<T: DatagramTransport + ?Sized> DatagramTransport for Box<T> {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        (**self).send(datagram)
    }

    fn poll_recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).poll_recv()
    }
}
