//! Non-blocking UDP transport.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use crate::{DatagramTransport, TransportError};

/// UDP endpoint configuration.
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Where every datagram is sent.
    pub server_addr: SocketAddr,
    /// Local address to bind for receiving calls.
    pub local_addr: SocketAddr,
    /// Receive buffer size. Longer datagrams are truncated by the OS.
    pub max_datagram_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([129, 59, 105, 37], 1975)),
            local_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            max_datagram_size: 8192,
        }
    }
}

/// A [`DatagramTransport`] over a single non-blocking UDP socket.
pub struct UdpTransport {
    socket: UdpSocket,
    server_addr: SocketAddr,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Binds the local socket and switches it to non-blocking mode.
    pub fn bind(config: UdpConfig) -> Result<Self, TransportError> {
        let socket =
            UdpSocket::bind(config.local_addr).map_err(TransportError::BindFailed)?;
        socket
            .set_nonblocking(true)
            .map_err(TransportError::BindFailed)?;

        tracing::info!(
            local = ?socket.local_addr().ok(),
            server = %config.server_addr,
            "UDP transport bound"
        );

        Ok(Self {
            socket,
            server_addr: config.server_addr,
            buf: vec![0u8; config.max_datagram_size.max(1)],
        })
    }

    /// Returns the address the socket is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// The server endpoint every datagram is sent to.
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }
}

impl DatagramTransport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let sent = self
            .socket
            .send_to(datagram, self.server_addr)
            .map_err(TransportError::SendFailed)?;
        if sent != datagram.len() {
            tracing::warn!(sent, len = datagram.len(), "short UDP send");
        }
        tracing::trace!(len = datagram.len(), server = %self.server_addr, "datagram sent");
        Ok(())
    }

    fn poll_recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, from)) => {
                tracing::trace!(len, %from, "datagram received");
                Ok(Some(self.buf[..len].to_vec()))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::ReceiveFailed(e)),
        }
    }
}
