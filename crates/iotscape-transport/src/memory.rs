//! In-process transport backed by shared queues.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{DatagramTransport, TransportError};

#[derive(Debug, Default)]
struct Queues {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<Vec<u8>>,
    closed: bool,
}

/// A [`DatagramTransport`] that never touches the network.
///
/// Clones share the same queues: hand one clone to the engine and keep
/// another to play the server side, pushing calls with
/// [`push_inbound`](Self::push_inbound) and collecting whatever the engine
/// sent with [`take_outbound`](Self::take_outbound).
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    queues: Arc<Mutex<Queues>>,
}

impl MemoryTransport {
    /// Creates a transport with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a datagram as if it had arrived from the server.
    pub fn push_inbound(&self, datagram: impl Into<Vec<u8>>) {
        self.lock().inbound.push_back(datagram.into());
    }

    /// Drains every datagram sent so far, oldest first.
    pub fn take_outbound(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.lock().outbound)
    }

    /// Number of inbound datagrams not yet polled.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Closes the transport. Later sends and polls fail with
    /// [`TransportError::Closed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        // A panicking test thread must not poison the other clone.
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DatagramTransport for MemoryTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let mut queues = self.lock();
        if queues.closed {
            return Err(TransportError::Closed);
        }
        queues.outbound.push(datagram.to_vec());
        Ok(())
    }

    fn poll_recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut queues = self.lock();
        if queues.closed {
            return Err(TransportError::Closed);
        }
        Ok(queues.inbound.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_queues() {
        let server = MemoryTransport::new();
        let mut device = server.clone();

        server.push_inbound(b"ping".to_vec());
        assert_eq!(server.pending_inbound(), 1);
        assert_eq!(device.poll_recv().unwrap(), Some(b"ping".to_vec()));
        assert_eq!(server.pending_inbound(), 0);

        device.send(b"pong").unwrap();
        assert_eq!(server.take_outbound(), vec![b"pong".to_vec()]);
        assert!(server.take_outbound().is_empty());
    }

    #[test]
    fn test_poll_on_empty_queue_returns_none() {
        let mut t = MemoryTransport::new();
        assert_eq!(t.poll_recv().unwrap(), None);
    }

    #[test]
    fn test_inbound_is_fifo() {
        let server = MemoryTransport::new();
        let mut device = server.clone();
        server.push_inbound("first");
        server.push_inbound("second");
        assert_eq!(device.poll_recv().unwrap(), Some(b"first".to_vec()));
        assert_eq!(device.poll_recv().unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn test_closed_transport_rejects_io() {
        let server = MemoryTransport::new();
        let mut device = server.clone();
        server.close();
        assert!(matches!(device.send(b"x"), Err(TransportError::Closed)));
        assert!(matches!(device.poll_recv(), Err(TransportError::Closed)));
    }
}
