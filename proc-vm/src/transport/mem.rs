//! In-process transport hub.
//!
//! Routes connections between endpoints registered on the same
//! [`MemNetwork`] over channels. Used by the integration tests to stand up a
//! client and a server node inside one process.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use proc_asm::PACKET_DATA_SIZE;

use super::{Connection, Listener, Packet, Transport, TransportError};

type Routes = HashMap<(u16, u8), Sender<MemConn>>;

/// Shared in-process packet network.
#[derive(Debug, Clone, Default)]
pub struct MemNetwork {
    routes: Arc<Mutex<Routes>>,
}

impl MemNetwork {
    /// Fresh network with no endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Routes> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A transport bound to `addr` on this network.
    pub fn endpoint(&self, addr: u16) -> MemEndpoint {
        MemEndpoint {
            net: self.clone(),
            addr,
        }
    }
}

/// One node's attachment to a [`MemNetwork`].
#[derive(Debug, Clone)]
pub struct MemEndpoint {
    net: MemNetwork,
    addr: u16,
}

impl MemEndpoint {
    /// Bind a service port and return its accept side.
    ///
    /// Rebinding a port replaces the previous listener.
    pub fn bind(&self, port: u8) -> MemListener {
        let (tx, rx) = channel();
        self.net.lock().insert((self.addr, port), tx);
        MemListener { rx }
    }
}

impl Transport for MemEndpoint {
    type Conn = MemConn;

    fn connect(&self, node: u16, port: u8, _timeout: Duration) -> Result<MemConn, TransportError> {
        let route = self
            .net
            .lock()
            .get(&(node, port))
            .cloned()
            .ok_or(TransportError::ConnectionRefused(node))?;

        let (client_tx, server_rx) = channel();
        let (server_tx, client_rx) = channel();
        route
            .send(MemConn {
                tx: server_tx,
                rx: server_rx,
            })
            .map_err(|_| TransportError::ConnectionRefused(node))?;

        Ok(MemConn {
            tx: client_tx,
            rx: client_rx,
        })
    }

    fn local_addresses(&self) -> Vec<u16> {
        vec![self.addr]
    }
}

/// Accept side of a bound port.
#[derive(Debug)]
pub struct MemListener {
    rx: Receiver<MemConn>,
}

impl Listener for MemListener {
    type Conn = MemConn;

    fn accept(&self) -> Result<MemConn, TransportError> {
        self.rx.recv().map_err(|_| TransportError::Closed)
    }
}

/// One side of an open in-process connection.
#[derive(Debug)]
pub struct MemConn {
    tx: Sender<Packet>,
    rx: Receiver<Packet>,
}

impl Connection for MemConn {
    fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        if packet.data.len() > PACKET_DATA_SIZE {
            return Err(TransportError::Oversize(packet.data.len()));
        }
        self.tx.send(packet).map_err(|_| TransportError::Closed)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Packet, TransportError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => TransportError::Timeout,
            RecvTimeoutError::Disconnected => TransportError::Closed,
        })
    }
}
