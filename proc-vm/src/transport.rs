//! Abstraction over the connection-oriented small-packet transport.
//!
//! The network is consumed as an opaque service: fixed-capacity datagrams
//! with a priority field, exchanged over short-lived connections to a
//! numbered port on a numbered node. [`mem::MemNetwork`] provides the
//! in-process implementation used by the test suite.

use std::time::Duration;

use thiserror::Error;

pub mod mem;

/// Delivery priority of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Priority {
    /// Highest priority.
    Critical = 0,
    /// Above-normal priority, used for slot-keyed requests.
    High = 1,
    /// Default priority.
    #[default]
    Norm = 2,
    /// Background priority.
    Low = 3,
}

/// One transport datagram.
///
/// `data` holds at most [`proc_asm::PACKET_DATA_SIZE`] bytes; the transport
/// refuses larger payloads at send time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    /// Delivery priority.
    pub priority: Priority,
    /// Payload bytes.
    pub data: Vec<u8>,
}

impl Packet {
    /// Packet with the given payload at normal priority.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            priority: Priority::Norm,
            data,
        }
    }

    /// Same packet at a different priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Transport failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// No route or listener for the addressed node and port.
    #[error("connection to node {0} refused")]
    ConnectionRefused(u16),
    /// The peer went away.
    #[error("connection closed")]
    Closed,
    /// Nothing arrived within the allotted time.
    #[error("transport operation timed out")]
    Timeout,
    /// The payload exceeds the transport's fixed buffer size.
    #[error("packet payload of {0} bytes exceeds the buffer size")]
    Oversize(usize),
}

/// One open connection.
pub trait Connection: Send {
    /// Send one packet.
    fn send(&mut self, packet: Packet) -> Result<(), TransportError>;

    /// Receive one packet, waiting at most `timeout`.
    fn recv(&mut self, timeout: Duration) -> Result<Packet, TransportError>;
}

/// Connection-oriented transport bound to one node address.
pub trait Transport: Send + Sync {
    /// Connection type produced by [`Transport::connect`].
    type Conn: Connection;

    /// Open a connection to `port` on `node`.
    fn connect(&self, node: u16, port: u8, timeout: Duration) -> Result<Self::Conn, TransportError>;

    /// Addresses of this node's own interfaces.
    fn local_addresses(&self) -> Vec<u16>;
}

/// Accept side of a bound service port.
pub trait Listener: Send {
    /// Connection type produced by [`Listener::accept`].
    type Conn: Connection;

    /// Wait for the next incoming connection.
    fn accept(&self) -> Result<Self::Conn, TransportError>;
}
