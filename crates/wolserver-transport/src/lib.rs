//! Transport layer for wolserver.
//!
//! Provides the TCP listener ([`TcpTransport`]) and per-connection
//! primitives ([`TcpConnection`], [`ConnectionHandle`]) shared by every
//! service port: chat, gameres intake, bootstrap redirect, and ladder.
//!
//! A connection is split at accept time into a read half, owned by the
//! service's handler task, and a cloneable write handle backed by a
//! bounded outbound queue. A peer that stalls long enough to fill its
//! queue is force-closed rather than awaited.

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{ConnectionHandle, TcpConnection, TcpTransport, SENDQ_LINES};

use std::fmt;
use std::net::IpAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Write-side capability a protocol engine needs from a connection.
///
/// Engines hold the sink, never the socket: queue bytes for send, request
/// close, observe close state. [`ConnectionHandle`] is the production
/// implementation; tests substitute an in-memory sink.
pub trait ByteSink: Send + 'static {
    /// Queues bytes for delivery to the peer.
    ///
    /// # Errors
    /// `SendQueueFull` if the outbound queue overflowed (the connection
    /// has already been force-closed when this is returned), or `Closed`
    /// if a close was previously requested.
    fn try_send(&self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Requests close. Graceful defers until queued output has drained;
    /// non-graceful abandons pending output and tears down immediately.
    fn close(&self, graceful: bool);

    /// True once any close has been requested on this connection.
    fn is_closing(&self) -> bool;

    /// Remote peer address.
    fn peer_ip(&self) -> IpAddr;
}
