//! TCP transport: listener plus the split read-half/write-handle pair.
//!
//! The write side of every connection runs as its own task draining a
//! bounded queue. Queue overflow means the peer has stalled; per the
//! wire-compatibility contract the connection is force-closed rather
//! than letting one dead peer back-pressure the whole server.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::{ByteSink, ConnectionId, TransportError};

/// Outbound queue capacity, in queued messages.
pub const SENDQ_LINES: usize = 64;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Commands drained by the writer task, in queue order.
enum Outbound {
    Data(Vec<u8>),
    /// Drain marker for a graceful close: everything queued before it is
    /// written out, then the socket is shut down.
    Close,
}

/// A TCP listener that produces [`TcpConnection`]s.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "transport listening");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for and accepts the next incoming connection.
    pub async fn accept(&mut self) -> Result<TcpConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, "accepted connection");

        Ok(TcpConnection::new(id, peer, stream))
    }
}

/// An accepted connection, not yet split.
pub struct TcpConnection {
    reader: OwnedReadHalf,
    handle: ConnectionHandle,
}

impl TcpConnection {
    fn new(id: ConnectionId, peer: SocketAddr, stream: TcpStream) -> Self {
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();

        let (queue, queue_rx) = mpsc::channel(SENDQ_LINES);
        let shutdown = Arc::new(watch::channel(false).0);
        tokio::spawn(writer_task(queue_rx, writer, Arc::clone(&shutdown)));

        let handle = ConnectionHandle {
            id,
            peer,
            queue,
            closing: Arc::new(AtomicBool::new(false)),
            shutdown,
        };
        Self { reader, handle }
    }

    /// Returns this connection's identifier.
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    /// Returns the remote peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.handle.peer_addr()
    }

    /// Splits into the read half (owned by the handler task) and the
    /// cloneable write handle.
    pub fn split(self) -> (OwnedReadHalf, ConnectionHandle) {
        (self.reader, self.handle)
    }
}

/// Cloneable write side of a connection.
///
/// All sends are non-blocking; the backing writer task owns the socket's
/// write half. Close state is shared between all clones.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    queue: mpsc::Sender<Outbound>,
    closing: Arc<AtomicBool>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    /// Returns this connection's identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the remote peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Resolves once the connection is fully torn down (force close, or
    /// graceful close after the queue drained, or writer I/O failure).
    pub async fn closed(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|down| *down).await;
    }

    fn force_close(&self) {
        self.closing.store(true, Ordering::Relaxed);
        // send_replace, not send: the signal must stick even if no task
        // is subscribed at this instant.
        let _ = self.shutdown.send_replace(true);
    }
}

impl ByteSink for ConnectionHandle {
    fn try_send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closing() {
            return Err(TransportError::Closed);
        }
        match self.queue.try_send(Outbound::Data(bytes)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    id = %self.id,
                    peer = %self.peer,
                    "send queue full, dropping connection"
                );
                self.force_close();
                Err(TransportError::SendQueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(TransportError::Closed)
            }
        }
    }

    fn close(&self, graceful: bool) {
        let was_closing = self.closing.swap(true, Ordering::Relaxed);
        if graceful {
            if was_closing {
                return;
            }
            // The marker queues behind pending output; if the queue is
            // already unusable there is nothing left to drain.
            if self.queue.try_send(Outbound::Close).is_err() {
                let _ = self.shutdown.send_replace(true);
            }
        } else {
            let _ = self.shutdown.send_replace(true);
        }
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Relaxed) || *self.shutdown.borrow()
    }

    fn peer_ip(&self) -> IpAddr {
        self.peer.ip()
    }
}

/// Drains the outbound queue onto the socket until a close.
async fn writer_task(
    mut queue: mpsc::Receiver<Outbound>,
    mut writer: OwnedWriteHalf,
    shutdown: Arc<watch::Sender<bool>>,
) {
    let mut down = shutdown.subscribe();
    loop {
        tokio::select! {
            biased;
            // Force close: abandon whatever is still queued.
            () = async { let _ = down.wait_for(|d| *d).await; } => break,
            cmd = queue.recv() => match cmd {
                Some(Outbound::Data(bytes)) => {
                    if writer.write_all(&bytes).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = writer.shutdown().await;
                    break;
                }
            },
        }
    }
    // Wake the reader side so the handler task exits too.
    let _ = shutdown.send_replace(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn pair() -> (TcpStream, TcpConnection) {
        let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();
        let (client, conn) =
            tokio::join!(TcpStream::connect(addr), transport.accept());
        (client.unwrap(), conn.unwrap())
    }

    #[tokio::test]
    async fn test_sent_bytes_reach_the_peer() {
        let (mut client, conn) = pair().await;
        let (_reader, handle) = conn.split();

        handle.try_send(b"hello\r\n".to_vec()).unwrap();

        let mut buf = [0u8; 7];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\r\n");
    }

    #[tokio::test]
    async fn test_graceful_close_drains_queued_output_first() {
        let (mut client, conn) = pair().await;
        let (_reader, handle) = conn.split();

        handle.try_send(b"goodbye\r\n".to_vec()).unwrap();
        handle.close(true);

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"goodbye\r\n");
    }

    #[tokio::test]
    async fn test_force_close_signals_closed() {
        let (_client, conn) = pair().await;
        let (_reader, handle) = conn.split();

        assert!(!handle.is_closing());
        handle.close(false);
        assert!(handle.is_closing());
        handle.closed().await;
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        let (_client, conn) = pair().await;
        let (_reader, handle) = conn.split();

        handle.close(false);
        let err = handle.try_send(b"late\r\n".to_vec()).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_peer_sees_eof_after_force_close() {
        let (mut client, conn) = pair().await;
        let (_reader, handle) = conn.split();

        handle.close(false);

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }
}
