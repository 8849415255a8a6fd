/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A close was already requested for this connection.
    #[error("connection is closing")]
    Closed,

    /// The outbound queue overflowed; the connection was force-closed.
    #[error("send queue full, connection dropped")]
    SendQueueFull,

    /// Reading from the socket failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
