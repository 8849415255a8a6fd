//! Unified error type for the wolserver meta crate.

use wolserver_protocol::ProtocolError;
use wolserver_transport::TransportError;

/// Top-level error that wraps the crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, accept, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A line-protocol error (framing, codepage).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: ServerError = TransportError::SendQueueFull.into();
        assert!(matches!(err, ServerError::Transport(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ServerError =
            ProtocolError::UnsupportedCodepage("x".into()).into();
        assert!(matches!(err, ServerError::Protocol(_)));
        assert!(err.to_string().contains("x"));
    }
}
