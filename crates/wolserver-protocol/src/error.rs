/// Errors that can occur in the line-protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// No known codepage matches the requested name. The connection's
    /// current codepage is left untouched.
    #[error("unsupported codepage: {0}")]
    UnsupportedCodepage(String),

    /// Unterminated inbound data exceeded the line buffer capacity.
    #[error("line exceeds maximum length ({0} bytes)")]
    LineTooLong(usize),
}
