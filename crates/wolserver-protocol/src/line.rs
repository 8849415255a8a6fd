//! Line framing over a connection's inbound byte stream.

use bytes::{Buf, BytesMut};

use crate::{Codepage, ProtocolError};

/// Maximum buffered unterminated bytes before the connection is dropped.
pub const MAX_LINE_BYTES: usize = 4096;

/// Accumulates inbound bytes and splits them into decoded protocol lines.
///
/// Lines terminate on `\n`; a single preceding `\r` is tolerated and
/// stripped. Empty lines are skipped. The framer owns the connection's
/// current [`Codepage`]: inbound lines are decoded with it, and callers
/// use the same codepage to encode replies.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
    codepage: Codepage,
}

impl LineFramer {
    /// Creates a framer with the default ASCII codepage.
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection's current codepage.
    pub fn codepage(&self) -> &Codepage {
        &self.codepage
    }

    /// Switches the codepage.
    ///
    /// # Errors
    /// `UnsupportedCodepage` for an unknown name; the current codepage
    /// is left unchanged.
    pub fn set_codepage(&mut self, name: &str) -> Result<(), ProtocolError> {
        self.codepage = Codepage::for_name(name)?;
        Ok(())
    }

    /// Appends newly received bytes and returns every complete line they
    /// finish, in arrival order.
    ///
    /// Unterminated trailing bytes stay buffered for the next delivery.
    ///
    /// # Errors
    /// `LineTooLong` once more than [`MAX_LINE_BYTES`] unterminated bytes
    /// accumulate; callers treat this as resource exhaustion and drop the
    /// connection.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ProtocolError> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.split_to(pos);
            self.buf.advance(1); // the terminator itself
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if !line.is_empty() {
                lines.push(self.codepage.decode(&line));
            }
        }

        if self.buf.len() > MAX_LINE_BYTES {
            return Err(ProtocolError::LineTooLong(MAX_LINE_BYTES));
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_newline_and_strips_carriage_return() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"NICK Alice\r\nUSER a a a :a\n").unwrap();
        assert_eq!(lines, vec!["NICK Alice", "USER a a a :a"]);
    }

    #[test]
    fn test_keeps_partial_line_until_terminated() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"PASS super").unwrap().is_empty());
        let lines = framer.push(b"secret\r\n").unwrap();
        assert_eq!(lines, vec!["PASS supersecret"]);
    }

    #[test]
    fn test_skips_empty_lines() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"\r\n\nPING :x\r\n\r\n").unwrap();
        assert_eq!(lines, vec!["PING :x"]);
    }

    #[test]
    fn test_only_one_carriage_return_is_stripped() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"QUIT\r\r\n").unwrap();
        assert_eq!(lines, vec!["QUIT\r"]);
    }

    #[test]
    fn test_overlong_unterminated_input_errors() {
        let mut framer = LineFramer::new();
        let err = framer.push(&[b'a'; MAX_LINE_BYTES + 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::LineTooLong(_)));
    }

    #[test]
    fn test_decodes_with_the_negotiated_codepage() {
        let mut framer = LineFramer::new();
        framer.set_codepage("1252").unwrap();
        let lines = framer.push(b"PRIVMSG #x :caf\xe9\r\n").unwrap();
        assert_eq!(lines, vec!["PRIVMSG #x :caf\u{e9}"]);
    }

    #[test]
    fn test_failed_codepage_switch_keeps_current_state() {
        let mut framer = LineFramer::new();
        framer.set_codepage("1252").unwrap();
        assert!(framer.set_codepage("bogus").is_err());
        assert_eq!(framer.codepage().name(), "1252");
    }
}
