//! Per-connection text encodings, negotiated with the SETCODEPAGE command.
//!
//! Period clients name encodings by platform codepage number ("1252",
//! sometimes prefixed "Cp"). Numbers are mapped onto WHATWG encoding
//! labels and resolved through `encoding_rs`. The default is a strict
//! 7-bit ASCII mode matching what unnegotiated clients expect.

use encoding_rs::Encoding;

use crate::ProtocolError;

/// Name reported for the default encoding before any negotiation.
const ASCII_NAME: &str = "us-ascii";

/// A resolved per-connection text encoding.
///
/// `None` for the encoding means the 7-bit ASCII default: inbound bytes
/// above 0x7F and outbound characters outside ASCII are replaced with `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codepage {
    name: String,
    encoding: Option<&'static Encoding>,
}

impl Codepage {
    /// The default 7-bit ASCII codepage.
    pub fn ascii() -> Self {
        Self {
            name: ASCII_NAME.to_string(),
            encoding: None,
        }
    }

    /// Resolves a platform codepage name.
    ///
    /// Accepts a bare number ("1252"), a `Cp`-prefixed form ("Cp1252"),
    /// or an explicit ASCII name.
    ///
    /// # Errors
    /// `UnsupportedCodepage` if the name maps to no known encoding.
    pub fn for_name(name: &str) -> Result<Self, ProtocolError> {
        let bare = name
            .strip_prefix("Cp")
            .or_else(|| name.strip_prefix("cp"))
            .unwrap_or(name);

        if bare.eq_ignore_ascii_case("ascii")
            || bare.eq_ignore_ascii_case(ASCII_NAME)
        {
            return Ok(Self::ascii());
        }

        let encoding = lookup(bare)
            .ok_or_else(|| ProtocolError::UnsupportedCodepage(name.to_string()))?;
        Ok(Self {
            name: bare.to_string(),
            encoding: Some(encoding),
        })
    }

    /// The negotiated name, as reported by GETCODEPAGE.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decodes one received line.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self.encoding {
            Some(enc) => {
                let (text, _, _) = enc.decode(bytes);
                text.into_owned()
            }
            None => bytes
                .iter()
                .map(|&b| if b < 0x80 { b as char } else { '?' })
                .collect(),
        }
    }

    /// Encodes one outbound line (terminator not included).
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self.encoding {
            Some(enc) => {
                let (bytes, _, _) = enc.encode(text);
                bytes.into_owned()
            }
            None => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }
}

impl Default for Codepage {
    fn default() -> Self {
        Self::ascii()
    }
}

/// Maps a platform codepage number to an encoding.
///
/// The East-Asian pages predate the `windows-*` label family, so they
/// carry their own entries; everything else is tried as `windows-{n}`.
fn lookup(bare: &str) -> Option<&'static Encoding> {
    let label = match bare {
        "932" => "shift_jis".to_string(),
        "936" => "gbk".to_string(),
        "949" => "euc-kr".to_string(),
        "950" => "big5".to_string(),
        n if n.chars().all(|c| c.is_ascii_digit()) => format!("windows-{n}"),
        other => other.to_string(),
    };
    Encoding::for_label(label.as_bytes())
}
