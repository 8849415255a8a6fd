//! Wire protocol layer for wolserver.
//!
//! Three concerns live here, all of them stateless or per-connection:
//!
//! - [`LineFramer`] turns a raw byte stream into discrete protocol lines
//!   under a per-connection [`Codepage`].
//! - [`Message`] parses one line into `(prefix, command, params)` using
//!   the IRC-style trailing-parameter convention; [`numeric`] carries the
//!   reply codes the chat service emits.
//! - [`gameres`] decodes the binary post-match report format into typed
//!   values.

mod codepage;
mod error;
pub mod gameres;
mod line;
mod message;
pub mod numeric;

pub use codepage::Codepage;
pub use error::ProtocolError;
pub use line::{LineFramer, MAX_LINE_BYTES};
pub use message::Message;
