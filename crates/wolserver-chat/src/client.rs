//! Per-connection session state.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::Instant;

use wolserver_protocol::LineFramer;
use wolserver_transport::{ByteSink, ConnectionId};

/// Option-1 bit: the client may be located with FINDUSEREX.
pub const OPT1_ALLOW_FIND: u32 = 1;
/// Option-2 bit: the client accepts PAGE messages.
pub const OPT2_ALLOW_PAGE: u32 = 1;

/// One connected chat client.
///
/// Owned by the engine's client map; channels reference it by
/// [`ConnectionId`] only.
pub(crate) struct Client<S> {
    pub(crate) id: ConnectionId,
    sink: S,
    peer_ip: IpAddr,

    /// Pending until registration completes, the directory key after.
    pub(crate) nick: Option<String>,
    pub(crate) registered: bool,
    pub(crate) have_password: bool,

    pub(crate) opt1: u32,
    pub(crate) opt2: u32,
    pub(crate) locale: String,

    pub(crate) framer: LineFramer,
    pub(crate) last_activity: Instant,
    pub(crate) idle: bool,

    /// True once this client has announced readiness for direct option
    /// messages; gates the deferred queue below.
    pub(crate) gameopt_confirmed: bool,
    /// Fully formatted lines held back until the client confirms.
    pub(crate) gameopt_queue: VecDeque<String>,
}

impl<S: ByteSink> Client<S> {
    pub(crate) fn new(id: ConnectionId, sink: S, now: Instant) -> Self {
        let peer_ip = sink.peer_ip();
        Self {
            id,
            sink,
            peer_ip,
            nick: None,
            registered: false,
            have_password: false,
            opt1: 0,
            opt2: 0,
            locale: "0".to_string(),
            framer: LineFramer::new(),
            last_activity: now,
            idle: false,
            gameopt_confirmed: false,
            gameopt_queue: VecDeque::new(),
        }
    }

    pub(crate) fn peer_ip(&self) -> IpAddr {
        self.peer_ip
    }

    /// The nickname for reply formatting; `*` before NICK is accepted.
    pub(crate) fn display_nick(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    pub(crate) fn can_find(&self) -> bool {
        self.opt1 & OPT1_ALLOW_FIND != 0
    }

    pub(crate) fn can_page(&self) -> bool {
        self.opt2 & OPT2_ALLOW_PAGE != 0
    }

    /// Encodes a line with this client's codepage and queues it for send.
    pub(crate) fn send_line(&self, line: &str) {
        tracing::trace!(id = %self.id, line, "->");
        let mut bytes = self.framer.codepage().encode(line);
        bytes.extend_from_slice(b"\r\n");
        if let Err(e) = self.sink.try_send(bytes) {
            tracing::debug!(id = %self.id, error = %e, "dropped outbound line");
        }
    }

    pub(crate) fn close(&self, graceful: bool) {
        self.sink.close(graceful);
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.sink.is_closing()
    }
}
