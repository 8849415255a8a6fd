//! Engine core: owned state, lifecycle entry points, reply plumbing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use wolserver_transport::{ByteSink, ConnectionId};

use crate::ChatConfig;
use crate::channel::Channel;
use crate::client::Client;

/// Idle threshold: a keepalive PING is sent once this much time passes
/// without a line from the client.
pub const IDLE_AFTER: Duration = Duration::from_secs(30);

/// Timeout threshold: the client is dropped once this much time passes
/// without a line.
pub const TIMEOUT_AFTER: Duration = Duration::from_secs(60);

/// The chat/lobby protocol engine.
///
/// Single-owner by construction: whoever holds the engine serializes all
/// access (the server keeps it behind one async mutex), so every handler
/// runs to completion before the next event is processed.
pub struct ChatEngine<S> {
    pub(crate) config: ChatConfig,
    pub(crate) clients: HashMap<ConnectionId, Client<S>>,
    /// The directory: registered nickname → client.
    pub(crate) nicks: HashMap<String, ConnectionId>,
    pub(crate) channels: HashMap<String, Channel>,
}

impl<S: ByteSink> ChatEngine<S> {
    /// Creates an engine with its permanent lobbies in place.
    pub fn new(config: ChatConfig) -> Self {
        let channels = config
            .lobbies
            .iter()
            .map(|l| {
                (l.name.clone(), Channel::lobby(&l.name, &l.key, l.game_type))
            })
            .collect();
        Self {
            config,
            clients: HashMap::new(),
            nicks: HashMap::new(),
            channels,
        }
    }

    /// Registers a freshly accepted connection with the engine.
    pub fn on_connect(&mut self, id: ConnectionId, sink: S, now: Instant) {
        tracing::info!(%id, "client connected to chat service");
        self.clients.insert(id, Client::new(id, sink, now));
    }

    /// Feeds newly received bytes for one connection.
    ///
    /// Every complete line in the delivery is dispatched in order, except
    /// that once a disconnect becomes pending the remaining buffered
    /// lines are discarded — no handler runs after a fatal condition in
    /// the same batch.
    pub fn on_bytes(&mut self, id: ConnectionId, bytes: &[u8], now: Instant) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        let lines = match client.framer.push(bytes) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(%id, error = %e, "inbound buffer overflow, dropping connection");
                client.close(false);
                return;
            }
        };

        for line in lines {
            match self.clients.get_mut(&id) {
                Some(client) if !client.is_closing() => {
                    client.last_activity = now;
                    client.idle = false;
                }
                _ => {
                    tracing::debug!(%id, "discarding buffered lines after disconnect");
                    break;
                }
            }
            tracing::trace!(%id, %line, "<-");
            self.dispatch(id, &line);
        }
    }

    /// Periodic per-connection tick: drives the idle/timeout policy.
    pub fn on_tick(&mut self, id: ConnectionId, now: Instant) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        if client.is_closing() {
            return;
        }
        let quiet = now.duration_since(client.last_activity);
        if quiet > TIMEOUT_AFTER {
            tracing::info!(%id, "ping timeout");
            client.send_line("ERROR :Ping timeout");
            client.close(false);
        } else if quiet > IDLE_AFTER && !client.idle {
            client.idle = true;
            let ping = format!("PING :{}", self.config.server_name);
            client.send_line(&ping);
        }
    }

    /// Removes a closed connection from the engine: directory entry,
    /// every channel membership, and any emptied transient channels.
    pub fn on_disconnect(&mut self, id: ConnectionId) {
        let Some(client) = self.clients.remove(&id) else {
            return;
        };
        tracing::info!(%id, nick = client.display_nick(), "client disconnected");

        if let Some(nick) = &client.nick {
            if self.nicks.get(nick) == Some(&id) {
                self.nicks.remove(nick);
            }
        }

        let nick = client.display_nick().to_string();
        let mut parted = Vec::new();
        for (name, channel) in &mut self.channels {
            if channel.remove(id) {
                parted.push(name.clone());
            }
        }
        for name in parted {
            let line = user_line(&nick, "PART", &name);
            self.broadcast(&name, &line, None);
            self.drop_if_empty(&name);
        }
    }

    // --- introspection (used by the server and tests) ---

    /// Looks up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Resolves a registered nickname.
    pub fn nick_id(&self, nick: &str) -> Option<ConnectionId> {
        self.nicks.get(nick).copied()
    }

    /// Whether the client completed the registration sequence.
    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.clients.get(&id).is_some_and(|c| c.registered)
    }

    /// Number of live client records.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Deferred option-broadcast lines held for a client.
    pub fn gameopt_pending(&self, id: ConnectionId) -> usize {
        self.clients
            .get(&id)
            .map_or(0, |c| c.gameopt_queue.len())
    }

    // --- reply plumbing ---

    /// Sends a numeric reply: `:<server> <code> <nick> <params>`.
    pub(crate) fn reply(&self, id: ConnectionId, code: u16, params: &str) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        let line = if params.is_empty() {
            format!(
                ":{} {} {}",
                self.config.server_name,
                code,
                client.display_nick()
            )
        } else {
            format!(
                ":{} {} {} {}",
                self.config.server_name,
                code,
                client.display_nick(),
                params
            )
        };
        client.send_line(&line);
    }

    pub(crate) fn need_more_params(&self, id: ConnectionId) {
        self.reply(
            id,
            wolserver_protocol::numeric::ERR_NEEDMOREPARAMS,
            ":Not enough parameters",
        );
    }

    /// Sends a raw line (no server prefix) to one client.
    pub(crate) fn send_to(&self, id: ConnectionId, line: &str) {
        if let Some(client) = self.clients.get(&id) {
            client.send_line(line);
        }
    }

    /// Sends a line to every member of a channel, optionally skipping one.
    pub(crate) fn broadcast(
        &self,
        channel: &str,
        line: &str,
        skip: Option<ConnectionId>,
    ) {
        let Some(channel) = self.channels.get(channel) else {
            return;
        };
        for member in channel.members() {
            if Some(*member) != skip {
                self.send_to(*member, line);
            }
        }
    }

    /// Removes a transient channel the moment it empties.
    pub(crate) fn drop_if_empty(&mut self, name: &str) {
        let emptied = self
            .channels
            .get(name)
            .is_some_and(|c| !c.is_permanent() && c.member_count() == 0);
        if emptied {
            self.channels.remove(name);
            tracing::info!(channel = name, "removed empty game channel");
        }
    }

    pub(crate) fn nick_of(&self, id: ConnectionId) -> Option<String> {
        self.clients.get(&id).and_then(|c| c.nick.clone())
    }

    pub(crate) fn close(&self, id: ConnectionId, graceful: bool) {
        if let Some(client) = self.clients.get(&id) {
            client.close(graceful);
        }
    }
}

/// Formats a client-originated broadcast: `:<nick>!u@h <CMD> <params>`.
pub(crate) fn user_line(nick: &str, command: &str, params: &str) -> String {
    format!(":{nick}!u@h {command} {params}")
}
