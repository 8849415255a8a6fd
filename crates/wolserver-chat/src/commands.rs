//! Command dispatch and handlers for the chat service.
//!
//! One method per command, mirroring the wire protocol. Handlers reply
//! with numerics for user errors and never tear down state themselves
//! beyond what the command semantics demand; connection teardown is
//! always routed through the byte sink's close.

use std::time::{SystemTime, UNIX_EPOCH};

use wolserver_protocol::Message;
use wolserver_protocol::numeric::*;
use wolserver_transport::{ByteSink, ConnectionId};

use crate::channel::Channel;
use crate::engine::{ChatEngine, user_line};
use crate::error::{ChannelError, JoinError};

/// Nickname length limit imposed by the period clients' UI.
const MAX_NICK_LEN: usize = 9;

/// Outcome of a channel join attempt whose errors were already replied.
enum JoinOutcome {
    Joined,
    AlreadyMember,
}

impl<S: ByteSink> ChatEngine<S> {
    /// Parses and dispatches one protocol line.
    pub(crate) fn dispatch(&mut self, id: ConnectionId, line: &str) {
        let Some(msg) = Message::parse(line) else {
            return;
        };
        let cmd = msg.command.to_ascii_uppercase();
        let p = &msg.params;

        match cmd.as_str() {
            // Login-sequence chatter the clients emit; accepted, ignored.
            "CVERS" | "APGAR" | "SERIAL" | "VERCHK" | "USERIP" | "PONG" => {}

            "PASS" => self.cmd_pass(id, p),
            "NICK" => self.cmd_nick(id, p),
            "USER" => self.cmd_user(id, p),
            "SETOPT" => self.cmd_setopt(id, p),
            "GETLOCALE" => self.cmd_getlocale(id, p),
            "SETLOCALE" => self.cmd_setlocale(id, p),
            "GETCODEPAGE" => self.cmd_getcodepage(id, p),
            "SETCODEPAGE" => self.cmd_setcodepage(id, p),
            "QUIT" => self.cmd_quit(id),

            _ if !self.is_registered(id) => {
                tracing::debug!(%id, command = %cmd, "command before registration ignored");
            }

            "LIST" => self.cmd_list(id, p),
            "JOIN" => self.cmd_join(id, p),
            "JOINGAME" => self.cmd_joingame(id, p),
            "TOPIC" => self.cmd_topic(id, p),
            "GAMEOPT" => self.cmd_gameopt(id, p),
            "KICK" => self.cmd_kick(id, p),
            "MODE" => self.cmd_mode(id, p),
            "PRIVMSG" => self.cmd_privmsg(id, p),
            "PAGE" => self.cmd_page(id, p),
            "FINDUSEREX" => self.cmd_finduserex(id, p),
            "STARTG" => self.cmd_startg(id, p),
            "PART" => self.cmd_part(id, p),

            _ => tracing::debug!(%id, command = %cmd, "unknown command ignored"),
        }
    }

    // --- registration sequence ---

    fn cmd_pass(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        if p[0] != self.config.password {
            self.reply(
                id,
                ERR_PASSWDMISMATCH,
                &format!(":Password incorrect ({})", p[0]),
            );
            self.close(id, true);
            return;
        }
        if let Some(client) = self.clients.get_mut(&id) {
            client.have_password = true;
        }
    }

    fn cmd_nick(&mut self, id: ConnectionId, p: &[String]) {
        // The nickname is the directory key once registered; there is no
        // rename operation in this protocol.
        if self.is_registered(id) {
            tracing::debug!(%id, "NICK after registration ignored");
            return;
        }
        let Some(nick) = p.first().filter(|n| !n.is_empty()) else {
            return self.reply(id, ERR_NONICKNAMEGIVEN, ":No nickname given");
        };
        if nick.len() > MAX_NICK_LEN {
            return self.reply(
                id,
                ERR_ERRONEUSNICKNAME,
                &format!("{nick} :Erroneous nickname"),
            );
        }
        if self.nicks.contains_key(nick.as_str()) {
            return self.reply(
                id,
                ERR_NICKNAMEINUSE,
                &format!("{nick} :Nickname is already in use"),
            );
        }
        let nick = nick.clone();
        if let Some(client) = self.clients.get_mut(&id) {
            client.nick = Some(nick);
        }
    }

    fn cmd_user(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 4 {
            return self.need_more_params(id);
        }
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        if client.registered {
            return self.reply(
                id,
                ERR_ALREADYREGISTERED,
                ":You have already registered",
            );
        }
        if !client.have_password {
            self.reply(id, ERR_PASSWDMISMATCH, ":Password incorrect");
            self.close(id, true);
            return;
        }
        let Some(nick) = client.nick.clone() else {
            return;
        };
        // The pending nickname may have been registered by someone else
        // since the NICK command was accepted.
        if self.nicks.contains_key(&nick) {
            return self.reply(
                id,
                ERR_NICKNAMEINUSE,
                &format!("{nick} :Nickname is already in use"),
            );
        }
        self.nicks.insert(nick.clone(), id);
        if let Some(client) = self.clients.get_mut(&id) {
            client.registered = true;
        }
        tracing::info!(%id, %nick, "client registered");
        self.send_motd(id);
    }

    fn send_motd(&self, id: ConnectionId) {
        self.reply(
            id,
            RPL_MOTDSTART,
            &format!(":- {} Message of the day -", self.config.server_name),
        );
        for line in &self.config.motd {
            self.reply(id, RPL_MOTD, &format!(":- {line}"));
        }
        self.reply(id, RPL_ENDOFMOTD, ":End of MOTD");
    }

    // --- client options, locale, codepage ---

    fn cmd_setopt(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let mut parts = p[0].split(',');
        let opt1 = parts.next().and_then(|v| v.parse::<u32>().ok());
        let opt2 = parts.next().and_then(|v| v.parse::<u32>().ok());
        if let Some(client) = self.clients.get_mut(&id) {
            if let Some(v) = opt1 {
                client.opt1 = v;
            }
            if let Some(v) = opt2 {
                client.opt2 = v;
            }
        }
    }

    fn cmd_getlocale(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let target = &p[0];
        let locale = self
            .nicks
            .get(target.as_str())
            .and_then(|tid| self.clients.get(tid))
            .map(|c| c.locale.clone());
        match locale {
            Some(locale) => {
                self.reply(id, RPL_GETLOCALE, &format!("{target}`{locale}"));
            }
            None => self.reply(
                id,
                ERR_NOSUCHNICK,
                &format!("{target} :No such nick/channel"),
            ),
        }
    }

    fn cmd_setlocale(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        if let Some(client) = self.clients.get_mut(&id) {
            client.locale = p[0].clone();
        }
        self.reply(id, RPL_SETLOCALE, &p[0]);
    }

    fn cmd_getcodepage(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let target = &p[0];
        let codepage = self
            .nicks
            .get(target.as_str())
            .and_then(|tid| self.clients.get(tid))
            .map(|c| c.framer.codepage().name().to_string());
        match codepage {
            Some(cp) => {
                self.reply(id, RPL_CODEPAGE, &format!("{target}`{cp}"));
            }
            None => self.reply(
                id,
                ERR_NOSUCHNICK,
                &format!("{target} :No such nick/channel"),
            ),
        }
    }

    fn cmd_setcodepage(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let registered = self.is_registered(id);
        let result = match self.clients.get_mut(&id) {
            Some(client) => client.framer.set_codepage(&p[0]),
            None => return,
        };
        match result {
            Ok(()) => self.reply(id, RPL_CODEPAGESET, &p[0]),
            Err(e) => {
                tracing::debug!(%id, error = %e, "codepage negotiation failed");
                // Post-registration this is fatal; during login the
                // client keeps its current codepage and carries on.
                if registered {
                    self.send_to(id, "ERROR :Unsupported codepage");
                    self.close(id, true);
                }
            }
        }
    }

    // --- listings ---

    fn cmd_list(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let (Ok(list_type), Ok(game_type)) =
            (p[0].parse::<u32>(), p[1].parse::<u32>())
        else {
            return self.need_more_params(id);
        };

        self.reply(id, RPL_LISTSTART, "");

        let mut channels: Vec<&Channel> = self.channels.values().collect();
        channels.sort_by(|a, b| a.name().cmp(b.name()));

        let mut rows = Vec::new();
        for ch in channels {
            if !ch.is_lobby() || !ch.is_game_type(game_type) {
                continue;
            }
            if list_type == 0 && ch.is_official() {
                rows.push((
                    RPL_LIST,
                    format!("{} {} 0 388", ch.name(), ch.member_count()),
                ));
            } else if list_type == game_type && !ch.is_official() {
                rows.push((
                    RPL_LISTGAME,
                    format!(
                        "{} {} {} {} {} {} {} {} :{}",
                        ch.name(),
                        ch.member_count(),
                        ch.max_users(),
                        ch.game_type(),
                        ch.tournament() as u32,
                        ch.reserved(),
                        ch.ip_addr(),
                        ch.flags().bits(),
                        ch.topic()
                    ),
                ));
            }
        }
        for (code, row) in rows {
            self.reply(id, code, &row);
        }

        self.reply(id, RPL_ENDOFLIST, "");
    }

    // --- joining and leaving ---

    fn cmd_join(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let name = p[0].clone();
        let key = p.get(1).cloned().unwrap_or_default();
        self.join_normal(id, &name, &key);
    }

    fn join_normal(&mut self, id: ConnectionId, name: &str, key: &str) {
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        match self.try_join(id, name, key) {
            Some(JoinOutcome::Joined) => {
                let line = user_line(&nick, "JOIN", &format!(":0,0 {name}"));
                self.broadcast(name, &line, None);
                self.send_names(id, name);
            }
            Some(JoinOutcome::AlreadyMember) => {
                let line = user_line(&nick, "JOIN", &format!(":0,0 {name}"));
                self.send_to(id, &line);
            }
            None => {}
        }
    }

    /// Runs the channel join and replies the error numerics. The caller
    /// handles the two non-error outcomes. `None` means a reply was
    /// already sent.
    fn try_join(
        &mut self,
        id: ConnectionId,
        name: &str,
        key: &str,
    ) -> Option<JoinOutcome> {
        let nick = self.nick_of(id)?;
        let result = match self.channels.get_mut(name) {
            Some(channel) => channel.join(id, &nick, key),
            None => {
                self.reply(
                    id,
                    ERR_NOSUCHCHANNEL,
                    &format!("{name} :No such channel"),
                );
                return None;
            }
        };
        match result {
            Ok(()) => Some(JoinOutcome::Joined),
            Err(JoinError::AlreadyMember) => Some(JoinOutcome::AlreadyMember),
            Err(JoinError::Banned) => {
                self.reply(
                    id,
                    ERR_BANNEDFROMCHAN,
                    &format!("{name} :Cannot join channel (banned)"),
                );
                None
            }
            Err(JoinError::Full) => {
                self.reply(
                    id,
                    ERR_CHANNELISFULL,
                    &format!("{name} :Cannot join channel (game is full)"),
                );
                None
            }
            Err(JoinError::BadKey) => {
                self.reply(
                    id,
                    ERR_BADCHANNELKEY,
                    &format!("{name} :Cannot join channel (invalid key)"),
                );
                None
            }
        }
    }

    fn send_names(&self, id: ConnectionId, name: &str) {
        let Some(channel) = self.channels.get(name) else {
            return;
        };
        let kind = if channel.is_permanent() { "*" } else { "=" };
        for member in channel.members() {
            let Some(c) = self.clients.get(member) else {
                continue;
            };
            let op = if channel.is_owner(*member) { "@" } else { "" };
            self.reply(
                id,
                RPL_NAMREPLY,
                &format!("{kind} {name} :{op}{},0,0", c.display_nick()),
            );
        }
        self.reply(id, RPL_ENDOFNAMES, &format!("{name} :End of names"));
    }

    fn cmd_part(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let name = p[0].clone();
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        let result = match self.channels.get_mut(&name) {
            Some(channel) => channel.part(id),
            None => {
                return self.reply(
                    id,
                    ERR_NOSUCHCHANNEL,
                    &format!("{name} :No such channel"),
                );
            }
        };
        match result {
            Ok(()) => {
                let line = user_line(&nick, "PART", &name);
                self.broadcast(&name, &line, None);
                self.send_to(id, &line);
                self.drop_if_empty(&name);
            }
            Err(_) => self.reply(
                id,
                ERR_NOTONCHANNEL,
                &format!("{name} :You aren't on that channel"),
            ),
        }
    }

    // --- game channels ---

    fn cmd_joingame(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let name = p[0].clone();

        if self.channels.contains_key(&name) {
            let key = match p.len() {
                1 => String::new(),
                2 => p[1].clone(),
                _ => p[2].clone(),
            };
            let official = self
                .channels
                .get(&name)
                .is_some_and(Channel::is_official);
            if official {
                // Addressed at a lobby: a JOINGAME is just a JOIN.
                self.join_normal(id, &name, &key);
            } else {
                self.game_join(id, &name, &key);
            }
        } else if p.len() >= 8 {
            self.game_create(id, p);
        } else {
            self.reply(
                id,
                ERR_NOSUCHCHANNEL,
                &format!("{name} :No such channel"),
            );
        }
    }

    fn game_join(&mut self, id: ConnectionId, name: &str, key: &str) {
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        match self.try_join(id, name, key) {
            Some(JoinOutcome::Joined) => {
                // A fresh game member starts the option-broadcast
                // workaround from scratch.
                if let Some(client) = self.clients.get_mut(&id) {
                    client.gameopt_confirmed = false;
                    client.gameopt_queue.clear();
                }
                if let Some(meta) = self.game_meta_line(&nick, name) {
                    self.broadcast(name, &meta, None);
                }
                let topic = self
                    .channels
                    .get(name)
                    .map(|c| c.topic().to_string())
                    .unwrap_or_default();
                self.reply(id, RPL_TOPIC, &format!(":{topic}"));
                self.send_names(id, name);
            }
            Some(JoinOutcome::AlreadyMember) => {
                if let Some(meta) = self.game_meta_line(&nick, name) {
                    self.send_to(id, &meta);
                }
            }
            None => {}
        }
    }

    /// The JOINGAME success broadcast carrying the channel's game
    /// metadata.
    fn game_meta_line(&self, nick: &str, name: &str) -> Option<String> {
        let ch = self.channels.get(name)?;
        Some(user_line(
            nick,
            "JOINGAME",
            &format!(
                "{} {} {} {} 0 0 {} :{}",
                ch.min_users(),
                ch.max_users(),
                ch.game_type(),
                ch.tournament() as u32,
                ch.ip_addr(),
                name
            ),
        ))
    }

    fn game_create(&mut self, id: ConnectionId, p: &[String]) {
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        let (Ok(min_users), Ok(max_users), Ok(game_type), Ok(reserved)) = (
            p[1].parse::<u32>(),
            p[2].parse::<u32>(),
            p[3].parse::<u32>(),
            p[7].parse::<u32>(),
        ) else {
            return self.need_more_params(id);
        };
        let tournament = p[6] == "1" || p[6].eq_ignore_ascii_case("true");
        let key = p.get(8).cloned().unwrap_or_default();
        let name = p[0].clone();

        let mut game = Channel::game(
            &name, &key, game_type, id, min_users, max_users, tournament,
            reserved,
        );
        if let Err(e) = game.join(id, &nick, &key) {
            // Not reachable for a channel built from these parameters.
            tracing::error!(%id, channel = %name, error = %e,
                "join of freshly created channel failed");
            return;
        }
        self.channels.insert(name.clone(), game);
        tracing::info!(%id, channel = %name, "game channel created");

        // The creator's own GAMEOPT never needs deferring.
        if let Some(client) = self.clients.get_mut(&id) {
            client.gameopt_confirmed = true;
        }

        self.reply(id, RPL_TOPIC, ":");
        if let Some(meta) = self.game_meta_line(&nick, &name) {
            self.send_to(id, &meta);
        }
        self.send_names(id, &name);
    }

    fn cmd_topic(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let (name, text) = (p[0].clone(), p[1].clone());
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        let result = match self.channels.get_mut(&name) {
            Some(channel) => channel.set_topic(id, &text),
            None => {
                return self.reply(
                    id,
                    ERR_NOSUCHCHANNEL,
                    &format!("{name} :No such channel"),
                );
            }
        };
        match result {
            Ok(()) => {
                let line =
                    user_line(&nick, "TOPIC", &format!("{name} :{text}"));
                self.broadcast(&name, &line, None);
            }
            Err(_) => self.not_operator(id, &name),
        }
    }

    fn cmd_startg(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let name = &p[0];
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        let Some(channel) = self.channels.get(name.as_str()) else {
            return self.reply(
                id,
                ERR_NOSUCHCHANNEL,
                &format!("{name} :No such channel"),
            );
        };
        if !channel.is_owner(id) {
            return self.not_operator(id, name);
        }

        // Unknown nicknames and non-members are silently skipped.
        let mut resolved = Vec::new();
        for listed in p[1].split(',').filter(|n| !n.is_empty()) {
            let Some(mid) = self.nicks.get(listed).copied() else {
                continue;
            };
            if !channel.is_member(mid) {
                continue;
            }
            let Some(member) = self.clients.get(&mid) else {
                continue;
            };
            resolved.push((listed.to_string(), member.peer_ip(), mid));
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut body = String::new();
        for (member_nick, ip, _) in &resolved {
            body.push_str(&format!("{member_nick} {ip} "));
        }
        body.push_str(&format!(":1 {now}"));

        for (member_nick, _, mid) in &resolved {
            let line = user_line(
                &nick,
                "STARTG",
                &format!("{member_nick} :{body}"),
            );
            self.send_to(*mid, &line);
        }
    }

    // --- moderation ---

    fn cmd_kick(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let (name, target_nick) = (p[0].clone(), p[1].clone());
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        if !self.channels.contains_key(&name) {
            return self.reply(
                id,
                ERR_NOSUCHCHANNEL,
                &format!("{name} :No such channel"),
            );
        }
        let target = self.nicks.get(&target_nick).copied();
        let result = match (self.channels.get_mut(&name), target) {
            (Some(channel), Some(target)) => channel.kick(id, target),
            _ => Err(ChannelError::TargetNotMember),
        };
        match result {
            Ok(()) => {
                let line = user_line(
                    &nick,
                    "KICK",
                    &format!("{name} {target_nick}"),
                );
                self.broadcast(&name, &line, None);
                if let Some(target) = target {
                    self.send_to(target, &line);
                }
                self.drop_if_empty(&name);
            }
            Err(ChannelError::NotAMember) => self.reply(
                id,
                ERR_NOTONCHANNEL,
                &format!("{name} :You aren't on that channel"),
            ),
            Err(ChannelError::TargetNotMember) => self.reply(
                id,
                ERR_USERNOTINCHANNEL,
                &format!("{target_nick} {name} :They aren't on that channel"),
            ),
            Err(ChannelError::NotOwner) => self.not_operator(id, &name),
        }
    }

    fn cmd_mode(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let name = p[0].clone();
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        if !self.channels.contains_key(&name) {
            return self.reply(
                id,
                ERR_NOSUCHCHANNEL,
                &format!("{name} :No such channel"),
            );
        }
        // Only the ban mode carries behavior; everything else the
        // clients send is accepted and ignored.
        if p[1] != "+b" {
            return;
        }
        let Some(target_nick) = p.get(2) else {
            return self.need_more_params(id);
        };
        let target_nick = target_nick.clone();
        let result = match self.channels.get_mut(&name) {
            Some(channel) => channel.ban(id, &target_nick),
            None => return,
        };
        match result {
            Ok(()) => {
                let line = user_line(
                    &nick,
                    "MODE",
                    &format!("{name} +b {target_nick}"),
                );
                self.broadcast(&name, &line, None);
            }
            Err(ChannelError::NotOwner) => self.not_operator(id, &name),
            Err(_) => self.reply(
                id,
                ERR_NOTONCHANNEL,
                &format!("{name} :You aren't on that channel"),
            ),
        }
    }

    // --- messaging ---

    fn cmd_privmsg(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let (target, text) = (p[0].clone(), p[1].clone());
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        let line =
            user_line(&nick, "PRIVMSG", &format!("{target} :{text}"));

        if target.starts_with('#') {
            let Some(channel) = self.channels.get(&target) else {
                return self.reply(
                    id,
                    ERR_NOSUCHCHANNEL,
                    &format!("{target} :No such channel"),
                );
            };
            if !channel.is_member(id) {
                return self.reply(
                    id,
                    ERR_NOTONCHANNEL,
                    &format!("{target} :You aren't on that channel"),
                );
            }
            self.broadcast(&target, &line, Some(id));
        } else {
            match self.nicks.get(&target).copied() {
                Some(tid) => self.send_to(tid, &line),
                None => self.reply(
                    id,
                    ERR_NOSUCHNICK,
                    &format!("{target} :No such nick/channel"),
                ),
            }
        }
    }

    fn cmd_page(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let (target, text) = (p[0].clone(), p[1].clone());
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        // Absent and unreachable targets get the same reply on purpose:
        // paging must not leak who is online with paging disabled.
        let reachable = self
            .nicks
            .get(&target)
            .and_then(|tid| self.clients.get(tid))
            .is_some_and(|c| c.can_page());
        if !reachable {
            return self.reply(
                id,
                ERR_NOSUCHNICK,
                &format!("{target} :No such nick/channel"),
            );
        }
        if let Some(tid) = self.nicks.get(&target).copied() {
            let line =
                user_line(&nick, "PAGE", &format!("{target} :{text}"));
            self.send_to(tid, &line);
        }
        self.reply(id, RPL_PAGE, "0");
    }

    fn cmd_finduserex(&mut self, id: ConnectionId, p: &[String]) {
        if p.is_empty() {
            return self.need_more_params(id);
        }
        let target = &p[0];
        // Absent, hidden, and channel-less targets all collapse into the
        // same not-found reply, mirroring PAGE.
        let located = self
            .nicks
            .get(target.as_str())
            .copied()
            .filter(|tid| {
                self.clients
                    .get(tid)
                    .is_some_and(|c| c.can_find())
            })
            .and_then(|tid| {
                let mut names: Vec<&String> = self
                    .channels
                    .iter()
                    .filter(|(_, ch)| ch.is_member(tid))
                    .map(|(name, _)| name)
                    .collect();
                names.sort();
                names.first().map(|n| n.to_string())
            });
        match located {
            Some(channel) => {
                self.reply(id, RPL_FINDUSEREX, &format!("0 :{channel}"));
            }
            None => self.reply(
                id,
                ERR_NOSUCHNICK,
                &format!("{target} :No such nick/channel"),
            ),
        }
    }

    // --- option broadcast workaround ---

    /// Routes a GAMEOPT payload with the legacy-client deferral rules.
    ///
    /// Recipients that have not yet confirmed get the line queued rather
    /// than sent. A direct (nickname-addressed) GAMEOPT marks the sender
    /// itself confirmed and releases its own queue.
    fn cmd_gameopt(&mut self, id: ConnectionId, p: &[String]) {
        if p.len() < 2 {
            return self.need_more_params(id);
        }
        let (target, payload) = (p[0].clone(), p[1].clone());
        let Some(nick) = self.nick_of(id) else {
            return;
        };
        let line =
            user_line(&nick, "GAMEOPT", &format!("{target} :{payload}"));

        if target.starts_with('#') {
            let Some(channel) = self.channels.get(&target) else {
                return self.reply(
                    id,
                    ERR_NOSUCHCHANNEL,
                    &format!("{target} :No such channel"),
                );
            };
            if !channel.is_member(id) {
                return self.reply(
                    id,
                    ERR_NOTONCHANNEL,
                    &format!("{target} :You aren't on that channel"),
                );
            }
            let members: Vec<ConnectionId> = channel
                .members()
                .iter()
                .copied()
                .filter(|m| *m != id)
                .collect();
            for member in members {
                self.deliver_gameopt(member, line.clone());
            }
        } else {
            let Some(tid) = self.nicks.get(&target).copied() else {
                return self.reply(
                    id,
                    ERR_NOSUCHNICK,
                    &format!("{target} :No such nick/channel"),
                );
            };
            self.deliver_gameopt(tid, line);

            // The direct send is the ready signal: release everything
            // held back for the sender, in arrival order.
            if let Some(client) = self.clients.get_mut(&id) {
                client.gameopt_confirmed = true;
                let queued: Vec<String> =
                    client.gameopt_queue.drain(..).collect();
                for held in &queued {
                    client.send_line(held);
                }
            }
        }
    }

    fn deliver_gameopt(&mut self, recipient: ConnectionId, line: String) {
        let Some(client) = self.clients.get_mut(&recipient) else {
            return;
        };
        if client.gameopt_confirmed {
            client.send_line(&line);
        } else {
            tracing::debug!(id = %recipient, "deferring GAMEOPT for unconfirmed client");
            client.gameopt_queue.push_back(line);
        }
    }

    // --- session end ---

    fn cmd_quit(&mut self, id: ConnectionId) {
        self.send_to(id, "ERROR :Quit");
        self.close(id, true);
    }

    fn not_operator(&self, id: ConnectionId, name: &str) {
        self.reply(
            id,
            ERR_CHANOPRIVSNEEDED,
            &format!("{name} :You're not channel operator"),
        );
    }
}
