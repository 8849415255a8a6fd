//! Channel state machine: one chat room or one in-formation game lobby.

use std::collections::HashSet;

use wolserver_transport::ConnectionId;

use crate::{ChannelError, JoinError};

bitflags::bitflags! {
    /// Channel property bits, reported verbatim in game listings.
    ///
    /// Permanence is carried here and nowhere else.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelFlags: u32 {
        /// Never removed, even with zero members.
        const PERMANENT = 0x01;
        /// Shows up in lobby/game listings.
        const LOBBY = 0x02;
        /// Server-provided room rather than a player-created game.
        const OFFICIAL = 0x04;
    }
}

/// A chat room or game lobby.
///
/// Members and the owner are non-owning [`ConnectionId`] references
/// resolved through the engine's client map; the engine's channel map is
/// the ownership root.
#[derive(Debug)]
pub struct Channel {
    name: String,
    owner: Option<ConnectionId>,
    topic: String,
    key: String,
    game_type: u32,
    min_users: u32,
    max_users: u32,
    tournament: bool,
    reserved: u32,
    ip_addr: u32,
    flags: ChannelFlags,
    /// Join order is broadcast order; uniqueness is enforced on join.
    members: Vec<ConnectionId>,
    bans: HashSet<String>,
}

impl Channel {
    /// Creates a permanent lobby channel.
    pub fn lobby(name: &str, key: &str, game_type: u32) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            topic: String::new(),
            key: key.to_string(),
            game_type,
            min_users: 0,
            max_users: 0,
            tournament: false,
            reserved: 0,
            ip_addr: 0,
            flags: ChannelFlags::PERMANENT
                | ChannelFlags::LOBBY
                | ChannelFlags::OFFICIAL,
            members: Vec::new(),
            bans: HashSet::new(),
        }
    }

    /// Creates a transient, owned game channel.
    #[allow(clippy::too_many_arguments)]
    pub fn game(
        name: &str,
        key: &str,
        game_type: u32,
        owner: ConnectionId,
        min_users: u32,
        max_users: u32,
        tournament: bool,
        reserved: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            owner: Some(owner),
            topic: String::new(),
            key: key.to_string(),
            game_type,
            min_users,
            max_users,
            tournament,
            reserved,
            ip_addr: 0,
            flags: ChannelFlags::LOBBY,
            members: Vec::new(),
            bans: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn game_type(&self) -> u32 {
        self.game_type
    }

    pub fn min_users(&self) -> u32 {
        self.min_users
    }

    pub fn max_users(&self) -> u32 {
        self.max_users
    }

    pub fn tournament(&self) -> bool {
        self.tournament
    }

    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    pub fn ip_addr(&self) -> u32 {
        self.ip_addr
    }

    pub fn flags(&self) -> ChannelFlags {
        self.flags
    }

    pub fn is_permanent(&self) -> bool {
        self.flags.contains(ChannelFlags::PERMANENT)
    }

    pub fn is_official(&self) -> bool {
        self.flags.contains(ChannelFlags::OFFICIAL)
    }

    pub fn is_lobby(&self) -> bool {
        self.flags.contains(ChannelFlags::LOBBY)
    }

    pub fn is_game_type(&self, game_type: u32) -> bool {
        self.game_type == game_type
    }

    pub fn owner(&self) -> Option<ConnectionId> {
        self.owner
    }

    pub fn is_owner(&self, id: ConnectionId) -> bool {
        self.owner == Some(id)
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, id: ConnectionId) -> bool {
        self.members.contains(&id)
    }

    pub fn is_banned(&self, nick: &str) -> bool {
        self.bans.contains(nick)
    }

    /// Adds a client to the membership.
    ///
    /// Failure conditions are checked in a fixed order: already-member,
    /// full, wrong key, banned.
    pub fn join(
        &mut self,
        id: ConnectionId,
        nick: &str,
        key: &str,
    ) -> Result<(), JoinError> {
        if self.members.contains(&id) {
            return Err(JoinError::AlreadyMember);
        }
        if self.max_users > 0 && self.members.len() as u32 == self.max_users {
            return Err(JoinError::Full);
        }
        if key != self.key {
            return Err(JoinError::BadKey);
        }
        if self.bans.contains(nick) {
            return Err(JoinError::Banned);
        }
        self.members.push(id);
        Ok(())
    }

    /// Removes a member. The caller runs the empty-channel check after.
    pub fn part(&mut self, id: ConnectionId) -> Result<(), ChannelError> {
        if !self.remove(id) {
            return Err(ChannelError::NotAMember);
        }
        Ok(())
    }

    /// Removes `target` on behalf of `actor`.
    ///
    /// Checked in order: actor membership, target membership, ownership.
    pub fn kick(
        &mut self,
        actor: ConnectionId,
        target: ConnectionId,
    ) -> Result<(), ChannelError> {
        if !self.members.contains(&actor) {
            return Err(ChannelError::NotAMember);
        }
        if !self.members.contains(&target) {
            return Err(ChannelError::TargetNotMember);
        }
        if !self.is_owner(actor) {
            return Err(ChannelError::NotOwner);
        }
        self.remove(target);
        Ok(())
    }

    /// Records a nickname on the ban list. The target need not be a
    /// current member.
    pub fn ban(
        &mut self,
        actor: ConnectionId,
        nick: &str,
    ) -> Result<(), ChannelError> {
        if !self.members.contains(&actor) {
            return Err(ChannelError::NotAMember);
        }
        if !self.is_owner(actor) {
            return Err(ChannelError::NotOwner);
        }
        self.bans.insert(nick.to_string());
        Ok(())
    }

    /// Sets the topic. Owner only.
    pub fn set_topic(
        &mut self,
        actor: ConnectionId,
        text: &str,
    ) -> Result<(), ChannelError> {
        if !self.is_owner(actor) {
            return Err(ChannelError::NotOwner);
        }
        self.topic = text.to_string();
        Ok(())
    }

    /// Unconditional removal, used by disconnect cleanup. Returns whether
    /// the client was a member.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        match self.members.iter().position(|m| *m == id) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    fn game() -> Channel {
        Channel::game("#game", "k", 21, cid(1), 2, 2, false, 0)
    }

    #[test]
    fn test_join_is_rejected_per_reason_in_order() {
        let mut ch = game();
        ch.join(cid(1), "Alice", "k").unwrap();

        // Already-member wins over every other condition.
        assert_eq!(ch.join(cid(1), "Alice", "bad"), Err(JoinError::AlreadyMember));

        ch.join(cid(2), "Bob", "k").unwrap();
        // Full is checked before the key.
        assert_eq!(ch.join(cid(3), "Carol", "bad"), Err(JoinError::Full));

        let mut ch = game();
        ch.ban(cid(1), "Dave").unwrap_err(); // not a member yet
        ch.join(cid(1), "Alice", "k").unwrap();
        ch.ban(cid(1), "Dave").unwrap();
        // Wrong key is reported before the ban.
        assert_eq!(ch.join(cid(4), "Dave", "bad"), Err(JoinError::BadKey));
        assert_eq!(ch.join(cid(4), "Dave", "k"), Err(JoinError::Banned));
    }

    #[test]
    fn test_membership_never_duplicates() {
        let mut ch = Channel::lobby("#Lob_21_0", "zotclot9", 21);
        ch.join(cid(1), "Alice", "zotclot9").unwrap();
        let _ = ch.join(cid(1), "Alice", "zotclot9");
        assert_eq!(ch.member_count(), 1);
    }

    #[test]
    fn test_lobby_has_no_member_bound() {
        let mut ch = Channel::lobby("#Lob_21_0", "zotclot9", 21);
        for n in 0..100 {
            ch.join(cid(n), &format!("u{n}"), "zotclot9").unwrap();
        }
        assert_eq!(ch.member_count(), 100);
    }

    #[test]
    fn test_kick_checks_actor_then_target_then_ownership() {
        let mut ch = game();
        assert_eq!(ch.kick(cid(1), cid(2)), Err(ChannelError::NotAMember));

        ch.join(cid(1), "Alice", "k").unwrap();
        assert_eq!(ch.kick(cid(1), cid(2)), Err(ChannelError::TargetNotMember));

        ch.join(cid(2), "Bob", "k").unwrap();
        assert_eq!(ch.kick(cid(2), cid(1)), Err(ChannelError::NotOwner));

        ch.kick(cid(1), cid(2)).unwrap();
        assert!(!ch.is_member(cid(2)));
    }

    #[test]
    fn test_ban_does_not_require_target_membership() {
        let mut ch = game();
        ch.join(cid(1), "Alice", "k").unwrap();
        ch.ban(cid(1), "Mallory").unwrap();
        assert!(ch.is_banned("Mallory"));
    }

    #[test]
    fn test_only_the_owner_sets_the_topic() {
        let mut ch = game();
        ch.join(cid(1), "Alice", "k").unwrap();
        ch.join(cid(2), "Bob", "k").unwrap();

        assert_eq!(ch.set_topic(cid(2), "hi"), Err(ChannelError::NotOwner));
        assert_eq!(ch.topic(), "");

        ch.set_topic(cid(1), "3v3 no rush").unwrap();
        assert_eq!(ch.topic(), "3v3 no rush");
    }

    #[test]
    fn test_part_of_a_non_member_fails() {
        let mut ch = game();
        assert_eq!(ch.part(cid(9)), Err(ChannelError::NotAMember));
    }

    #[test]
    fn test_permanence_is_carried_by_the_flags_bits() {
        assert!(Channel::lobby("#l", "", 21).is_permanent());
        assert!(!game().is_permanent());
        assert!(game().is_lobby());
        assert!(!game().is_official());
    }
}
