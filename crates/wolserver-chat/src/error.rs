//! Error kinds for channel operations.
//!
//! Each failure reason is its own variant so command handlers can map
//! them one-to-one onto numeric replies.

/// Why a join was refused. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    /// The client is already a member. Callers treat this as a benign
    /// echo, not an error reply.
    #[error("already on channel")]
    AlreadyMember,

    /// The channel has a positive member bound and is at it.
    #[error("channel is full")]
    Full,

    /// The supplied key does not match the channel key.
    #[error("invalid channel key")]
    BadKey,

    /// The nickname is on the channel's ban list.
    #[error("banned from channel")]
    Banned,
}

/// Why a part/kick/ban/topic operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The acting client is not on the channel.
    #[error("not on that channel")]
    NotAMember,

    /// The named target is not on the channel.
    #[error("target not on that channel")]
    TargetNotMember,

    /// The acting client does not own the channel.
    #[error("channel operator privileges needed")]
    NotOwner,
}
