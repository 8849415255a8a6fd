//! Chat and lobby engine for wolserver.
//!
//! The [`ChatEngine`] owns every piece of chat state: the
//! nickname→client directory, the channel set, and each client's
//! session state (registration progress, options, codepage, idle
//! timers, and the option-broadcast workaround queue). It is driven
//! entirely by three entry points — bytes received, periodic tick,
//! disconnect — and writes replies back through the byte-sink
//! capability it was handed at `on_connect`.
//!
//! All state is injected at construction via [`ChatConfig`]; a fresh
//! engine per test is the intended way to exercise it.

mod channel;
mod client;
mod commands;
mod config;
mod engine;
mod error;

pub use channel::{Channel, ChannelFlags};
pub use client::{OPT1_ALLOW_FIND, OPT2_ALLOW_PAGE};
pub use config::{ChatConfig, LobbyDef};
pub use engine::{ChatEngine, IDLE_AFTER, TIMEOUT_AFTER};
pub use error::{ChannelError, JoinError};
