//! # wolserver
//!
//! A compatibility server for the line-oriented matchmaking/chat
//! protocol spoken by early-2000s real-time-strategy game clients.
//! Period clients authenticate against a shared secret, chat in
//! permanent lobbies, create and join game channels with key/ban/
//! capacity enforcement, negotiate per-game options, and hand off into
//! a match; finished matches post a binary result report to a second
//! port.
//!
//! The server binds four services: the chat/lobby line protocol, the
//! gameres report intake, the bootstrap redirect responder, and the
//! ladder responder. All four share the transport primitives from
//! `wolserver-transport`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wolserver::{ServerConfig, WolServer};
//!
//! # async fn run() -> Result<(), wolserver::ServerError> {
//! let server = WolServer::builder()
//!     .config(ServerConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{WolServer, WolServerBuilder};
