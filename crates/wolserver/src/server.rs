//! `WolServer` builder and the per-service accept loops.
//!
//! One listener per service port; each accepted connection gets its own
//! handler task. The chat engine sits behind a single async mutex —
//! every handler locks it for the whole of one delivery, which
//! serializes all chat state mutation and gives each connection's batch
//! run-to-completion semantics.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;
use wolserver_chat::ChatEngine;
use wolserver_transport::{ConnectionHandle, TcpTransport};

use crate::handler;
use crate::{ServerConfig, ServerError};

/// The shared chat engine, keyed to production connection handles.
pub(crate) type SharedEngine = Arc<Mutex<ChatEngine<ConnectionHandle>>>;

/// Builder for configuring and starting a server.
pub struct WolServerBuilder {
    config: ServerConfig,
}

impl WolServerBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds all four service listeners and builds the server.
    pub async fn build(self) -> Result<WolServer, ServerError> {
        let config = self.config;
        let bootstrap =
            TcpTransport::bind(&config.bind_addr(config.bootstrap_port))
                .await?;
        let chat =
            TcpTransport::bind(&config.bind_addr(config.chat_port)).await?;
        let gameres =
            TcpTransport::bind(&config.bind_addr(config.gameres_port))
                .await?;
        let ladder =
            TcpTransport::bind(&config.bind_addr(config.ladder_port))
                .await?;

        let engine =
            Arc::new(Mutex::new(ChatEngine::new(config.chat_config())));

        Ok(WolServer {
            config: Arc::new(config),
            bootstrap,
            chat,
            gameres,
            ladder,
            engine,
        })
    }
}

impl Default for WolServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully bound server, ready to run.
pub struct WolServer {
    config: Arc<ServerConfig>,
    bootstrap: TcpTransport,
    chat: TcpTransport,
    gameres: TcpTransport,
    ladder: TcpTransport,
    engine: SharedEngine,
}

impl WolServer {
    /// Creates a new builder.
    pub fn builder() -> WolServerBuilder {
        WolServerBuilder::new()
    }

    /// Local address of the chat listener.
    pub fn chat_addr(&self) -> std::io::Result<SocketAddr> {
        self.chat.local_addr()
    }

    /// Local address of the gameres listener.
    pub fn gameres_addr(&self) -> std::io::Result<SocketAddr> {
        self.gameres.local_addr()
    }

    /// Local address of the bootstrap listener.
    pub fn bootstrap_addr(&self) -> std::io::Result<SocketAddr> {
        self.bootstrap.local_addr()
    }

    /// Local address of the ladder listener.
    pub fn ladder_addr(&self) -> std::io::Result<SocketAddr> {
        self.ladder.local_addr()
    }

    /// Runs all four accept loops until the process is terminated.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(
            hostname = %self.config.hostname,
            "wolserver running"
        );
        let WolServer {
            config,
            bootstrap,
            chat,
            gameres,
            ladder,
            engine,
        } = self;

        tokio::join!(
            accept_chat(chat, engine),
            accept_gameres(gameres),
            accept_bootstrap(bootstrap, config),
            accept_ladder(ladder),
        );
        Ok(())
    }
}

async fn accept_chat(mut transport: TcpTransport, engine: SharedEngine) {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                let engine = Arc::clone(&engine);
                tokio::spawn(handler::run_chat_connection(conn, engine));
            }
            Err(e) => tracing::error!(error = %e, "chat accept failed"),
        }
    }
}

async fn accept_gameres(mut transport: TcpTransport) {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                tokio::spawn(handler::run_gameres_connection(conn));
            }
            Err(e) => tracing::error!(error = %e, "gameres accept failed"),
        }
    }
}

async fn accept_bootstrap(
    mut transport: TcpTransport,
    config: Arc<ServerConfig>,
) {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                let config = Arc::clone(&config);
                tokio::spawn(handler::run_bootstrap_connection(conn, config));
            }
            Err(e) => tracing::error!(error = %e, "bootstrap accept failed"),
        }
    }
}

async fn accept_ladder(mut transport: TcpTransport) {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                tokio::spawn(handler::run_ladder_connection(conn));
            }
            Err(e) => tracing::error!(error = %e, "ladder accept failed"),
        }
    }
}
