//! Server configuration: TOML file with CLI overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wolserver_chat::{ChatConfig, LobbyDef};

use crate::ServerError;

/// Full server configuration. Every field has a default, so a partial
/// TOML file (or none at all) works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname advertised to clients and used as the reply prefix.
    pub hostname: String,
    /// Address the listeners bind to.
    pub listen_ip: String,
    /// Bootstrap/redirect responder port (the port clients dial first).
    pub bootstrap_port: u16,
    /// Chat/lobby line protocol port.
    pub chat_port: u16,
    /// Binary gameres report intake port.
    pub gameres_port: u16,
    /// Ladder responder port.
    pub ladder_port: u16,
    /// Shared-secret password clients must present.
    pub password: String,
    /// Message-of-the-day lines.
    pub motd: Vec<String>,
    /// Permanent lobby channels created at startup.
    pub lobbies: Vec<LobbyDef>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let chat = ChatConfig::default();
        Self {
            hostname: chat.server_name,
            listen_ip: "0.0.0.0".to_string(),
            bootstrap_port: 4005,
            chat_port: 5000,
            gameres_port: 4006,
            ladder_port: 4002,
            password: chat.password,
            motd: chat.motd,
            lobbies: chat.lobbies,
        }
    }
}

impl ServerConfig {
    /// Loads a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The chat engine's slice of this configuration.
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            server_name: self.hostname.clone(),
            password: self.password.clone(),
            motd: self.motd.clone(),
            lobbies: self.lobbies.clone(),
        }
    }

    pub(crate) fn bind_addr(&self, port: u16) -> String {
        format!("{}:{}", self.listen_ip, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_the_classic_port_layout() {
        let config = ServerConfig::default();
        assert_eq!(config.bootstrap_port, 4005);
        assert_eq!(config.chat_port, 5000);
        assert_eq!(config.gameres_port, 4006);
        assert_eq!(config.ladder_port, 4002);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            hostname = "wol.example.net"
            chat_port = 6000
            "#,
        )
        .unwrap();
        assert_eq!(config.hostname, "wol.example.net");
        assert_eq!(config.chat_port, 6000);
        assert_eq!(config.gameres_port, 4006);
        assert_eq!(config.lobbies.len(), 3);
    }

    #[test]
    fn test_lobbies_can_be_overridden() {
        let config: ServerConfig = toml::from_str(
            r##"
            [[lobbies]]
            name = "#Lob_33_0"
            key = "rocksolid"
            game_type = 33
            "##,
        )
        .unwrap();
        assert_eq!(config.lobbies.len(), 1);
        assert_eq!(config.lobbies[0].game_type, 33);
        assert_eq!(config.chat_config().lobbies[0].name, "#Lob_33_0");
    }
}
