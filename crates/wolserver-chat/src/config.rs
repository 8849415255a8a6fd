//! Engine configuration: everything the chat service needs injected.

use serde::{Deserialize, Serialize};

/// One permanent lobby channel, present from startup to shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyDef {
    /// Channel name, including the leading `#`.
    pub name: String,
    /// Join key every period client of this game type knows.
    pub key: String,
    /// Game-type code the lobby is scoped to.
    pub game_type: u32,
}

/// Configuration for a [`ChatEngine`](crate::ChatEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Hostname used as the server prefix in every reply.
    pub server_name: String,
    /// The shared-secret password every client must present.
    pub password: String,
    /// Message-of-the-day lines sent on registration.
    pub motd: Vec<String>,
    /// Permanent lobby channels created at startup.
    pub lobbies: Vec<LobbyDef>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            server_name: "wol.localhost".to_string(),
            password: "supersecret".to_string(),
            motd: vec!["Welcome to Westwood Online!".to_string()],
            lobbies: (0..3)
                .map(|n| LobbyDef {
                    name: format!("#Lob_21_{n}"),
                    key: "zotclot9".to_string(),
                    game_type: 21,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_three_lobbies() {
        let config = ChatConfig::default();
        assert_eq!(config.lobbies.len(), 3);
        assert_eq!(config.lobbies[0].name, "#Lob_21_0");
        assert_eq!(config.lobbies[2].name, "#Lob_21_2");
        assert!(config.lobbies.iter().all(|l| l.game_type == 21));
    }
}
