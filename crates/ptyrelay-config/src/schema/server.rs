use serde::{Deserialize, Serialize};

/// Listener and WebSocket transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Request path that may be upgraded. `None` accepts any path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Largest accepted WebSocket message (and frame) in bytes.
    pub max_message_bytes: usize,
    /// Seconds a client has to complete the WebSocket handshake.
    pub handshake_timeout_secs: u64,
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7681,
            path: None,
            max_message_bytes: 1024 * 1024,
            handshake_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:7681");
        assert!(config.path.is_none());
        assert_eq!(config.max_message_bytes, 1_048_576);
        assert_eq!(config.handshake_timeout_secs, 10);
    }

    #[test]
    fn server_config_partial_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
host = "0.0.0.0"
path = "/pty"
"#,
        )
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:7681");
        assert_eq!(config.path.as_deref(), Some("/pty"));
    }
}
