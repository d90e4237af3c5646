use serde::{Deserialize, Serialize};

/// Terminal geometry defaults and PTY plumbing sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Columns used until the client sends its first resize.
    pub default_cols: u16,
    /// Rows used until the client sends its first resize.
    pub default_rows: u16,
    /// `TERM` exported to the shell.
    pub term: String,
    /// `COLORTERM` exported to the shell.
    pub colorterm: String,
    /// Largest single read from the PTY master.
    pub read_chunk_bytes: usize,
    /// Chunks buffered between the PTY threads and the session task.
    pub channel_capacity: usize,
    /// Seconds to wait for the child to be reaped after it is killed.
    pub exit_wait_secs: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            default_cols: 80,
            default_rows: 24,
            term: "xterm-256color".into(),
            colorterm: "truecolor".into(),
            read_chunk_bytes: 8_192,
            channel_capacity: 64,
            exit_wait_secs: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_config_defaults() {
        let config = TerminalConfig::default();
        assert_eq!(config.default_cols, 80);
        assert_eq!(config.default_rows, 24);
        assert_eq!(config.term, "xterm-256color");
        assert_eq!(config.colorterm, "truecolor");
        assert_eq!(config.read_chunk_bytes, 8_192);
    }

    #[test]
    fn terminal_config_partial_toml() {
        let config: TerminalConfig = toml::from_str("default_cols = 132").unwrap();
        assert_eq!(config.default_cols, 132);
        assert_eq!(config.default_rows, 24);
    }
}
