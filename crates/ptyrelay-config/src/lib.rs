//! ptyrelay configuration system.
//!
//! TOML-based configuration for the relay server, the spawned shell, and
//! the terminal defaults. Every section uses serde defaults so partial
//! files work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! let config = ptyrelay_config::load_config(None).expect("failed to load config");
//! println!("{}", config.server.bind_addr());
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LogLevel, LoggingConfig, RelayConfig, ServerConfig, ShellConfig, TerminalConfig};

use ptyrelay_common::ConfigError;
use std::path::Path;

/// Load config from `path` if given, otherwise from the platform default
/// location (creating a commented default file when none exists).
///
/// A file that parses but fails validation is replaced by defaults with a
/// warning; a missing explicit path or unparsable file is an error.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => toml_loader::load_default(),
    }
}

/// Serialize a config back to TOML, e.g. for `--print-config`.
pub fn config_to_toml(config: &RelayConfig) -> String {
    toml::to_string_pretty(config)
        .unwrap_or_else(|e| format!("# failed to serialize config: {e}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_toml_contains_all_sections() {
        let toml = config_to_toml(&RelayConfig::default());
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[shell]"));
        assert!(toml.contains("[terminal]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let toml = config_to_toml(&RelayConfig::default());
        let parsed: RelayConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.server.port, 7681);
        assert_eq!(parsed.terminal.default_cols, 80);
        assert_eq!(parsed.terminal.default_rows, 24);
        assert_eq!(parsed.logging.level, LogLevel::Info);
    }

    #[test]
    fn load_config_with_explicit_missing_path_errors() {
        let result = load_config(Some(Path::new("/tmp/ptyrelay_missing_config.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
