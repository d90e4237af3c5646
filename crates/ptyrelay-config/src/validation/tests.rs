//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    assert!(validate(&RelayConfig::default()).is_ok());
}

#[test]
fn catches_zero_port() {
    let mut config = RelayConfig::default();
    config.server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
}

#[test]
fn catches_tiny_message_limit() {
    let mut config = RelayConfig::default();
    config.server.max_message_bytes = 16;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.max_message_bytes"));
}

#[test]
fn catches_relative_path() {
    let mut config = RelayConfig::default();
    config.server.path = Some("ws".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.path"));
}

#[test]
fn catches_zero_geometry() {
    let mut config = RelayConfig::default();
    config.terminal.default_cols = 0;
    config.terminal.default_rows = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("terminal.default_cols"));
    assert!(err.contains("terminal.default_rows"));
}

#[test]
fn catches_oversized_geometry() {
    let mut config = RelayConfig::default();
    config.terminal.default_rows = 5_000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("terminal.default_rows"));
}

#[test]
fn catches_zero_channel_capacity() {
    let mut config = RelayConfig::default();
    config.terminal.channel_capacity = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("terminal.channel_capacity"));
}

#[test]
fn catches_bad_env_key() {
    let mut config = RelayConfig::default();
    config.shell.env.insert("A=B".into(), "x".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("shell.env"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = RelayConfig::default();
    config.server.port = 0;
    config.terminal.exit_wait_secs = 0;
    config.terminal.term = String::new();
    let err = validate(&config).unwrap_err().to_string();
    assert_eq!(err.matches(';').count(), 2);
}
