//! Full configuration validation.
//!
//! Checks numeric ranges and path shapes, collecting every problem into a
//! single `ConfigError` rather than stopping at the first.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::RelayConfig;
use helpers::validate_range;
use ptyrelay_common::ConfigError;

/// Largest geometry accepted for the initial terminal size.
pub const MAX_DEFAULT_DIMENSION: u64 = 1_000;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_terminal(&mut errors, config);
    validate_shell(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &RelayConfig) {
    let server = &config.server;
    validate_range(errors, "server.port", server.port.into(), 1, 65_535);
    validate_range(
        errors,
        "server.max_message_bytes",
        server.max_message_bytes as u64,
        1_024,
        64 * 1024 * 1024,
    );
    validate_range(
        errors,
        "server.handshake_timeout_secs",
        server.handshake_timeout_secs,
        1,
        300,
    );
    if server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    if let Some(path) = &server.path {
        if !path.starts_with('/') {
            errors.push(format!("server.path = {path:?} must start with '/'"));
        }
    }
}

fn validate_terminal(errors: &mut Vec<String>, config: &RelayConfig) {
    let terminal = &config.terminal;
    validate_range(
        errors,
        "terminal.default_cols",
        terminal.default_cols.into(),
        1,
        MAX_DEFAULT_DIMENSION,
    );
    validate_range(
        errors,
        "terminal.default_rows",
        terminal.default_rows.into(),
        1,
        MAX_DEFAULT_DIMENSION,
    );
    validate_range(
        errors,
        "terminal.read_chunk_bytes",
        terminal.read_chunk_bytes as u64,
        512,
        1024 * 1024,
    );
    validate_range(
        errors,
        "terminal.channel_capacity",
        terminal.channel_capacity as u64,
        1,
        4_096,
    );
    validate_range(errors, "terminal.exit_wait_secs", terminal.exit_wait_secs, 1, 60);
    if terminal.term.trim().is_empty() {
        errors.push("terminal.term must not be empty".into());
    }
}

fn validate_shell(errors: &mut Vec<String>, config: &RelayConfig) {
    for key in config.shell.env.keys() {
        if key.is_empty() || key.contains('=') {
            errors.push(format!("shell.env key {key:?} is not a valid variable name"));
        }
    }
}
