use std::path::PathBuf;

use clap::Parser;
use ptyrelay_common::RelayError;
use ptyrelay_config::RelayConfig;

/// ptyrelay: serve a PTY-backed shell to browser terminals over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "ptyrelay", version, about)]
pub struct Args {
    /// Interface to bind (overrides `server.host`).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Config file path override.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) or a full filter
    /// directive such as `ptyrelay_session=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Shell program to spawn (overrides `shell.program`).
    #[arg(long)]
    pub shell: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Read the config file (or the default location) and apply the flags.
    pub fn load(&self) -> Result<RelayConfig, RelayError> {
        let mut config = ptyrelay_config::load_config(self.config.as_deref())?;
        self.apply(&mut config);
        Ok(config)
    }

    /// Command-line flags win over the config file.
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(shell) = &self.shell {
            config.shell.program = shell.clone();
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
