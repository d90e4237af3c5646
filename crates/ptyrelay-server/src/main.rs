//! ptyrelay: serve a PTY-backed shell to browser terminals over WebSocket.
//!
//! Each accepted connection gets its own shell. Text frames carry resize
//! commands, binary frames carry raw terminal bytes in both directions.

mod cli;
mod handshake;
mod listener;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use ptyrelay_common::RelayError;
use ptyrelay_config::RelayConfig;
use ptyrelay_session::{Establisher, HostEnvironment, NativePtyProvider};
use tokio_util::sync::CancellationToken;

use crate::listener::RelayServer;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    let log = logging::init(args.log_level.as_deref());

    let config = match args.load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    log.apply_config(&config.logging);

    if args.print_config {
        print!("{}", ptyrelay_config::config_to_toml(&config));
        return ExitCode::SUCCESS;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> Result<(), RelayError> {
    let provider = NativePtyProvider::new(
        config.terminal.read_chunk_bytes,
        config.terminal.channel_capacity,
    );
    let establisher = Establisher::new(
        config.shell.clone(),
        config.terminal.clone(),
        HostEnvironment::capture(),
        Arc::new(provider),
    );

    let shutdown = CancellationToken::new();
    let server = RelayServer::bind(&config, establisher, shutdown.clone()).await?;
    tracing::info!(
        "ptyrelay v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        server.local_addr()?
    );

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("interrupt received, shutting down"),
            Err(e) => {
                tracing::warn!("cannot listen for ctrl-c: {e}");
                return;
            }
        }
        shutdown.cancel();
    });

    server.serve().await?;
    tracing::info!("shutdown complete");
    Ok(())
}
