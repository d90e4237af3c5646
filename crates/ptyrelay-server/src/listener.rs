//! TCP accept loop: one task per connection, all tracked so shutdown can
//! wait for every session to tear down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use ptyrelay_common::{RelayError, SessionId};
use ptyrelay_config::{RelayConfig, ServerConfig};
use ptyrelay_session::{Establisher, Session};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::handshake;

/// Shared by every connection task.
struct ConnectionContext {
    server: ServerConfig,
    establisher: Establisher,
    exit_wait: Duration,
}

pub struct RelayServer {
    listener: TcpListener,
    context: Arc<ConnectionContext>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl RelayServer {
    pub async fn bind(
        config: &RelayConfig,
        establisher: Establisher,
        shutdown: CancellationToken,
    ) -> Result<Self, RelayError> {
        let addr = config.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Network(format!("failed to bind {addr}: {e}")))?;

        Ok(Self {
            listener,
            context: Arc::new(ConnectionContext {
                server: config.server.clone(),
                establisher,
                exit_wait: Duration::from_secs(config.terminal.exit_wait_secs),
            }),
            shutdown,
            tracker: TaskTracker::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept until the shutdown token fires, then wait for every session
    /// to finish its teardown.
    pub async fn serve(self) -> Result<(), RelayError> {
        let Self {
            listener,
            context,
            shutdown,
            tracker,
        } = self;

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let context = Arc::clone(&context);
                    let cancel = shutdown.child_token();
                    tracker.spawn(handle_connection(stream, peer, context, cancel));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }

        drop(listener);
        tracker.close();
        if !tracker.is_empty() {
            tracing::info!(sessions = tracker.len(), "waiting for sessions to close");
        }
        tracker.wait().await;
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<ConnectionContext>,
    cancel: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
    }

    let accepted = tokio::select! {
        _ = cancel.cancelled() => return,
        accepted = handshake::accept(stream, &context.server) => accepted,
    };
    let (ws, upgrade) = match accepted {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let id = SessionId::new();
    tracing::info!(
        peer = %peer,
        session = %id.short(),
        path = %upgrade.path,
        requested = ?upgrade.size,
        "connection upgraded"
    );

    let (sink, stream) = ws.split();
    let session = Session::new(id, sink, stream, cancel, context.exit_wait);
    let summary = session.run(&context.establisher, upgrade.size).await;
    tracing::debug!(peer = %peer, session = %summary.id.short(), "connection task finished");
}
