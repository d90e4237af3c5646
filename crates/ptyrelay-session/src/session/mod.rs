//! One relay session: a connection paired with one PTY-backed shell.
//!
//! The session owns both the transport halves and the PTY handle. It runs
//! the two pumps from [`crate::bridge`] inside its own task and funnels
//! every way of ending (peer gone, shell gone, server shutdown) into a
//! single [`Session::teardown`].

use std::time::Duration;

use futures_util::SinkExt;
use ptyrelay_common::{PtyError, SessionError, SessionId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bridge::{self, EndReason, ForwardError};
use crate::establish::Establisher;
use crate::lifecycle::{Lifecycle, SessionState};
use crate::protocol::TermSize;
use crate::pty::{PtyControl, PtyProcess, DEFAULT_COLS, DEFAULT_ROWS};
use crate::transport::{ConnectionSink, ConnectionStream};

/// Upper bound on flushing the close handshake to a stalled peer.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// STATS / SUMMARY
// =============================================================================

/// Running counters for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Bytes written to the PTY from the connection.
    pub bytes_in: u64,
    /// Bytes forwarded from the PTY to the connection.
    pub bytes_out: u64,
    pub resizes: u64,
    /// Text frames discarded as invalid control frames.
    pub rejected: u64,
}

/// What a finished session reports back to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub end: EndReason,
    pub stats: SessionStats,
    pub exit_code: Option<u32>,
}

// =============================================================================
// SESSION
// =============================================================================

struct PtyLink {
    output: mpsc::Receiver<std::io::Result<Vec<u8>>>,
    input: mpsc::Sender<Vec<u8>>,
    control: Box<dyn PtyControl>,
}

impl From<PtyProcess> for PtyLink {
    fn from(process: PtyProcess) -> Self {
        Self {
            output: process.output,
            input: process.input,
            control: process.control,
        }
    }
}

pub struct Session<K, S> {
    id: SessionId,
    lifecycle: Lifecycle,
    sink: K,
    stream: S,
    pty: Option<PtyLink>,
    geometry: TermSize,
    stats: SessionStats,
    exit_code: Option<u32>,
    exit_wait: Duration,
    cancel: CancellationToken,
    connection_closed: bool,
}

impl<K, S> Session<K, S>
where
    K: ConnectionSink,
    S: ConnectionStream,
{
    /// Create a session for an upgraded connection. `cancel` is normally a
    /// child of the server's shutdown token.
    pub fn new(
        id: SessionId,
        sink: K,
        stream: S,
        cancel: CancellationToken,
        exit_wait: Duration,
    ) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::new(),
            sink,
            stream,
            pty: None,
            geometry: TermSize::new(DEFAULT_COLS, DEFAULT_ROWS),
            stats: SessionStats::default(),
            exit_code: None,
            exit_wait,
            cancel,
            connection_closed: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn geometry(&self) -> TermSize {
        self.geometry
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    /// Establish, relay until either side ends, tear down.
    pub async fn run(
        mut self,
        establisher: &Establisher,
        requested: Option<TermSize>,
    ) -> SessionSummary {
        let end = match self.open(establisher, requested).await {
            Ok(()) => {
                let end = self.relay().await.unwrap_or(EndReason::Shutdown);
                self.teardown().await;
                end
            }
            Err(SessionError::Closed) => EndReason::Shutdown,
            Err(e) => EndReason::SpawnFailed(e.to_string()),
        };

        let summary = SessionSummary {
            id: self.id.clone(),
            end,
            stats: self.stats.clone(),
            exit_code: self.exit_code,
        };
        tracing::info!(
            session = %self.id.short(),
            end = %summary.end,
            bytes_in = summary.stats.bytes_in,
            bytes_out = summary.stats.bytes_out,
            resizes = summary.stats.resizes,
            rejected = summary.stats.rejected,
            exit_code = ?summary.exit_code,
            "session closed"
        );
        summary
    }

    /// Spawn the PTY child. On failure the connection is closed and the
    /// session goes straight to `Closed`.
    pub async fn open(
        &mut self,
        establisher: &Establisher,
        requested: Option<TermSize>,
    ) -> Result<(), SessionError> {
        if self.lifecycle.state() != SessionState::Opening {
            return Err(SessionError::Closed);
        }
        if self.cancel.is_cancelled() {
            self.lifecycle.fail();
            self.close_connection().await;
            return Err(SessionError::Closed);
        }

        match establisher.establish(requested).await {
            Ok((process, size)) => {
                self.pty = Some(PtyLink::from(process));
                self.geometry = size;
                self.lifecycle.activate();
                tracing::info!(session = %self.id.short(), %size, "session active");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session = %self.id.short(), error = %e, "PTY spawn failed");
                self.lifecycle.fail();
                self.close_connection().await;
                Err(e.into())
            }
        }
    }

    /// Run both pumps until one of them ends, then return why. Does not
    /// tear down; [`Session::run`] does that.
    pub async fn relay(&mut self) -> Result<EndReason, SessionError> {
        if !self.lifecycle.accepts_io() {
            return Err(SessionError::Closed);
        }
        let link = self.pty.as_mut().ok_or(SessionError::Closed)?;
        let label = self.id.short();

        let (outbound, inbound) = tokio::join!(
            bridge::pump_outbound(&mut link.output, &mut self.sink, &self.cancel, label),
            bridge::pump_inbound(
                &mut self.stream,
                &link.input,
                link.control.as_mut(),
                &mut self.geometry,
                &self.cancel,
                label,
            ),
        );

        self.stats.bytes_out += outbound.bytes;
        self.stats.bytes_in += inbound.bytes;
        self.stats.resizes += inbound.resizes;
        self.stats.rejected += inbound.rejected;

        let end = outbound.end.or(inbound.end).unwrap_or(EndReason::Shutdown);
        tracing::debug!(
            session = %label,
            %end,
            chunks_out = outbound.chunks,
            frames_in = inbound.frames,
            "relay stopped"
        );
        Ok(end)
    }

    /// Release everything the session holds. Only the first call does any
    /// work; it returns `true` when it did.
    pub async fn teardown(&mut self) -> bool {
        if !self.lifecycle.begin_close() {
            return false;
        }
        self.cancel.cancel();

        if let Some(PtyLink {
            output,
            input,
            control,
        }) = self.pty.take()
        {
            self.exit_code = reap(control, input, self.exit_wait, self.id.short()).await;
            drop(output);
        }

        self.close_connection().await;
        self.lifecycle.finish_close();
        true
    }

    /// Queue bytes for the PTY outside the relay loop.
    pub async fn write_input(&mut self, data: Vec<u8>) -> Result<(), SessionError> {
        if !self.lifecycle.accepts_io() {
            return Err(SessionError::Closed);
        }
        let link = self.pty.as_ref().ok_or(SessionError::Closed)?;
        let len = data.len() as u64;
        match bridge::forward_input(&link.input, data, &self.cancel).await {
            Ok(()) => {
                self.stats.bytes_in += len;
                Ok(())
            }
            Err(ForwardError::Cancelled) => Err(SessionError::Closed),
            Err(ForwardError::InputClosed) => Err(PtyError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "PTY input closed",
            ))
            .into()),
        }
    }

    /// Resize the PTY outside the relay loop.
    pub fn resize(&mut self, size: TermSize) -> Result<(), SessionError> {
        if !self.lifecycle.accepts_io() {
            return Err(SessionError::Closed);
        }
        let link = self.pty.as_mut().ok_or(SessionError::Closed)?;
        bridge::apply_resize(link.control.as_mut(), &mut self.geometry, size)?;
        self.stats.resizes += 1;
        Ok(())
    }

    async fn close_connection(&mut self) {
        if self.connection_closed {
            return;
        }
        self.connection_closed = true;
        match tokio::time::timeout(CLOSE_TIMEOUT, self.sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(session = %self.id.short(), error = %e, "connection close failed")
            }
            Err(_) => tracing::debug!(session = %self.id.short(), "connection close timed out"),
        }
    }
}

/// Kill the child, release its input, and wait a bounded time for it to
/// exit. The master is released when `control` drops.
async fn reap(
    mut control: Box<dyn PtyControl>,
    input: mpsc::Sender<Vec<u8>>,
    exit_wait: Duration,
    session: &str,
) -> Option<u32> {
    let label = session.to_string();
    let task = tokio::task::spawn_blocking(move || {
        if let Err(e) = control.kill() {
            // Usually the child already exited.
            tracing::debug!(session = %label, error = %e, "kill failed");
        }
        drop(input);
        control.wait()
    });

    match tokio::time::timeout(exit_wait, task).await {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            tracing::warn!(session, error = %e, "reaper task failed");
            None
        }
        Err(_) => {
            tracing::warn!(
                session,
                wait = ?exit_wait,
                "child did not exit in time, leaving it to the reaper thread"
            );
            None
        }
    }
}
