//! The two relay pumps and the per-message operations they share with
//! [`Session`](crate::Session).
//!
//! Each pump watches the session's cancellation token and cancels it when
//! it stops on its own, so whichever direction ends first ends both.

use std::fmt;
use std::io;

use futures_util::{SinkExt, StreamExt};
use ptyrelay_common::PtyError;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::protocol::{Frame, TermSize};
use crate::pty::PtyControl;
use crate::transport::{ConnectionSink, ConnectionStream};

/// Why a session stopped relaying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The PTY output reached end-of-stream.
    PtyExited,
    PtyReadFailed(String),
    /// The PTY write side disappeared.
    PtyInputClosed,
    /// The peer closed the connection or sent a Close frame.
    ConnectionClosed,
    ConnectionFailed(String),
    /// Cancelled from outside the session (server shutdown).
    Shutdown,
    SpawnFailed(String),
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::PtyExited => f.write_str("pty exited"),
            EndReason::PtyReadFailed(e) => write!(f, "pty read failed: {e}"),
            EndReason::PtyInputClosed => f.write_str("pty input closed"),
            EndReason::ConnectionClosed => f.write_str("connection closed"),
            EndReason::ConnectionFailed(e) => write!(f, "connection failed: {e}"),
            EndReason::Shutdown => f.write_str("shutdown"),
            EndReason::SpawnFailed(e) => write!(f, "spawn failed: {e}"),
        }
    }
}

// =============================================================================
// SHARED OPERATIONS
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ForwardError {
    Cancelled,
    InputClosed,
}

/// Queue one data frame for the PTY writer, waiting for room if the child
/// is not keeping up.
pub(crate) async fn forward_input(
    input: &mpsc::Sender<Vec<u8>>,
    data: Vec<u8>,
    cancel: &CancellationToken,
) -> Result<(), ForwardError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ForwardError::Cancelled),
        sent = input.send(data) => sent.map_err(|_| ForwardError::InputClosed),
    }
}

/// Resize the PTY, recording the new geometry only if the resize took.
pub(crate) fn apply_resize(
    control: &mut dyn PtyControl,
    geometry: &mut TermSize,
    size: TermSize,
) -> Result<(), PtyError> {
    control.resize(size)?;
    *geometry = size;
    Ok(())
}

// =============================================================================
// OUTBOUND (PTY -> CONNECTION)
// =============================================================================

#[derive(Debug, Default)]
pub(crate) struct OutboundReport {
    pub bytes: u64,
    pub chunks: u64,
    /// `None` when the pump was cancelled.
    pub end: Option<EndReason>,
}

pub(crate) async fn pump_outbound<K: ConnectionSink>(
    output: &mut mpsc::Receiver<io::Result<Vec<u8>>>,
    sink: &mut K,
    cancel: &CancellationToken,
    session: &str,
) -> OutboundReport {
    let mut report = OutboundReport::default();

    let end = loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => break None,
            chunk = output.recv() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                let len = bytes.len() as u64;
                // A peer that stops reading leaves the send pending.
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break None,
                    sent = sink.send(Message::binary(bytes)) => sent,
                };
                if let Err(e) = sent {
                    tracing::debug!(session, error = %e, "send to connection failed");
                    break Some(EndReason::ConnectionFailed(e.to_string()));
                }
                report.bytes += len;
                report.chunks += 1;
            }
            Some(Err(e)) => {
                tracing::warn!(session, error = %e, "PTY read failed");
                break Some(EndReason::PtyReadFailed(e.to_string()));
            }
            None => {
                tracing::debug!(session, "PTY output reached end-of-stream");
                break Some(EndReason::PtyExited);
            }
        }
    };

    if end.is_some() {
        cancel.cancel();
    }
    report.end = end;
    report
}

// =============================================================================
// INBOUND (CONNECTION -> PTY)
// =============================================================================

#[derive(Debug, Default)]
pub(crate) struct InboundReport {
    pub bytes: u64,
    pub frames: u64,
    pub resizes: u64,
    pub rejected: u64,
    /// `None` when the pump was cancelled.
    pub end: Option<EndReason>,
}

pub(crate) async fn pump_inbound<S: ConnectionStream>(
    stream: &mut S,
    input: &mpsc::Sender<Vec<u8>>,
    control: &mut dyn PtyControl,
    geometry: &mut TermSize,
    cancel: &CancellationToken,
    session: &str,
) -> InboundReport {
    let mut report = InboundReport::default();

    let end = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break None,
            next = stream.next() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                tracing::debug!(session, error = %e, "connection receive failed");
                break Some(EndReason::ConnectionFailed(e.to_string()));
            }
            None => break Some(EndReason::ConnectionClosed),
        };

        match Frame::classify(message) {
            Frame::Data(bytes) => {
                let len = bytes.len() as u64;
                match forward_input(input, bytes, cancel).await {
                    Ok(()) => {
                        report.bytes += len;
                        report.frames += 1;
                    }
                    Err(ForwardError::Cancelled) => break None,
                    Err(ForwardError::InputClosed) => {
                        tracing::warn!(session, "PTY input closed");
                        break Some(EndReason::PtyInputClosed);
                    }
                }
            }
            Frame::Control(size) => match apply_resize(control, geometry, size) {
                Ok(()) => {
                    report.resizes += 1;
                    tracing::debug!(session, %size, "PTY resized");
                }
                Err(e) => {
                    tracing::warn!(session, %size, error = %e, "PTY resize failed");
                }
            },
            Frame::Rejected(e) => {
                report.rejected += 1;
                tracing::warn!(session, error = %e, "discarding invalid control frame");
            }
            Frame::Transport => {}
            Frame::Close => break Some(EndReason::ConnectionClosed),
        }
    };

    if end.is_some() {
        cancel.cancel();
    }
    report.end = end;
    report
}
