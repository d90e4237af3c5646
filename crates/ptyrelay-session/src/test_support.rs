//! In-memory PTY provider and connection halves for unit tests.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Sink, Stream};
use ptyrelay_common::PtyError;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::protocol::TermSize;
use crate::pty::{PtyControl, PtyProcess, PtyProvider, SpawnRequest};

// =============================================================================
// PTY
// =============================================================================

#[derive(Debug, Default)]
pub(crate) struct ControlCalls {
    pub resizes: Vec<TermSize>,
    pub kills: usize,
    pub waits: usize,
}

/// The far side of a fake PTY: what the "child" writes and reads.
pub(crate) struct FakePty {
    pub output: mpsc::Sender<io::Result<Vec<u8>>>,
    pub input: mpsc::Receiver<Vec<u8>>,
    pub calls: Arc<Mutex<ControlCalls>>,
}

impl FakePty {
    pub fn calls(&self) -> Arc<Mutex<ControlCalls>> {
        Arc::clone(&self.calls)
    }
}

struct FakeControl {
    calls: Arc<Mutex<ControlCalls>>,
    exit_code: Option<u32>,
    fail_resize: bool,
}

impl PtyControl for FakeControl {
    fn resize(&mut self, size: TermSize) -> Result<(), PtyError> {
        if self.fail_resize {
            return Err(PtyError::Resize("bad file descriptor".into()));
        }
        self.calls.lock().unwrap().resizes.push(size);
        Ok(())
    }

    fn kill(&mut self) -> Result<(), PtyError> {
        self.calls.lock().unwrap().kills += 1;
        Ok(())
    }

    fn wait(&mut self) -> Option<u32> {
        self.calls.lock().unwrap().waits += 1;
        self.exit_code
    }
}

pub(crate) struct FakePtyProvider {
    fail: bool,
    fail_resize: bool,
    last_request: Mutex<Option<SpawnRequest>>,
    pty: Mutex<Option<FakePty>>,
}

impl FakePtyProvider {
    pub fn new() -> Self {
        Self {
            fail: false,
            fail_resize: false,
            last_request: Mutex::new(None),
            pty: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Spawns succeed but every resize of the opened PTY fails.
    pub fn failing_resize() -> Self {
        Self {
            fail_resize: true,
            ..Self::new()
        }
    }

    pub fn last_request(&self) -> Option<SpawnRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn take_pty(&self) -> Option<FakePty> {
        self.pty.lock().unwrap().take()
    }

    /// Wait for a session running elsewhere to open its PTY.
    pub async fn wait_for_pty(&self) -> FakePty {
        for _ in 0..500 {
            if let Some(pty) = self.take_pty() {
                return pty;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("PTY was never opened");
    }
}

impl PtyProvider for FakePtyProvider {
    fn open(&self, request: &SpawnRequest) -> Result<PtyProcess, PtyError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail {
            return Err(PtyError::Spawn(format!(
                "failed to spawn '{}': not found",
                request.program
            )));
        }

        let (out_tx, out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        let calls = Arc::new(Mutex::new(ControlCalls::default()));
        *self.pty.lock().unwrap() = Some(FakePty {
            output: out_tx,
            input: in_rx,
            calls: Arc::clone(&calls),
        });

        Ok(PtyProcess {
            output: out_rx,
            input: in_tx,
            control: Box::new(FakeControl {
                calls,
                exit_code: Some(0),
                fail_resize: self.fail_resize,
            }),
        })
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Records everything the session sends.
pub(crate) struct RecordingSink {
    sent: mpsc::UnboundedSender<Message>,
    closes: Arc<AtomicUsize>,
    broken: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

impl RecordingSink {
    fn readiness(&self) -> Poll<Result<(), WsError>> {
        if self.stalled.load(Ordering::SeqCst) {
            Poll::Pending
        } else {
            Poll::Ready(Ok(()))
        }
    }
}

impl Sink<Message> for RecordingSink {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        self.readiness()
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), WsError> {
        if self.broken.load(Ordering::SeqCst) || self.closes.load(Ordering::SeqCst) > 0 {
            return Err(WsError::AlreadyClosed);
        }
        let _ = self.sent.send(item);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        self.readiness()
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Feeds scripted messages to the session.
pub(crate) struct ScriptedStream {
    rx: mpsc::UnboundedReceiver<Result<Message, WsError>>,
}

impl Stream for ScriptedStream {
    type Item = Result<Message, WsError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// The browser's side of an in-memory connection.
pub(crate) struct FakeClient {
    tx: Option<mpsc::UnboundedSender<Result<Message, WsError>>>,
    pub received: mpsc::UnboundedReceiver<Message>,
    closes: Arc<AtomicUsize>,
    broken: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

impl FakeClient {
    pub fn send(&self, message: Message) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Ok(message));
        }
    }

    pub fn send_text(&self, text: &str) {
        self.send(Message::text(text));
    }

    pub fn send_binary(&self, bytes: &[u8]) {
        self.send(Message::binary(bytes.to_vec()));
    }

    pub fn fail(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Err(WsError::ConnectionClosed));
        }
    }

    /// Drop the connection without a Close frame.
    pub fn disconnect(&mut self) {
        self.tx = None;
    }

    /// Make every later send from the session fail.
    pub fn break_sink(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Stop reading: sends from the session stay pending. Closing still
    /// completes.
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Concatenate binary payloads until `len` bytes have arrived.
    pub async fn read_binary(&mut self, len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        while out.len() < len {
            match tokio::time::timeout(Duration::from_secs(5), self.received.recv()).await {
                Ok(Some(Message::Binary(bytes))) => out.extend_from_slice(&bytes),
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
        out
    }

    /// Read binary payloads until the lossy text contains `needle`.
    pub async fn read_until(&mut self, needle: &str) -> String {
        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !String::from_utf8_lossy(&seen).contains(needle) {
            match tokio::time::timeout_at(deadline, self.received.recv()).await {
                Ok(Some(Message::Binary(bytes))) => seen.extend_from_slice(&bytes),
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
        String::from_utf8_lossy(&seen).into_owned()
    }
}

pub(crate) fn connection() -> (RecordingSink, ScriptedStream, FakeClient) {
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let (script_tx, script_rx) = mpsc::unbounded_channel();
    let closes = Arc::new(AtomicUsize::new(0));
    let broken = Arc::new(AtomicBool::new(false));
    let stalled = Arc::new(AtomicBool::new(false));

    let sink = RecordingSink {
        sent: sent_tx,
        closes: Arc::clone(&closes),
        broken: Arc::clone(&broken),
        stalled: Arc::clone(&stalled),
    };
    let stream = ScriptedStream { rx: script_rx };
    let client = FakeClient {
        tx: Some(script_tx),
        received: sent_rx,
        closes,
        broken,
        stalled,
    };
    (sink, stream, client)
}
