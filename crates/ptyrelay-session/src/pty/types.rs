//! PTY provider contract: spawn request, process handle, control trait.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use ptyrelay_common::PtyError;
use tokio::sync::mpsc;

use crate::protocol::TermSize;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default terminal columns.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal rows.
pub const DEFAULT_ROWS: u16 = 24;

// =============================================================================
// SPAWN REQUEST
// =============================================================================

/// Everything a provider needs to start a shell inside a PTY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Complete child environment; nothing else is inherited.
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
    pub size: TermSize,
}

// =============================================================================
// PROCESS HANDLE
// =============================================================================

/// Resize, kill and reap operations on a spawned PTY child.
///
/// `kill` and `wait` may block; the session calls them off the async
/// runtime.
pub trait PtyControl: Send {
    fn resize(&mut self, size: TermSize) -> Result<(), PtyError>;

    /// Send the child a termination signal.
    fn kill(&mut self) -> Result<(), PtyError>;

    /// Block until the child exits. Returns its exit code when known.
    fn wait(&mut self) -> Option<u32>;
}

/// A live PTY child, split into its independent read side, write side and
/// control surface.
pub struct PtyProcess {
    /// Output chunks in emission order. The channel closes on end-of-stream;
    /// an `Err` item is a read failure and is always the last item.
    pub output: mpsc::Receiver<io::Result<Vec<u8>>>,
    /// Input chunks, written to the PTY in the order sent. Dropping the
    /// sender releases the write side.
    pub input: mpsc::Sender<Vec<u8>>,
    pub control: Box<dyn PtyControl>,
}

/// Spawns PTY-backed processes.
pub trait PtyProvider: Send + Sync {
    /// Open a PTY and start `request.program` attached to it. Blocking.
    ///
    /// On error nothing is left running.
    fn open(&self, request: &SpawnRequest) -> Result<PtyProcess, PtyError>;
}
