//! `portable-pty` backed provider: one reader and one writer thread per
//! child, bridged to the session task with bounded tokio channels.

use std::io::{self, Read, Write};
use std::thread;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use ptyrelay_common::PtyError;
use tokio::sync::mpsc;

use super::types::{PtyControl, PtyProcess, PtyProvider, SpawnRequest};
use crate::protocol::TermSize;

/// Shell used when neither the config nor the host environment names one.
pub fn default_shell() -> &'static str {
    #[cfg(windows)]
    {
        "cmd.exe"
    }
    #[cfg(not(windows))]
    {
        "/bin/sh"
    }
}

fn pty_size(size: TermSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn build_command(request: &SpawnRequest) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(&request.program);
    cmd.args(&request.args);
    cmd.env_clear();
    for (key, value) in &request.env {
        cmd.env(key, value);
    }
    cmd.cwd(&request.cwd);
    cmd
}

/// A read error that means the slave side went away (the child exited).
fn is_hangup(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        // EIO: Linux reports a closed slave this way instead of EOF.
        e.raw_os_error() == Some(5)
    }
    #[cfg(not(unix))]
    {
        e.kind() == io::ErrorKind::BrokenPipe
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Spawns children on the host's native PTY system.
#[derive(Debug, Clone)]
pub struct NativePtyProvider {
    read_chunk: usize,
    channel_capacity: usize,
}

impl NativePtyProvider {
    pub fn new(read_chunk: usize, channel_capacity: usize) -> Self {
        Self {
            read_chunk: read_chunk.max(1),
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for NativePtyProvider {
    fn default() -> Self {
        Self::new(8_192, 64)
    }
}

impl PtyProvider for NativePtyProvider {
    fn open(&self, request: &SpawnRequest) -> Result<PtyProcess, PtyError> {
        let pair = native_pty_system()
            .openpty(pty_size(request.size))
            .map_err(|e| PtyError::Spawn(format!("failed to open PTY: {e}")))?;

        let mut child = pair
            .slave
            .spawn_command(build_command(request))
            .map_err(|e| PtyError::Spawn(format!("failed to spawn '{}': {e}", request.program)))?;

        // Only the master is needed from here on.
        drop(pair.slave);

        match self.attach(pair.master.as_ref()) {
            Ok((output, input)) => {
                tracing::debug!(
                    program = %request.program,
                    pid = ?child.process_id(),
                    size = %request.size,
                    "PTY child spawned"
                );
                Ok(PtyProcess {
                    output,
                    input,
                    control: Box::new(NativeControl {
                        master: pair.master,
                        child,
                    }),
                })
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        }
    }
}

impl NativePtyProvider {
    /// Start the reader and writer threads on the master side.
    fn attach(
        &self,
        master: &(dyn MasterPty + Send),
    ) -> Result<(mpsc::Receiver<io::Result<Vec<u8>>>, mpsc::Sender<Vec<u8>>), PtyError> {
        let mut reader = master
            .try_clone_reader()
            .map_err(|e| PtyError::Spawn(format!("failed to clone PTY reader: {e}")))?;
        let mut writer = master
            .take_writer()
            .map_err(|e| PtyError::Spawn(format!("failed to take PTY writer: {e}")))?;

        let (out_tx, out_rx) = mpsc::channel::<io::Result<Vec<u8>>>(self.channel_capacity);
        let chunk = self.read_chunk;
        thread::Builder::new()
            .name("pty-reader".to_string())
            .spawn(move || {
                let mut buf = vec![0u8; chunk];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if out_tx.blocking_send(Ok(buf[..n].to_vec())).is_err() {
                                break; // Session dropped the receiver
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) if is_hangup(&e) => break,
                        Err(e) => {
                            tracing::debug!("PTY reader error: {e}");
                            let _ = out_tx.blocking_send(Err(e));
                            break;
                        }
                    }
                }
            })
            .map_err(|e| PtyError::Spawn(format!("failed to spawn PTY reader thread: {e}")))?;

        let (in_tx, mut in_rx) = mpsc::channel::<Vec<u8>>(self.channel_capacity);
        thread::Builder::new()
            .name("pty-writer".to_string())
            .spawn(move || {
                while let Some(data) = in_rx.blocking_recv() {
                    if let Err(e) = writer.write_all(&data).and_then(|()| writer.flush()) {
                        tracing::warn!(error = %e, bytes = data.len(), "PTY write failed, chunk dropped");
                    }
                }
            })
            .map_err(|e| PtyError::Spawn(format!("failed to spawn PTY writer thread: {e}")))?;

        Ok((out_rx, in_tx))
    }
}

// =============================================================================
// CONTROL
// =============================================================================

/// Owns the master (for resize) and the child (for kill / wait). Dropping
/// it closes the master file descriptor.
struct NativeControl {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl PtyControl for NativeControl {
    fn resize(&mut self, size: TermSize) -> Result<(), PtyError> {
        self.master
            .resize(pty_size(size))
            .map_err(|e| PtyError::Resize(e.to_string()))
    }

    fn kill(&mut self) -> Result<(), PtyError> {
        // portable-pty sends SIGHUP first and escalates if the child lingers.
        self.child
            .kill()
            .map_err(|e| PtyError::Kill(e.to_string()))
    }

    fn wait(&mut self) -> Option<u32> {
        match self.child.wait() {
            Ok(status) => Some(status.exit_code()),
            Err(e) => {
                tracing::debug!("PTY wait error: {e}");
                None
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
