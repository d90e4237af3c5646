//! Terminal relay sessions: one PTY-backed shell per WebSocket connection.
//!
//! [`Establisher`] spawns the shell, [`Session`] relays bytes and resize
//! commands between the connection and the PTY and owns teardown.

pub mod bridge;
pub mod establish;
pub mod lifecycle;
pub mod protocol;
pub mod pty;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use bridge::EndReason;
pub use establish::{Establisher, HostEnvironment};
pub use lifecycle::{Lifecycle, SessionState};
pub use protocol::{parse_control, ControlFrameError, Frame, TermSize};
pub use pty::{NativePtyProvider, PtyControl, PtyProcess, PtyProvider, SpawnRequest};
pub use session::{Session, SessionStats, SessionSummary};
pub use transport::{ConnectionSink, ConnectionStream};
