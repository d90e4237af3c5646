//! PTY provider seam.
//!
//! The session core talks to the child process only through
//! [`PtyProvider`] and the [`PtyProcess`] it returns. [`NativePtyProvider`]
//! is the `portable-pty` implementation used in production; tests plug in
//! an in-memory provider.

mod native;
mod types;

pub use native::{default_shell, NativePtyProvider};
pub use types::{PtyControl, PtyProcess, PtyProvider, SpawnRequest, DEFAULT_COLS, DEFAULT_ROWS};
