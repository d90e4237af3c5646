//! Session state machine.
//!
//! ```text
//! Opening ──spawn ok──▶ Active ──close──▶ Closing ──released──▶ Closed
//!    └──────────────spawn failed──────────────────────────────────▲
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Active,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Opening => "opening",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Guards session transitions. Every method returns whether the
/// transition happened, so callers can act exactly once.
#[derive(Debug)]
pub struct Lifecycle {
    state: SessionState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: SessionState::Opening,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `Opening -> Active`.
    pub fn activate(&mut self) -> bool {
        self.transition(SessionState::Opening, SessionState::Active)
    }

    /// `Opening -> Closed`, when the PTY could not be created.
    pub fn fail(&mut self) -> bool {
        self.transition(SessionState::Opening, SessionState::Closed)
    }

    /// `Active -> Closing`. Returns `false` for duplicate teardown requests.
    pub fn begin_close(&mut self) -> bool {
        self.transition(SessionState::Active, SessionState::Closing)
    }

    /// `Closing -> Closed`, once every resource is released.
    pub fn finish_close(&mut self) -> bool {
        self.transition(SessionState::Closing, SessionState::Closed)
    }

    /// Reads and writes are only issued while active.
    pub fn accepts_io(&self) -> bool {
        self.state == SessionState::Active
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> bool {
        if self.state != from {
            return false;
        }
        tracing::trace!(%from, %to, "session state transition");
        self.state = to;
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
