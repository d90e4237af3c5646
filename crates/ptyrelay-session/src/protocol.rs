//! Wire protocol between the browser terminal and the relay.
//!
//! Text messages carry resize commands as `{"row": <int>, "col": <int>}`.
//! Binary messages carry raw terminal bytes in both directions.

use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;

/// Terminal geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Build a size from untrusted dimensions, rejecting zero and anything
    /// that does not fit a `u16`.
    pub fn checked(cols: u64, rows: u64) -> Result<Self, ControlFrameError> {
        if cols == 0 || rows == 0 {
            return Err(ControlFrameError::ZeroDimension);
        }
        let cols = u16::try_from(cols).map_err(|_| ControlFrameError::OutOfRange(cols))?;
        let rows = u16::try_from(rows).map_err(|_| ControlFrameError::OutOfRange(rows))?;
        Ok(Self { cols, rows })
    }
}

impl std::fmt::Display for TermSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Why a text message was not accepted as a control frame.
#[derive(Debug, thiserror::Error)]
pub enum ControlFrameError {
    #[error("malformed control frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("resize dimensions must be > 0")]
    ZeroDimension,

    #[error("dimension {0} out of range for u16")]
    OutOfRange(u64),
}

#[derive(Debug, Deserialize)]
struct ResizeRequest {
    row: u64,
    col: u64,
}

/// Parse a text message into the requested terminal size.
pub fn parse_control(text: &str) -> Result<TermSize, ControlFrameError> {
    let request: ResizeRequest = serde_json::from_str(text)?;
    TermSize::checked(request.col, request.row)
}

/// A message received from the connection, classified for the bridge.
#[derive(Debug)]
pub enum Frame {
    Control(TermSize),
    Data(Vec<u8>),
    /// Text that is not a valid control object; never forwarded.
    Rejected(ControlFrameError),
    /// Transport-level traffic (ping/pong) the bridge ignores.
    Transport,
    Close,
}

impl Frame {
    pub fn classify(message: Message) -> Self {
        match message {
            Message::Text(text) => match parse_control(text.as_str()) {
                Ok(size) => Frame::Control(size),
                Err(e) => Frame::Rejected(e),
            },
            Message::Binary(data) => Frame::Data(data.to_vec()),
            Message::Close(_) => Frame::Close,
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Frame::Transport,
        }
    }
}
