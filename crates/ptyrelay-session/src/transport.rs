//! Connection halves the session consumes.
//!
//! A `tokio-tungstenite` `WebSocketStream::split()` satisfies both bounds;
//! tests use in-memory implementations.

use futures_util::{Sink, Stream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Outgoing half of a connection.
pub trait ConnectionSink: Sink<Message, Error = WsError> + Unpin {}

impl<T> ConnectionSink for T where T: Sink<Message, Error = WsError> + Unpin {}

/// Incoming half of a connection. `None` means the peer went away.
pub trait ConnectionStream: Stream<Item = Result<Message, WsError>> + Unpin {}

impl<T> ConnectionStream for T where T: Stream<Item = Result<Message, WsError>> + Unpin {}
