//! WebSocket upgrade: size limits, path restriction, and the initial
//! terminal geometry carried in the query string (`?cols=120&rows=40`).

use std::time::Duration;

use ptyrelay_common::RelayError;
use ptyrelay_config::ServerConfig;
use ptyrelay_session::TermSize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{accept_hdr_async_with_config, WebSocketStream};

/// What the relay keeps from an accepted upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgrade {
    pub path: String,
    pub size: Option<TermSize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HandshakeRejection {
    pub status: StatusCode,
    pub body: String,
}

impl HandshakeRejection {
    fn into_response(self) -> ErrorResponse {
        let mut response = ErrorResponse::new(Some(self.body));
        *response.status_mut() = self.status;
        response
    }
}

/// Check the request path and pull the requested geometry out of it.
pub(crate) fn inspect_request(
    request: &Request,
    required_path: Option<&str>,
) -> Result<Upgrade, HandshakeRejection> {
    let path = request.uri().path();
    if let Some(required) = required_path {
        if path != required {
            return Err(HandshakeRejection {
                status: StatusCode::NOT_FOUND,
                body: "Not Found".to_string(),
            });
        }
    }

    Ok(Upgrade {
        path: path.to_string(),
        size: request.uri().query().and_then(requested_size),
    })
}

/// Both `cols` and `rows` must be present and valid; otherwise the
/// configured default applies.
pub(crate) fn requested_size(query: &str) -> Option<TermSize> {
    let cols = query_param(query, "cols")?.parse::<u64>().ok()?;
    let rows = query_param(query, "rows")?.parse::<u64>().ok()?;
    TermSize::checked(cols, rows).ok()
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        (name == key).then_some(value)
    })
}

fn ws_config(server: &ServerConfig) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(server.max_message_bytes))
        .max_frame_size(Some(server.max_message_bytes))
}

/// Run the server side of the upgrade within the configured timeout.
pub async fn accept<S>(
    stream: S,
    server: &ServerConfig,
) -> Result<(WebSocketStream<S>, Upgrade), RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut upgrade = None;
    let required_path = server.path.as_deref();
    let callback = |request: &Request, response: Response| {
        inspect_request(request, required_path)
            .map(|accepted| {
                upgrade = Some(accepted);
                response
            })
            .map_err(HandshakeRejection::into_response)
    };

    let timeout = Duration::from_secs(server.handshake_timeout_secs);
    let ws = tokio::time::timeout(
        timeout,
        accept_hdr_async_with_config(stream, callback, Some(ws_config(server))),
    )
    .await
    .map_err(|_| RelayError::Network(format!("handshake timed out after {timeout:?}")))?
    .map_err(|e| RelayError::Network(format!("handshake failed: {e}")))?;

    let upgrade = upgrade
        .ok_or_else(|| RelayError::Network("handshake completed without a request".into()))?;
    Ok((ws, upgrade))
}
