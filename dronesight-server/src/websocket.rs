// WebSocket transport for analysis sessions

use crate::http::AppState;
use crate::session::{FrameTransport, SessionHandler, TransportEvent};
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use dronesight_core::{Error, Result};
use futures_util::StreamExt;
use tracing::debug;

/// axum WebSocket adapted to the session transport seam
pub struct WebSocketTransport {
    socket: WebSocket,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl FrameTransport for WebSocketTransport {
    async fn recv(&mut self) -> Option<Result<TransportEvent>> {
        let message = self.socket.next().await?;
        Some(match message {
            Ok(Message::Text(text)) => Ok(TransportEvent::Text(text)),
            Ok(Message::Binary(data)) => Ok(TransportEvent::Binary(data)),
            Ok(Message::Ping(_)) => Ok(TransportEvent::Ping),
            Ok(Message::Pong(_)) => Ok(TransportEvent::Pong),
            Ok(Message::Close(_)) => Ok(TransportEvent::Close),
            Err(e) => Err(Error::Transport(e.to_string())),
        })
    }

    async fn send(&mut self, text: String) -> Result<()> {
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

/// Socket-level message cap, as a multiple of the session's size limit.
///
/// Messages between the session limit and this cap get a failure response;
/// anything larger is dropped by the socket and ends the session unanswered.
pub const TRANSPORT_LIMIT_FACTOR: usize = 2;

pub fn transport_limit(max_message_bytes: usize) -> usize {
    max_message_bytes.saturating_mul(TRANSPORT_LIMIT_FACTOR)
}

/// WebSocket upgrade handler for the analyze endpoint
pub async fn analyze_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let transport_limit = transport_limit(state.context.max_message_bytes());

    ws.max_message_size(transport_limit)
        .max_frame_size(transport_limit)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut session = SessionHandler::new(state.context.clone());
    let mut transport = WebSocketTransport::new(socket);

    let stats = session.run(&mut transport).await;
    debug!(
        "WebSocket {} finished: {} frames, {} failures",
        session.id(),
        stats.frames,
        stats.failures
    );
}
