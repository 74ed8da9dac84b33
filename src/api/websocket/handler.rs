//! WebSocket connection handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::events::{ClientMessage, LaggedMessage, PongMessage, WelcomeMessage, WsMessage};
use super::hub::ChannelHub;
use crate::api::http::AppState;
use crate::api::rest::{ApiError, ApiQuery, ApiResult};
use crate::scoring::DASHBOARD_CHANNEL;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// `match:<id>` or `dashboard` (the default)
    pub channel: Option<String>,
}

/// GET /ws - WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ApiQuery(params): ApiQuery<WsParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match resolve_channel(&state, params) {
        Ok(channel) => ws.on_upgrade(move |socket| handle_socket(socket, state, channel)),
        Err(err) => err.into_response(),
    }
}

/// Pick the channel a viewer asked for; match channels must name a stored match
pub fn resolve_channel(state: &AppState, params: WsParams) -> ApiResult<String> {
    let channel = params
        .channel
        .unwrap_or_else(|| DASHBOARD_CHANNEL.to_string());
    if !ChannelHub::is_valid_channel(&channel) {
        return Err(ApiError::validation(format!("unknown channel '{}'", channel)));
    }
    if let Some(match_id) = channel.strip_prefix("match:") {
        state.service.get_match(match_id)?;
    }
    Ok(channel)
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, channel: String) {
    let rx = state.hub.subscribe(&channel);
    info!(%channel, "Viewer connected");

    follow(socket, rx, &state.hub, &channel).await;

    state.hub.release(&channel);
    info!(%channel, "Viewer disconnected");
}

/// Forward channel messages until either side goes away
async fn follow(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<WsMessage>,
    hub: &ChannelHub,
    channel: &str,
) {
    let welcome = WelcomeMessage::new(channel.to_string(), hub.current_sequence_id());
    if let Ok(json) = serde_json::to_string(&welcome) {
        if socket.send(Message::Text(json)).await.is_err() {
            return; // Client disconnected immediately
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if socket.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%channel, missed = n, "Viewer lagged");
                        if let Ok(json) = serde_json::to_string(&LaggedMessage::new(n)) {
                            let _ = socket.send(Message::Text(json)).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(msg)) => {
                        if !handle_client_message(msg, &mut socket).await {
                            break;
                        }
                    }
                    Some(Err(_)) | None => break,
                }
            }
        }
    }
}

/// Handle a message from the client
/// Returns false if the connection should be closed
async fn handle_client_message(msg: Message, socket: &mut WebSocket) -> bool {
    match msg {
        Message::Text(text) => {
            if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(&text) {
                if let Ok(json) = serde_json::to_string(&PongMessage::default()) {
                    let _ = socket.send(Message::Text(json)).await;
                }
            }
            true
        }
        Message::Binary(_) => true,
        Message::Ping(data) => {
            let _ = socket.send(Message::Pong(data)).await;
            true
        }
        Message::Pong(_) => true,
        Message::Close(_) => false,
    }
}
