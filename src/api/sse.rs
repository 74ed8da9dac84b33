//! Server-sent events feed for a single match

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};

use super::rest::ApiResult;
use super::http::AppState;
use super::websocket::events::{LaggedMessage, WelcomeMessage, WsMessage};
use crate::scoring::match_channel;

/// GET /api/matches/:id/stream - Live feed of `match:<id>`
pub async fn match_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    state.service.get_match(&id)?;

    let channel = match_channel(&id);
    let rx = state.hub.subscribe(&channel);
    let welcome = WelcomeMessage::new(channel, state.hub.current_sequence_id());

    let welcome = tokio_stream::once(Ok::<_, Infallible>(json_event("welcome", &welcome)));
    let updates = BroadcastStream::new(rx).map(|item| {
        Ok::<_, Infallible>(match item {
            Ok(msg) => message_event(&msg),
            Err(BroadcastStreamRecvError::Lagged(n)) => json_event("error", &LaggedMessage::new(n)),
        })
    });

    Ok(Sse::new(welcome.chain(updates)).keep_alive(KeepAlive::default().interval(Duration::from_secs(30))))
}

fn message_event(msg: &WsMessage) -> Event {
    json_event(&msg.event, msg).id(msg.sequence_id.to_string())
}

fn json_event<T: serde::Serialize>(name: &str, body: &T) -> Event {
    Event::default()
        .event(name)
        .data(serde_json::to_string(body).unwrap_or_default())
}
