mod broadcast;
mod calls;
mod events;
mod handlers;
mod registry;

use axum::{
    Router, debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use tower_sessions::Session;

use crate::{AppResult, AppState, session};

pub use broadcast::broadcast;
pub use calls::relay;
pub use events::{ClientEvent, FilePayload, ServerEvent};
pub use handlers::{dispatch, handle};
pub use registry::{Channel, Connection, ConnectionId, ConnectionRegistry};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(socket))
}

#[debug_handler]
async fn socket(
    State(state): State<AppState>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(participant_id) = session::participant(&session).await? else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };

    Ok(ws.on_upgrade(move |stream| serve(state, participant_id, stream)))
}

/// Runs one connection until the client goes away.
///
/// Frames are handled one at a time, so a client's events are processed in
/// the order they were sent.
pub async fn serve(state: AppState, participant_id: String, stream: WebSocket) {
    let (connection, mut outbox) = state.registry.connect(participant_id).await;
    let (mut sender, mut receiver) = stream.split();

    let mut forward_task = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!(connection = %connection.id, participant = %connection.participant_id, "socket open");

    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            _ = &mut forward_task => break,
        };

        let Some(Ok(msg)) = msg else {
            break;
        };

        match msg {
            Message::Text(text) => handlers::dispatch(&state, &connection, text.as_str()).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => handlers::dispatch(&state, &connection, text).await,
                Err(_) => tracing::warn!(connection = %connection.id, "dropped non-utf8 frame"),
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    let left = state.registry.disconnect(connection.id).await;
    forward_task.abort();
    tracing::info!(connection = %connection.id, channels = left.len(), "socket closed");
}
