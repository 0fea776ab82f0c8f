use axum::{
    extract::{
        Path, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;

use crate::{AppState, signals::AgentConnection};

/// WebSocket endpoint an agent keeps open to receive its signals.
#[tracing::instrument(name = "agents.connect", skip(ws, state))]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, host_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, host_id: String) {
    let (sender, receiver) = socket.split();
    AgentConnection::new(host_id, state.signals.clone(), sender, &state.config.signals)
        .run(receiver)
        .await;
}
