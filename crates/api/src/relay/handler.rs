use std::sync::Arc;

use axum::extract::ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use nvoi_core::types::DbId;

use crate::middleware::auth::AuthUser;
use crate::relay::hub::RelayHub;
use crate::state::AppState;

/// GET /app/jobs/ws
///
/// Authenticates from the session cookie (401 without one), requires an
/// upgrade request (426 otherwise), then attaches the socket to the user's
/// relay actor.
pub async fn jobs_ws_handler(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(ws) => {
            let hub = Arc::clone(&state.relay_hub);
            ws.on_upgrade(move |socket| handle_socket(socket, hub, user.id))
        }
        Err(_) => (StatusCode::UPGRADE_REQUIRED, "Expected websocket").into_response(),
    }
}

/// Pump one upgraded socket until either side closes.
///
/// Outbound frames come from the user's actor; a Close frame from it (hub
/// shutdown) is forwarded and ends the loop. Inbound traffic is ignored
/// apart from Close, since clients only listen.
async fn handle_socket(socket: WebSocket, hub: Arc<RelayHub>, user_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut outbound = hub.attach(user_id, conn_id.clone()).await;
    let (mut sink, mut inbound) = socket.split();
    tracing::info!(%conn_id, %user_id, "Job socket connected");

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                let closing = matches!(frame, Message::Close(_));
                if let Err(e) = sink.send(frame).await {
                    tracing::debug!(%conn_id, error = %e, "Job socket send failed");
                    break;
                }
                if closing {
                    break;
                }
            }
            incoming = inbound.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "Job socket receive failed");
                    break;
                }
            },
        }
    }

    hub.detach(user_id, &conn_id).await;
    tracing::info!(%conn_id, %user_id, "Job socket disconnected");
}
