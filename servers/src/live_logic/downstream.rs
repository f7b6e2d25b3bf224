use crate::live_logic::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use lib_live::model::ClientMessage;
use lib_live::{ViewerHandle, ViewerSession};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub user_id: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let user_id = params
        .user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Decodes a text frame. Anything that is not a known message is `None`.
pub fn decode_frame(text: &str) -> Option<ClientMessage> {
    serde_json::from_str(text).ok()
}

async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: String) {
    let (viewer, mut outbox) = ViewerHandle::new(user_id);
    let mut session = ViewerSession::new(viewer, state.hub.clone(), state.limits);

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            // Frames from the viewer
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match decode_frame(text.as_str()) {
                        Some(msg) => session.handle(msg).await,
                        None => {
                            debug!(user_id = %session.viewer().user_id(), "Undecodable frame");
                            session.reject("Invalid payload");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
            // Frames queued for the viewer by its session and the hub
            outgoing = outbox.recv() => {
                let Some(msg) = outgoing else { break };
                match serde_json::to_string(&msg) {
                    Ok(json_str) => {
                        if socket.send(Message::Text(json_str.into())).await.is_err() {
                            break; // client disconnected
                        }
                    }
                    Err(e) => warn!("Failed to encode outgoing frame: {}", e),
                }
            }
        }
    }

    session.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_decode_or_are_rejected() {
        assert_eq!(decode_frame(r#"{"type":"ping"}"#), Some(ClientMessage::Ping));
        assert_eq!(
            decode_frame(r#"{"type":"chat","data":{"matchId":"m1","message":"hi"}}"#),
            Some(ClientMessage::Chat { match_id: Some("m1".into()), message: Some("hi".into()) })
        );
        assert_eq!(decode_frame("not json"), None);
        assert_eq!(decode_frame(r#"{"type":"shout"}"#), None);
    }
}
