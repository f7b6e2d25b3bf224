//! # Viewer Session
//!
//! Everything one connection owns: its hub handle, the rooms it joined, its chat
//! gate and typing tracker. The socket loop feeds decoded frames into `handle`
//! and must call `close` when the connection ends so the rooms hear about it.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info};

use super::chat::ChatGate;
use super::hub::{BroadcastHub, ViewerHandle};
use super::typing::TypingTracker;
use crate::model::{ClientMessage, ServerMessage};

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub chat_cooldown: Duration,
    pub chat_max_len: usize,
    pub typing_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            chat_cooldown: Duration::from_millis(1000),
            chat_max_len: 300,
            typing_timeout: Duration::from_millis(4000),
        }
    }
}

pub struct ViewerSession {
    viewer: ViewerHandle,
    hub: BroadcastHub,
    rooms: HashSet<String>,
    chat: ChatGate,
    typing: TypingTracker,
}

impl ViewerSession {
    pub fn new(viewer: ViewerHandle, hub: BroadcastHub, limits: SessionLimits) -> Self {
        info!(user_id = %viewer.user_id(), conn_id = viewer.conn_id(), "Viewer connected");
        Self {
            viewer,
            hub,
            rooms: HashSet::new(),
            chat: ChatGate::new(limits.chat_cooldown, limits.chat_max_len),
            typing: TypingTracker::new(limits.typing_timeout),
        }
    }

    pub fn viewer(&self) -> &ViewerHandle {
        &self.viewer
    }

    pub fn rooms(&self) -> &HashSet<String> {
        &self.rooms
    }

    /// Queues an error frame for this viewer only.
    pub fn reject(&self, error: impl Into<String>) {
        self.viewer.send(ServerMessage::error(error));
    }

    pub async fn handle(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::Ping => {
                self.viewer.send(ServerMessage::Pong);
            }
            ClientMessage::Subscribe { match_id: None } => self.reject("matchId required"),
            ClientMessage::Subscribe { match_id: Some(match_id) } => {
                self.hub.subscribe(&self.viewer, &match_id).await;
                self.rooms.insert(match_id);
            }
            ClientMessage::Unsubscribe { match_id: Some(match_id) } => {
                self.hub.unsubscribe(&self.viewer, &match_id).await;
                self.rooms.remove(&match_id);
            }
            ClientMessage::Chat { match_id: Some(match_id), message } => {
                let text = message.unwrap_or_default();
                if let Err(rejection) = self.chat.post(&self.hub, &self.viewer, &match_id, &text).await {
                    self.reject(rejection.to_string());
                }
            }
            ClientMessage::Typing { match_id: Some(match_id), typing } => {
                self.typing.set_typing(&self.hub, &self.viewer, &match_id, typing).await;
            }
            ClientMessage::Unsubscribe { match_id: None }
            | ClientMessage::Chat { match_id: None, .. }
            | ClientMessage::Typing { match_id: None, .. } => {
                debug!(user_id = %self.viewer.user_id(), "Ignoring frame without matchId");
            }
        }
    }

    /// Cancels the typing timer, then leaves every joined room.
    pub async fn close(mut self) {
        self.typing.cancel();
        for match_id in self.rooms.drain() {
            self.hub.unsubscribe(&self.viewer, &match_id).await;
        }
        info!(user_id = %self.viewer.user_id(), conn_id = self.viewer.conn_id(), "Viewer disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::MemoryMedium;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn hub() -> BroadcastHub {
        BroadcastHub::new(Arc::new(MemoryMedium::new()), Duration::from_secs(5))
    }

    fn session(hub: &BroadcastHub, user: &str) -> (ViewerSession, UnboundedReceiver<ServerMessage>) {
        let (viewer, rx) = ViewerHandle::new(user);
        (ViewerSession::new(viewer, hub.clone(), SessionLimits::default()), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn subscribe(match_id: &str) -> ClientMessage {
        ClientMessage::Subscribe { match_id: Some(match_id.into()) }
    }

    #[tokio::test]
    async fn ping_pongs() {
        let hub = hub();
        let (mut alice, mut rx) = session(&hub, "alice");
        alice.handle(ClientMessage::Ping).await;
        assert_eq!(drain(&mut rx), vec![ServerMessage::Pong]);
    }

    #[tokio::test]
    async fn subscribe_needs_a_match_id() {
        let hub = hub();
        let (mut alice, mut rx) = session(&hub, "alice");
        alice.handle(ClientMessage::Subscribe { match_id: None }).await;
        assert_eq!(drain(&mut rx), vec![ServerMessage::error("matchId required")]);
        assert!(alice.rooms().is_empty());
    }

    #[tokio::test]
    async fn disconnect_tells_every_room() {
        let hub = hub();
        let (mut alice, _alice_rx) = session(&hub, "alice");
        let (mut bob, mut bob_rx) = session(&hub, "bob");

        alice.handle(subscribe("m1")).await;
        bob.handle(subscribe("m1")).await;
        assert_eq!(hub.room_count("m1").await, 2);
        drain(&mut bob_rx);

        alice.close().await;
        assert_eq!(hub.room_count("m1").await, 1);
        assert_eq!(
            drain(&mut bob_rx),
            vec![
                ServerMessage::UserLeft { match_id: "m1".into(), user_id: "alice".into() },
                ServerMessage::UserCount { match_id: "m1".into(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn rejected_chat_goes_to_the_author_only() {
        let hub = hub();
        let (mut alice, mut alice_rx) = session(&hub, "alice");
        let (mut bob, mut bob_rx) = session(&hub, "bob");
        alice.handle(subscribe("m1")).await;
        bob.handle(subscribe("m1")).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        let chat = |text: &str| ClientMessage::Chat { match_id: Some("m1".into()), message: Some(text.into()) };
        alice.handle(chat("hello")).await;
        alice.handle(chat("hello again")).await;
        alice.handle(ClientMessage::Chat { match_id: Some("m1".into()), message: None }).await;

        let to_alice = drain(&mut alice_rx);
        assert!(matches!(&to_alice[0], ServerMessage::Chat { message, .. } if message == "hello"));
        assert_eq!(to_alice[1], ServerMessage::error("Rate limit exceeded"));
        assert_eq!(to_alice[2], ServerMessage::error("Invalid message"));

        let to_bob = drain(&mut bob_rx);
        assert_eq!(to_bob.len(), 1);
        assert!(matches!(&to_bob[0], ServerMessage::Chat { user_id, .. } if user_id == "alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_cancels_the_typing_timer() {
        let hub = hub();
        let (mut alice, _alice_rx) = session(&hub, "alice");
        let (mut bob, mut bob_rx) = session(&hub, "bob");
        alice.handle(subscribe("m1")).await;
        bob.handle(subscribe("m1")).await;

        alice.handle(ClientMessage::Typing { match_id: Some("m1".into()), typing: true }).await;
        alice.close().await;
        drain(&mut bob_rx);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut bob_rx).is_empty());
    }
}
