//! # Typing Tracker
//!
//! At most one pending auto-clear per viewer. The pending timer is held through a
//! `DropGuard`, so replacing it, clearing it or dropping the tracker cancels the
//! old timer before it can fire.

use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

use super::hub::{BroadcastHub, ViewerHandle};
use crate::model::ServerMessage;

#[derive(Debug)]
pub struct TypingTracker {
    timeout: Duration,
    pending: Option<DropGuard>,
}

impl TypingTracker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, pending: None }
    }

    /// Broadcasts the flag right away. `true` (re)arms the auto-clear, `false`
    /// disarms it.
    pub async fn set_typing(&mut self, hub: &BroadcastHub, viewer: &ViewerHandle, match_id: &str, typing: bool) {
        self.cancel();
        hub.broadcast(match_id, typing_message(viewer, match_id, typing)).await;

        if typing {
            let token = CancellationToken::new();
            let cancelled = token.clone();
            let hub = hub.clone();
            let clear = typing_message(viewer, match_id, false);
            let match_id = match_id.to_string();
            let timeout = self.timeout;

            tokio::spawn(async move {
                tokio::select! {
                    _ = cancelled.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        hub.broadcast(&match_id, clear).await;
                    }
                }
            });
            self.pending = Some(token.drop_guard());
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops any pending auto-clear without broadcasting.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

fn typing_message(viewer: &ViewerHandle, match_id: &str, typing: bool) -> ServerMessage {
    ServerMessage::Typing {
        match_id: match_id.to_string(),
        user_id: viewer.user_id().to_string(),
        typing,
    }
}
