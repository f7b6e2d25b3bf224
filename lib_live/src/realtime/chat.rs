//! # Chat Gate
//!
//! Per-viewer validation and rate limiting. The cooldown spans all rooms of the
//! viewer: posting in one match blocks posting in another for the same window.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::hub::{BroadcastHub, ViewerHandle};
use crate::error::ChatRejection;
use crate::model::ServerMessage;

#[derive(Debug)]
pub struct ChatGate {
    cooldown: Duration,
    max_len: usize,
    last_accepted: Option<Instant>,
}

impl ChatGate {
    pub fn new(cooldown: Duration, max_len: usize) -> Self {
        Self { cooldown, max_len, last_accepted: None }
    }

    /// Checks `text` against the rules at time `now`. Only accepted messages start
    /// a new cooldown window.
    ///
    /// Length is counted in characters, not bytes, and applies to the text as sent.
    pub fn admit(&mut self, text: &str, now: Instant) -> Result<(), ChatRejection> {
        if text.trim().is_empty() || text.chars().count() > self.max_len {
            return Err(ChatRejection::InvalidMessage);
        }
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.cooldown {
                return Err(ChatRejection::RateLimited);
            }
        }
        self.last_accepted = Some(now);
        Ok(())
    }

    /// Validates and, on acceptance, broadcasts `text` to the room of `match_id`.
    pub async fn post(
        &mut self,
        hub: &BroadcastHub,
        viewer: &ViewerHandle,
        match_id: &str,
        text: &str,
    ) -> Result<(), ChatRejection> {
        if let Err(rejection) = self.admit(text, Instant::now()) {
            debug!(user_id = %viewer.user_id(), match_id, reason = rejection.code(), "Chat rejected");
            return Err(rejection);
        }
        let msg = ServerMessage::Chat {
            match_id: match_id.to_string(),
            user_id: viewer.user_id().to_string(),
            message: text.to_string(),
            ts: chrono::Utc::now().timestamp_millis(),
        };
        hub.broadcast(match_id, msg).await;
        Ok(())
    }
}
