//! # Wire Messages
//!
//! Two boundaries, two schemas:
//!
//! - `FeedMessage` travels from the scheduler to every hub over the broadcast
//!   medium's per-match channel.
//! - `ClientMessage` / `ServerMessage` travel between a hub and one viewer socket as
//!   `{"type": "...", "data": {...}}` frames.

use serde::{Deserialize, Serialize};

use super::match_state::{MatchEvent, ScoreUpdate};

/// Published by the scheduler on `keys::feed_channel(match_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedMessage {
    Event { match_id: String, event: MatchEvent },
    ScoreUpdate { match_id: String, update: ScoreUpdate },
}

impl FeedMessage {
    pub fn match_id(&self) -> &str {
        match self {
            FeedMessage::Event { match_id, .. } | FeedMessage::ScoreUpdate { match_id, .. } => match_id,
        }
    }

    /// What a viewer in the room receives for this feed item.
    pub fn into_server_message(self) -> ServerMessage {
        match self {
            FeedMessage::Event { match_id, event } => ServerMessage::Event { match_id, event },
            FeedMessage::ScoreUpdate { match_id, update } => ServerMessage::ScoreUpdate { match_id, update },
        }
    }
}

/// Frames a viewer sends. Missing targets are `None` so the session can answer
/// with a validation error instead of dropping the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Subscribe {
        #[serde(default)]
        match_id: Option<String>,
    },
    Unsubscribe {
        #[serde(default)]
        match_id: Option<String>,
    },
    Chat {
        #[serde(default)]
        match_id: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Typing {
        #[serde(default)]
        match_id: Option<String>,
        #[serde(default)]
        typing: bool,
    },
    Ping,
}

/// Frames a hub sends to a viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Pong,
    UserJoined {
        match_id: String,
        user_id: String,
    },
    UserLeft {
        match_id: String,
        user_id: String,
    },
    UserCount {
        match_id: String,
        count: usize,
    },
    Event {
        match_id: String,
        #[serde(flatten)]
        event: MatchEvent,
    },
    ScoreUpdate {
        match_id: String,
        #[serde(flatten)]
        update: ScoreUpdate,
    },
    Chat {
        match_id: String,
        user_id: String,
        message: String,
        ts: i64,
    },
    Typing {
        match_id: String,
        user_id: String,
        typing: bool,
    },
    Error {
        error: String,
    },
}

impl ServerMessage {
    pub fn error(error: impl Into<String>) -> Self {
        ServerMessage::Error { error: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, Team};
    use serde_json::json;

    #[test]
    fn client_frames_decode() {
        let sub: ClientMessage =
            serde_json::from_value(json!({"type": "subscribe", "data": {"matchId": "m1"}})).unwrap();
        assert_eq!(sub, ClientMessage::Subscribe { match_id: Some("m1".into()) });

        let ping: ClientMessage = serde_json::from_value(json!({"type": "ping"})).unwrap();
        assert_eq!(ping, ClientMessage::Ping);

        let bare: ClientMessage = serde_json::from_value(json!({"type": "subscribe", "data": {}})).unwrap();
        assert_eq!(bare, ClientMessage::Subscribe { match_id: None });

        let typing: ClientMessage =
            serde_json::from_value(json!({"type": "typing", "data": {"matchId": "m1"}})).unwrap();
        assert_eq!(typing, ClientMessage::Typing { match_id: Some("m1".into()), typing: false });
    }

    #[test]
    fn event_frame_flattens_the_event() {
        let msg = ServerMessage::Event {
            match_id: "m1".into(),
            event: MatchEvent { kind: EventKind::Goal, team: Team::Home, minute: 33 },
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "event", "data": {"matchId": "m1", "type": "goal", "team": "home", "minute": 33}})
        );
    }

    #[test]
    fn presence_frames_use_camel_case() {
        let msg = ServerMessage::UserLeft { match_id: "m1".into(), user_id: "alice".into() };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "user_left", "data": {"matchId": "m1", "userId": "alice"}})
        );
    }

    #[test]
    fn feed_message_is_tagged_by_kind() {
        let feed = FeedMessage::Event {
            match_id: "m9".into(),
            event: MatchEvent { kind: EventKind::Foul, team: Team::Away, minute: 3 },
        };
        let text = serde_json::to_string(&feed).unwrap();
        assert!(text.contains("\"kind\":\"event\""));
        let back: FeedMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back.match_id(), "m9");
    }
}
