//! # Feed Publisher
//!
//! Writes one tick's worth of side effects: the authoritative copy to the durable
//! store and the cache, then the feed messages on the match channel. Each write is
//! awaited under `write_timeout` so a slow backend can delay the next tick of this
//! match but never stack ticks. Failures are logged and swallowed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{trace, warn};

use crate::connections::{BroadcastMedium, DurableStore};
use crate::model::keys::{self, EVENTS_COLLECTION, MATCHES_COLLECTION};
use crate::model::{FeedMessage, Match, MatchEvent};

#[derive(Clone)]
pub struct FeedPublisher {
    medium: Arc<dyn BroadcastMedium>,
    store: Arc<dyn DurableStore>,
    write_timeout: Duration,
}

impl FeedPublisher {
    pub fn new(medium: Arc<dyn BroadcastMedium>, store: Arc<dyn DurableStore>, write_timeout: Duration) -> Self {
        Self { medium, store, write_timeout }
    }

    /// Records `event` (if any) and the snapshot of `state` after the tick.
    ///
    /// Order matters to viewers: the event goes out before the score update that
    /// reflects it.
    pub async fn record_tick(&self, state: &Match, event: Option<&MatchEvent>) {
        if let Some(event) = event {
            self.record_event(state, event).await;
        }
        self.record_snapshot(state).await;
    }

    async fn record_event(&self, state: &Match, event: &MatchEvent) {
        let id = state.id.as_str();

        let Ok(event_json) = serde_json::to_string(event) else {
            return;
        };
        self.best_effort("cache event", self.medium.list_append(&keys::events_key(id), &event_json))
            .await;

        if let Ok(mut record) = serde_json::to_value(event) {
            if let Value::Object(fields) = &mut record {
                fields.insert("match_id".to_string(), Value::String(id.to_string()));
            }
            self.best_effort("store event", self.store.insert(EVENTS_COLLECTION, record)).await;
        }

        let feed = FeedMessage::Event { match_id: id.to_string(), event: *event };
        self.publish(&feed).await;
    }

    async fn record_snapshot(&self, state: &Match) {
        self.record_match(state).await;

        let feed = FeedMessage::ScoreUpdate { match_id: state.id.clone(), update: state.score_update() };
        self.publish(&feed).await;
    }

    /// Stores `state` under `match:{id}` and in the `matches` collection without
    /// telling anybody.
    pub async fn record_match(&self, state: &Match) {
        if let Ok(match_json) = serde_json::to_string(state) {
            self.best_effort("cache match", self.medium.set(&keys::match_key(&state.id), &match_json))
                .await;
        }
        if let Ok(record) = serde_json::to_value(state) {
            self.best_effort("store match", self.store.upsert(MATCHES_COLLECTION, record)).await;
        }
    }

    async fn publish(&self, feed: &FeedMessage) {
        let channel = keys::feed_channel(feed.match_id());
        match serde_json::to_string(feed) {
            Ok(payload) => {
                trace!(channel = %channel, "Publishing feed message");
                self.best_effort("publish", self.medium.publish(&channel, &payload)).await;
            }
            Err(e) => warn!("Failed to encode feed message: {}", e),
        }
    }

    /// Writes the full list snapshot to `matches:list`.
    pub async fn record_board(&self, matches: &[Match]) {
        match serde_json::to_string(matches) {
            Ok(list_json) => {
                self.best_effort("cache match list", self.medium.set(keys::MATCH_LIST_KEY, &list_json))
                    .await
            }
            Err(e) => warn!("Failed to encode match list: {}", e),
        }
    }

    async fn best_effort<E, F>(&self, what: &str, write: F)
    where
        E: std::fmt::Display,
        F: Future<Output = Result<(), E>>,
    {
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{} failed: {}", what, e),
            Err(_) => warn!("{} timed out after {:?}", what, self.write_timeout),
        }
    }
}
