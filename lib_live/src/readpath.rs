//! # Read Path
//!
//! Lookups behind the HTTP read API. The cache answers first; the durable store is
//! the fallback when the cache misses or is unreachable. Nothing here writes.

use std::sync::Arc;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::connections::{BroadcastMedium, DurableStore, Query, Record};
use crate::error::ReadError;
use crate::model::keys::{self, EVENTS_COLLECTION, MATCHES_COLLECTION, MATCH_LIST_KEY};
use crate::model::{FeedMessage, Match, MatchEvent};

#[derive(Clone)]
pub struct ReadPath {
    medium: Arc<dyn BroadcastMedium>,
    store: Arc<dyn DurableStore>,
}

impl ReadPath {
    pub fn new(medium: Arc<dyn BroadcastMedium>, store: Arc<dyn DurableStore>) -> Self {
        Self { medium, store }
    }

    /// All matches, as last written to `matches:list`.
    pub async fn list_matches(&self) -> Result<Vec<Match>, ReadError> {
        if let Some(json) = self.cached(MATCH_LIST_KEY).await {
            return Ok(serde_json::from_str(&json)?);
        }
        let records = self.store.query(MATCHES_COLLECTION, &Query::all()).await?;
        decode_all(records)
    }

    /// One match with its full event list.
    pub async fn get_match(&self, match_id: &str) -> Result<Match, ReadError> {
        let mut found: Match = match self.cached(&keys::match_key(match_id)).await {
            Some(json) => serde_json::from_str(&json)?,
            None => {
                let query = Query::all().eq("id", match_id);
                let record = self.store.query(MATCHES_COLLECTION, &query).await?.into_iter().next();
                match record {
                    Some(record) => serde_json::from_value(record)?,
                    None => return Err(ReadError::NotFound),
                }
            }
        };
        found.events = self.events(match_id).await;
        Ok(found)
    }

    /// Events of the match, oldest first. Falls back to the store when the cache
    /// has none; a failing store yields an empty list.
    pub async fn events(&self, match_id: &str) -> Vec<MatchEvent> {
        match self.medium.list_range(&keys::events_key(match_id), 0, -1).await {
            Ok(items) if !items.is_empty() => {
                return items
                    .iter()
                    .filter_map(|item| serde_json::from_str(item).ok())
                    .collect();
            }
            Ok(_) => {}
            Err(e) => warn!(match_id, "Event cache unavailable, reading from store: {}", e),
        }

        let query = Query::all().eq("match_id", match_id).order_by("minute", true);
        match self.store.query(EVENTS_COLLECTION, &query).await {
            Ok(records) => records
                .into_iter()
                .filter_map(|record| serde_json::from_value(record).ok())
                .collect(),
            Err(e) => {
                warn!(match_id, "Failed to read events from store: {}", e);
                Vec::new()
            }
        }
    }

    /// Events of the match as they are published from now on. Ends when the
    /// medium drops the subscription; dropping the stream unsubscribes.
    pub async fn event_stream(&self, match_id: &str) -> Result<BoxStream<'static, MatchEvent>, ReadError> {
        let feed = self.medium.subscribe(&keys::feed_channel(match_id)).await?;
        let events = feed.filter_map(|payload| async move {
            match serde_json::from_str::<FeedMessage>(&payload) {
                Ok(FeedMessage::Event { event, .. }) => Some(event),
                _ => None,
            }
        });
        Ok(events.boxed())
    }

    /// Cache value for `key`, or `None` on a miss or a cache failure.
    async fn cached(&self, key: &str) -> Option<String> {
        match self.medium.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "Cache read failed, falling back to store: {}", e);
                None
            }
        }
    }
}

fn decode_all<T: DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, ReadError> {
    records
        .into_iter()
        .map(|record| serde_json::from_value(record).map_err(ReadError::from))
        .collect()
}
