//! # In-Process Backends
//!
//! `MemoryMedium` and `MemoryStore` satisfy the collaborator contracts inside one
//! process. They back single-node runs without Redis/PostgreSQL and every test in
//! the workspace.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

use super::medium::{resolve_range, BroadcastMedium, Subscription};
use super::store::{DurableStore, Query, Record};
use crate::error::{MediumError, StoreError};

/// Buffer per channel. A subscriber lagging further behind loses the oldest messages.
const CHANNEL_CAPACITY: usize = 1024;

/// Locked from `Drop`, hence a blocking mutex. Never held across an await.
type Channels = Arc<StdMutex<HashMap<String, broadcast::Sender<String>>>>;

#[derive(Default)]
pub struct MemoryMedium {
    values: Mutex<HashMap<String, String>>,
    lists: Mutex<HashMap<String, Vec<String>>>,
    channels: Channels,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channels with at least one live subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.lock().map_or(0, |channels| channels.len())
    }
}

/// The receiving end of one subscription. Fields drop in order, so the receiver
/// is gone before the lease checks whether anybody is still listening.
struct Tap {
    receiver: broadcast::Receiver<String>,
    _lease: ChannelLease,
}

/// Removes the channel once its last subscriber has dropped.
struct ChannelLease {
    channels: Channels,
    channel: String,
}

impl Drop for ChannelLease {
    fn drop(&mut self) {
        let Ok(mut channels) = self.channels.lock() else {
            return;
        };
        if channels.get(&self.channel).is_some_and(|sender| sender.receiver_count() == 0) {
            channels.remove(&self.channel);
        }
    }
}

#[async_trait]
impl BroadcastMedium for MemoryMedium {
    async fn get(&self, key: &str) -> Result<Option<String>, MediumError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        self.values.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list_append(&self, key: &str, value: &str) -> Result<(), MediumError> {
        self.lists
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, MediumError> {
        let lists = self.lists.lock().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match resolve_range(list.len(), start, stop) {
            Some((from, to)) => list[from..=to].to_vec(),
            None => Vec::new(),
        })
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), MediumError> {
        let channels = self
            .channels
            .lock()
            .map_err(|_| MediumError::CommandError("channel table poisoned".into()))?;
        if let Some(sender) = channels.get(channel) {
            // No live receivers is not an error for at-most-once delivery.
            let _ = sender.send(message.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, MediumError> {
        let receiver = self
            .channels
            .lock()
            .map_err(|_| MediumError::CommandError("channel table poisoned".into()))?
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        let tap = Tap {
            receiver,
            _lease: ChannelLease { channels: self.channels.clone(), channel: channel.to_string() },
        };
        let channel = channel.to_string();

        let stream = futures_util::stream::unfold(tap, move |mut tap| {
            let channel = channel.clone();
            async move {
                loop {
                    match tap.receiver.recv().await {
                        Ok(message) => return Some((message, tap)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(%channel, skipped, "Subscriber lagged behind, messages dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn upsert(&self, collection: &str, record: Record) -> Result<(), StoreError> {
        let id = record.get("id").cloned().ok_or(StoreError::InvalidRecord)?;
        let mut collections = self.collections.lock().await;
        let records = collections.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|existing| existing.get("id") == Some(&id)) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, record: Record) -> Result<(), StoreError> {
        if !record.is_object() {
            return Err(StoreError::InvalidRecord);
        }
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.lock().await;
        let mut found: Vec<Record> = collections
            .get(collection)
            .map(|records| records.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some((field, ascending)) = &query.order_by {
            found.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                if *ascending { ordering } else { ordering.reverse() }
            });
        }
        Ok(found)
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
