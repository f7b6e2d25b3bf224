//! # Broadcast Medium
//!
//! Fast shared cache plus fan-out. Delivery on channels is at-most-once: a
//! subscriber that is not connected when a message is published never sees it.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::MediumError;

/// Payloads published on one channel, in publish order for a single publisher.
/// Dropping the stream ends the subscription.
pub type Subscription = BoxStream<'static, String>;

#[async_trait]
pub trait BroadcastMedium: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, MediumError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), MediumError>;

    /// Appends to the tail of the list stored at `key`, creating it if needed.
    async fn list_append(&self, key: &str, value: &str) -> Result<(), MediumError>;

    /// Inclusive range with Redis index semantics: negative indices count from
    /// the end, so `(0, -1)` is the whole list.
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, MediumError>;

    async fn publish(&self, channel: &str, message: &str) -> Result<(), MediumError>;

    async fn subscribe(&self, channel: &str) -> Result<Subscription, MediumError>;
}

/// Resolves a Redis-style inclusive `start..=stop` range against a list of `len`
/// items. Returns `None` when the range selects nothing.
pub fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}
