//! Cache keys and channel names. Every process derives them from here so a hub
//! on one machine finds what a scheduler on another wrote.

/// Full list snapshot of all matches, refreshed after every tick.
pub const MATCH_LIST_KEY: &str = "matches:list";

/// Durable store collection holding match records.
pub const MATCHES_COLLECTION: &str = "matches";

/// Durable store collection holding event records (each carries `match_id`).
pub const EVENTS_COLLECTION: &str = "events";

/// Single-match snapshot.
pub fn match_key(match_id: &str) -> String {
    format!("match:{}", match_id)
}

/// Append-only list of the match's events, oldest first.
pub fn events_key(match_id: &str) -> String {
    format!("match:{}:events", match_id)
}

/// Publish/subscribe channel carrying `FeedMessage`s for one match.
pub fn feed_channel(match_id: &str) -> String {
    format!("match:{}:feed", match_id)
}
