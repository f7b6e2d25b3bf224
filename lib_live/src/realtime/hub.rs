//! # Broadcast Hub
//!
//! Maps locally connected viewers to match rooms. The first member of a room opens
//! a relay: a subscription to the match's feed channel whose messages are
//! re-emitted to everybody in the room. The last member leaving closes it.
//!
//! Presence counts are local to this hub instance. Behind a load balancer every
//! instance reports only its own viewers; the simulator feed is still complete on
//! all of them because each relay subscribes to the shared medium.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::connections::BroadcastMedium;
use crate::model::{keys, FeedMessage, ServerMessage};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One connected viewer as the hub sees it: an identity plus the outbound queue
/// drained by the connection's socket loop.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    conn_id: u64,
    user_id: String,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ViewerHandle {
    pub fn new(user_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            conn_id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            user_id: user_id.into(),
            tx,
        };
        (handle, rx)
    }

    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Queues `msg` for this viewer. False once the connection is gone.
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

struct Room {
    members: HashMap<u64, ViewerHandle>,
    /// Cancels the relay task when the room is dropped.
    _relay: DropGuard,
}

impl Room {
    fn deliver(&self, msg: &ServerMessage) -> usize {
        self.members.values().filter(|viewer| viewer.send(msg.clone())).count()
    }
}

struct HubInner {
    medium: Arc<dyn BroadcastMedium>,
    rooms: Mutex<HashMap<String, Room>>,
    retry_delay: Duration,
}

impl HubInner {
    async fn deliver(&self, match_id: &str, msg: &ServerMessage) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.get(match_id).map_or(0, |room| room.deliver(msg))
    }
}

#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// `retry_delay` is how long a relay waits before resubscribing after its feed
    /// subscription failed or ended.
    pub fn new(medium: Arc<dyn BroadcastMedium>, retry_delay: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                medium,
                rooms: Mutex::new(HashMap::new()),
                retry_delay,
            }),
        }
    }

    /// Adds `viewer` to the room of `match_id` and announces it to the room.
    /// Joining a room twice changes nothing and returns false.
    pub async fn subscribe(&self, viewer: &ViewerHandle, match_id: &str) -> bool {
        let mut rooms = self.inner.rooms.lock().await;
        let room = rooms.entry(match_id.to_string()).or_insert_with(|| {
            info!(match_id, "Opening room");
            Room {
                members: HashMap::new(),
                _relay: self.open_relay(match_id),
            }
        });
        if room.members.contains_key(&viewer.conn_id) {
            return false;
        }
        room.members.insert(viewer.conn_id, viewer.clone());

        let count = room.members.len();
        room.deliver(&ServerMessage::UserJoined {
            match_id: match_id.to_string(),
            user_id: viewer.user_id.clone(),
        });
        room.deliver(&ServerMessage::UserCount { match_id: match_id.to_string(), count });
        debug!(match_id, user_id = %viewer.user_id, count, "Viewer joined");
        true
    }

    /// Removes `viewer` from the room and announces it to whoever is left.
    /// Returns false if the viewer was not in the room.
    pub async fn unsubscribe(&self, viewer: &ViewerHandle, match_id: &str) -> bool {
        let mut rooms = self.inner.rooms.lock().await;
        let Some(room) = rooms.get_mut(match_id) else {
            return false;
        };
        if room.members.remove(&viewer.conn_id).is_none() {
            return false;
        }

        let count = room.members.len();
        if count == 0 {
            rooms.remove(match_id);
            info!(match_id, "Closing room");
        } else {
            room.deliver(&ServerMessage::UserLeft {
                match_id: match_id.to_string(),
                user_id: viewer.user_id.clone(),
            });
            room.deliver(&ServerMessage::UserCount { match_id: match_id.to_string(), count });
        }
        debug!(match_id, user_id = %viewer.user_id, count, "Viewer left");
        true
    }

    /// Sends `msg` to every local member of the room. Returns how many got it.
    pub async fn broadcast(&self, match_id: &str, msg: ServerMessage) -> usize {
        self.inner.deliver(match_id, &msg).await
    }

    /// Local members of the room.
    pub async fn room_count(&self, match_id: &str) -> usize {
        let rooms = self.inner.rooms.lock().await;
        rooms.get(match_id).map_or(0, |room| room.members.len())
    }

    pub async fn open_rooms(&self) -> usize {
        self.inner.rooms.lock().await.len()
    }

    fn open_relay(&self, match_id: &str) -> DropGuard {
        let token = CancellationToken::new();
        tokio::spawn(run_relay(
            Arc::downgrade(&self.inner),
            self.inner.medium.clone(),
            match_id.to_string(),
            token.clone(),
            self.inner.retry_delay,
        ));
        token.drop_guard()
    }
}

/// Forwards the feed channel of one match into its room until `token` is cancelled.
async fn run_relay(
    hub: Weak<HubInner>,
    medium: Arc<dyn BroadcastMedium>,
    match_id: String,
    token: CancellationToken,
    retry_delay: Duration,
) {
    let channel = keys::feed_channel(&match_id);

    loop {
        let subscription = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            subscription = medium.subscribe(&channel) => subscription,
        };

        match subscription {
            Ok(mut feed) => {
                debug!(%channel, "Relay subscribed");
                loop {
                    let payload = tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        payload = feed.next() => payload,
                    };
                    let Some(payload) = payload else {
                        warn!(%channel, "Feed subscription ended");
                        break;
                    };
                    let Some(hub) = hub.upgrade() else {
                        return;
                    };
                    match serde_json::from_str::<FeedMessage>(&payload) {
                        Ok(feed_msg) => {
                            hub.deliver(&match_id, &feed_msg.into_server_message()).await;
                        }
                        Err(e) => warn!(%channel, "Dropping undecodable feed message: {}", e),
                    }
                }
            }
            Err(e) => warn!(%channel, "Relay failed to subscribe: {}", e),
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::MemoryMedium;
    use crate::model::{EventKind, MatchEvent, Team};

    fn hub() -> (BroadcastHub, Arc<MemoryMedium>) {
        let medium = Arc::new(MemoryMedium::new());
        (BroadcastHub::new(medium.clone(), Duration::from_millis(50)), medium)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn presence_counts_follow_joins_and_leaves() {
        let (hub, _) = hub();
        let (alice, mut alice_rx) = ViewerHandle::new("alice");
        let (bob, mut bob_rx) = ViewerHandle::new("bob");

        assert!(hub.subscribe(&alice, "m1").await);
        assert_eq!(
            drain(&mut alice_rx),
            vec![
                ServerMessage::UserJoined { match_id: "m1".into(), user_id: "alice".into() },
                ServerMessage::UserCount { match_id: "m1".into(), count: 1 },
            ]
        );

        assert!(hub.subscribe(&bob, "m1").await);
        assert_eq!(hub.room_count("m1").await, 2);
        assert_eq!(drain(&mut alice_rx).last(), Some(&ServerMessage::UserCount { match_id: "m1".into(), count: 2 }));
        drain(&mut bob_rx);

        assert!(hub.unsubscribe(&alice, "m1").await);
        assert_eq!(
            drain(&mut bob_rx),
            vec![
                ServerMessage::UserLeft { match_id: "m1".into(), user_id: "alice".into() },
                ServerMessage::UserCount { match_id: "m1".into(), count: 1 },
            ]
        );
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn rejoining_is_a_no_op() {
        let (hub, _) = hub();
        let (alice, mut rx) = ViewerHandle::new("alice");
        assert!(hub.subscribe(&alice, "m1").await);
        drain(&mut rx);
        assert!(!hub.subscribe(&alice, "m1").await);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(hub.room_count("m1").await, 1);
        assert!(!hub.unsubscribe(&alice, "never-joined").await);
    }

    #[tokio::test]
    async fn same_user_on_two_connections_counts_twice() {
        let (hub, _) = hub();
        let (tab1, _rx1) = ViewerHandle::new("alice");
        let (tab2, _rx2) = ViewerHandle::new("alice");
        hub.subscribe(&tab1, "m1").await;
        hub.subscribe(&tab2, "m1").await;
        assert_eq!(hub.room_count("m1").await, 2);
    }

    #[tokio::test]
    async fn last_member_closes_the_room() {
        let (hub, _) = hub();
        let (alice, _rx) = ViewerHandle::new("alice");
        hub.subscribe(&alice, "m1").await;
        hub.subscribe(&alice, "m2").await;
        assert_eq!(hub.open_rooms().await, 2);
        hub.unsubscribe(&alice, "m1").await;
        assert_eq!(hub.open_rooms().await, 1);
        assert_eq!(hub.room_count("m1").await, 0);
    }

    #[tokio::test]
    async fn closed_rooms_release_their_feed_channels() {
        let (hub, medium) = hub();
        let (alice, _rx) = ViewerHandle::new("alice");
        for n in 0..200 {
            let match_id = format!("bogus-{}", n);
            hub.subscribe(&alice, &match_id).await;
            // Give the relay a chance to subscribe before the room closes.
            if n % 20 == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            hub.unsubscribe(&alice, &match_id).await;
        }
        assert_eq!(hub.open_rooms().await, 0);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while medium.channel_count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(medium.channel_count(), 0);
    }

    #[tokio::test]
    async fn relay_forwards_the_feed_to_the_room() {
        let (hub, medium) = hub();
        let (alice, mut rx) = ViewerHandle::new("alice");
        hub.subscribe(&alice, "m1").await;
        drain(&mut rx);

        // Let the relay task reach its subscription.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let event = MatchEvent { kind: EventKind::Goal, team: Team::Away, minute: 77 };
        let feed = FeedMessage::Event { match_id: "m1".into(), event };
        medium
            .publish(&keys::feed_channel("m1"), &serde_json::to_string(&feed).unwrap())
            .await
            .unwrap();
        medium.publish(&keys::feed_channel("m1"), "not json").await.unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(msg, Some(ServerMessage::Event { match_id: "m1".into(), event }));
    }
}
