//! Scheduler, medium and hubs wired together with the in-process backends.

use lib_live::model::{EventKind, ServerMessage};
use lib_live::simulator::{SimulationScheduler, SimulationSettings};
use lib_live::{
    BroadcastHub, BroadcastMedium, DurableStore, Match, MatchStatus, MemoryMedium, MemoryStore, ReadPath, ViewerHandle,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn backends() -> (Arc<MemoryMedium>, Arc<MemoryStore>) {
    (Arc::new(MemoryMedium::new()), Arc::new(MemoryStore::new()))
}

fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn statuses(messages: &[ServerMessage]) -> Vec<(u32, MatchStatus)> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            ServerMessage::ScoreUpdate { update, .. } => Some((update.minute, update.status)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn viewer_sees_half_time_come_and_go() {
    let (medium, store) = backends();
    let settings = SimulationSettings { seed: Some(3), ..SimulationSettings::default() };

    let mut state = Match::with_id("derby", "Lions", "Tigers");
    state.minute = 43;
    state.status = MatchStatus::FirstHalf;

    let mut scheduler = SimulationScheduler::idle(settings, medium.clone(), store.clone(), vec![state.clone()]).await;

    let hub = BroadcastHub::new(medium.clone(), Duration::from_secs(5));
    let (viewer, mut rx) = ViewerHandle::new("alice");
    assert!(hub.subscribe(&viewer, "derby").await);

    scheduler.spawn_match(state, StdRng::seed_from_u64(3)).await;
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let received = drain(&mut rx);
    assert_eq!(
        statuses(&received),
        vec![(44, MatchStatus::FirstHalf), (45, MatchStatus::HalfTime), (46, MatchStatus::SecondHalf)]
    );
    // Nothing happens on the pitch during the break.
    for msg in &received {
        if let ServerMessage::Event { event, .. } = msg {
            assert_ne!(event.minute, 45);
        }
    }

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn two_hubs_share_one_feed_but_count_locally() {
    let (medium, store) = backends();
    let settings = SimulationSettings {
        match_count: 1,
        tick: Duration::from_millis(100),
        seed: Some(8),
        ..SimulationSettings::default()
    };
    let scheduler = SimulationScheduler::start(settings, medium.clone(), store.clone()).await;
    let match_id = scheduler.match_ids()[0].clone();

    let north = BroadcastHub::new(medium.clone(), Duration::from_secs(5));
    let south = BroadcastHub::new(medium.clone(), Duration::from_secs(5));
    let (alice, mut alice_rx) = ViewerHandle::new("alice");
    let (bob, mut bob_rx) = ViewerHandle::new("bob");
    north.subscribe(&alice, &match_id).await;
    south.subscribe(&bob, &match_id).await;

    assert_eq!(north.room_count(&match_id).await, 1);
    assert_eq!(south.room_count(&match_id).await, 1);

    tokio::time::sleep(Duration::from_millis(1050)).await;

    let to_alice = statuses(&drain(&mut alice_rx));
    let to_bob = statuses(&drain(&mut bob_rx));
    assert_eq!(to_alice.len(), 10);
    assert_eq!(to_alice, to_bob);

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn finished_matches_are_readable_from_cache_and_store() {
    let (medium, store) = backends();
    let settings = SimulationSettings {
        match_count: 3,
        tick: Duration::from_millis(10),
        seed: Some(99),
        ..SimulationSettings::default()
    };
    let scheduler = SimulationScheduler::start(settings, medium.clone(), store.clone()).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    scheduler.shutdown().await;

    let read = ReadPath::new(medium.clone(), store.clone());
    let listed = read.list_matches().await.unwrap();
    assert_eq!(listed.len(), 3);

    for summary in listed {
        assert_eq!(summary.status, MatchStatus::FullTime);
        let full = read.get_match(&summary.id).await.unwrap();
        assert_eq!(full.events, summary.events);
        let goals = full.events.iter().filter(|e| e.kind == EventKind::Goal).count() as u32;
        assert_eq!(goals, full.score.home + full.score.away);
        assert_eq!(full.stats.shots as usize, full.events.iter().filter(|e| e.kind == EventKind::Shot).count());
    }

    // With the cache wiped the store still answers.
    let cold = ReadPath::new(Arc::new(MemoryMedium::new()), store.clone());
    assert_eq!(cold.list_matches().await.unwrap().len(), 3);

    // Both backends hold the final board.
    assert!(medium.get(lib_live::model::keys::MATCH_LIST_KEY).await.unwrap().is_some());
    assert!(!store.query("matches", &lib_live::connections::Query::all()).await.unwrap().is_empty());
}
