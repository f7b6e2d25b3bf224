//! # Simulation Scheduler
//!
//! Owns every running match. Each match gets its own `RepeatingTask`, so a slow
//! write or a panic in one match never touches another. The scheduler is the
//! only writer of match state; hubs learn about it exclusively through the
//! broadcast medium.

use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::board::{spawn_board_writer, Board, BoardSender};
use super::clock::MatchClock;
use super::generator::{EventGenerator, EventRates};
use super::publisher::FeedPublisher;
use super::task::{RepeatingTask, Tickable};
use super::SimulationSettings;
use crate::connections::{BroadcastMedium, DurableStore};
use crate::model::{Match, MatchEvent, MatchStatus};

/// Team names matches are drawn from.
pub const TEAM_POOL: [&str; 8] = ["Lions", "Tigers", "Bears", "Wolves", "Eagles", "Sharks", "Dragons", "Falcons"];

/// Drives one match: tick the clock, write the outcome, hand the snapshot to the board.
struct MatchRunner {
    clock: MatchClock<StdRng>,
    publisher: FeedPublisher,
    board: BoardSender,
}

impl MatchRunner {
    async fn publish_state(&self, event: Option<&MatchEvent>) {
        let state = self.clock.state();
        self.publisher.record_tick(state, event).await;
        // The writer only goes away after every runner has stopped.
        let _ = self.board.send(state.clone());
    }
}

#[async_trait]
impl Tickable for MatchRunner {
    async fn on_tick(&mut self) -> ControlFlow<()> {
        let Some(outcome) = self.clock.tick() else {
            return ControlFlow::Break(());
        };

        let state = self.clock.state();
        if let Some((from, to)) = outcome.transition {
            info!(
                match_id = %state.id,
                minute = state.minute,
                "{} vs {}: {:?} -> {:?} ({}-{})",
                state.home, state.away, from, to, state.score.home, state.score.away
            );
        }
        if let Some(event) = &outcome.event {
            debug!(match_id = %state.id, minute = event.minute, kind = ?event.kind, team = ?event.team, "Match event");
        }

        self.publish_state(outcome.event.as_ref()).await;

        if self.clock.is_finished() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    async fn on_cancel(&mut self) {
        if self.clock.force_full_time() {
            let state = self.clock.state();
            info!(match_id = %state.id, minute = state.minute, "Match stopped early, forced to full time");
            self.publish_state(None).await;
        }
    }
}

pub struct SimulationScheduler {
    settings: SimulationSettings,
    rates: EventRates,
    duration: u32,
    publisher: FeedPublisher,
    board_tx: BoardSender,
    board_handle: JoinHandle<()>,
    tasks: Vec<(String, RepeatingTask)>,
}

impl SimulationScheduler {
    /// Creates `settings.match_count` fresh matches, seeds `matches:list` and the
    /// per-match keys, and starts ticking.
    pub async fn start(
        settings: SimulationSettings,
        medium: Arc<dyn BroadcastMedium>,
        store: Arc<dyn DurableStore>,
    ) -> Self {
        let mut team_rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_sub(1)),
            None => StdRng::from_os_rng(),
        };
        let matches: Vec<Match> = (0..settings.match_count)
            .map(|_| {
                let (home, away) = draw_teams(&mut team_rng);
                Match::new(home, away)
            })
            .collect();

        let mut scheduler = Self::idle(settings, medium, store, matches.clone()).await;
        for (i, state) in matches.into_iter().enumerate() {
            let rng = match scheduler.settings.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                None => StdRng::from_os_rng(),
            };
            scheduler.spawn_match(state, rng).await;
        }
        info!("Simulation started with {} matches", scheduler.tasks.len());
        scheduler
    }

    /// A scheduler with the board seeded from `initial` but no running matches.
    pub async fn idle(
        settings: SimulationSettings,
        medium: Arc<dyn BroadcastMedium>,
        store: Arc<dyn DurableStore>,
        initial: Vec<Match>,
    ) -> Self {
        let duration = settings.match_duration.max(2);
        let rates = EventRates::for_duration(duration, settings.substitution_after);
        let publisher = FeedPublisher::new(medium, store, settings.write_timeout);

        let board = Board::new(initial);
        publisher.record_board(&board.snapshot()).await;
        let (board_tx, board_handle) = spawn_board_writer(board, publisher.clone());

        Self {
            settings,
            rates,
            duration,
            publisher,
            board_tx,
            board_handle,
            tasks: Vec::new(),
        }
    }

    /// Starts ticking `state` from wherever it stands, drawing events from `rng`.
    pub async fn spawn_match(&mut self, state: Match, rng: StdRng) {
        self.publisher.record_match(&state).await;
        let _ = self.board_tx.send(state.clone());

        let id = state.id.clone();
        if state.status == MatchStatus::NotStarted {
            info!(match_id = %id, "Scheduled {} vs {}", state.home, state.away);
        }
        let clock = MatchClock::new(state, EventGenerator::new(rng, self.rates), self.duration);
        let runner = MatchRunner {
            clock,
            publisher: self.publisher.clone(),
            board: self.board_tx.clone(),
        };
        let task = RepeatingTask::spawn(format!("match-{}", id), self.settings.tick, runner);
        self.tasks.push((id, task));
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn match_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Matches whose task is still ticking.
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|(_, task)| !task.is_finished()).count()
    }

    /// Cancels every match, forcing unfinished ones to full time, then waits for
    /// the tasks and the board writer to drain.
    pub async fn shutdown(self) {
        info!("Stopping simulation ({} matches still running)", self.running());
        for (_, task) in &self.tasks {
            task.cancel();
        }
        for (_, task) in self.tasks {
            task.join().await;
        }

        drop(self.board_tx);
        if let Err(e) = self.board_handle.await {
            error!("Board writer failed: {}", e);
        }
        info!("Simulation stopped");
    }
}

/// Two different names from `TEAM_POOL`.
fn draw_teams<R: Rng>(rng: &mut R) -> (&'static str, &'static str) {
    let home = rng.random_range(0..TEAM_POOL.len());
    let mut away = rng.random_range(0..TEAM_POOL.len() - 1);
    if away >= home {
        away += 1;
    }
    (TEAM_POOL[home], TEAM_POOL[away])
}
