//! # Simulator
//!
//! - **`generator`**: per-minute event draw (`EventGenerator`, `EventRates`).
//! - **`clock`**: the per-match state machine (`MatchClock`).
//! - **`task`**: cancellable periodic job (`RepeatingTask`, `Tickable`).
//! - **`publisher`** / **`board`**: side effects of a tick on the cache, the store
//!   and the feed channel.
//! - **`scheduler`**: `SimulationScheduler`, one task per match.

pub mod board;
pub mod clock;
pub mod generator;
pub mod publisher;
pub mod scheduler;
pub mod task;

use std::time::Duration;

/// Shortest tick a match runs on. A zero period would stall the timer.
pub const MIN_TICK: Duration = Duration::from_millis(1);

pub use clock::{MatchClock, TickOutcome};
pub use generator::{EventGenerator, EventRates};
pub use publisher::FeedPublisher;
pub use scheduler::{SimulationScheduler, TEAM_POOL};
pub use task::{RepeatingTask, Tickable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSettings {
    pub match_count: usize,
    /// Simulated minutes per match. Half time falls on `match_duration / 2`.
    pub match_duration: u32,
    /// Wall-clock length of one simulated minute.
    pub tick: Duration,
    pub substitution_after: u32,
    /// Upper bound for each cache/store/publish call made during a tick.
    pub write_timeout: Duration,
    /// Match `i` draws from `seed + i`; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            match_count: 4,
            match_duration: 90,
            tick: Duration::from_millis(1000),
            substitution_after: 60,
            write_timeout: Duration::from_millis(2000),
            seed: None,
        }
    }
}
