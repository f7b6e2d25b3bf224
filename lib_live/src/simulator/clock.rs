//! # Match Clock
//!
//! One tick is one simulated minute. Status boundaries are exact equality checks
//! on the new minute, applied in kick-off order, so the clock must be advanced one
//! minute at a time: a skipped minute would skip its transition forever.

use rand::Rng;

use super::generator::EventGenerator;
use crate::model::{Match, MatchEvent, MatchStatus};

/// What one tick changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub event: Option<MatchEvent>,
    /// `(from, to)` when the status moved on this tick.
    pub transition: Option<(MatchStatus, MatchStatus)>,
}

pub struct MatchClock<R> {
    state: Match,
    generator: EventGenerator<R>,
    duration: u32,
}

impl<R: Rng> MatchClock<R> {
    /// Resumes `state` as is; a fresh match starts at minute 0 / `NotStarted`.
    pub fn new(state: Match, generator: EventGenerator<R>, duration: u32) -> Self {
        Self { state, generator, duration }
    }

    pub fn state(&self) -> &Match {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.status.is_terminal()
    }

    /// Advances one minute. Returns `None`, changing nothing, once the match is over.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.is_finished() {
            return None;
        }
        let before = self.state.status;

        self.state.minute += 1;
        self.apply_boundaries();

        let event = self.generator.generate(&mut self.state);
        if let Some(event) = event {
            self.state.events.push(event);
            self.state.stats.record(event.kind);
        }

        let after = self.state.status;
        Some(TickOutcome {
            event,
            transition: (before != after).then_some((before, after)),
        })
    }

    /// Ends the match where it stands (shutdown). Returns false if it was already over.
    pub fn force_full_time(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.state.status = MatchStatus::FullTime;
        true
    }

    fn apply_boundaries(&mut self) {
        let half_time = self.duration / 2;
        let minute = self.state.minute;

        if minute == 1 {
            self.state.status = MatchStatus::FirstHalf;
        }
        if minute == half_time {
            self.state.status = MatchStatus::HalfTime;
        }
        if minute == half_time + 1 {
            self.state.status = MatchStatus::SecondHalf;
        }
        if minute == self.duration {
            self.state.status = MatchStatus::FullTime;
        }
    }
}
