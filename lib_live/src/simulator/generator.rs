//! # Event Generator
//!
//! Runs one Bernoulli trial per event class, in `EventKind::PRIORITY` order, and
//! emits the first success. At most one event per minute: a goal masks a foul that
//! would otherwise have happened in the same minute. The rates are tuned to that
//! masking, so the order must not change.

use rand::Rng;

use crate::model::{EventKind, Match, MatchEvent, Team};

/// Per-minute probabilities for each event class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRates {
    pub goal: f64,
    pub yellow_card: f64,
    pub red_card: f64,
    pub substitution: f64,
    pub foul: f64,
    pub shot: f64,
    /// Substitution trials run only once `minute` is strictly past this value.
    pub substitution_after: u32,
}

impl EventRates {
    /// Realistic totals over a match of `duration` minutes: ~2.5 goals, ~4 yellow
    /// cards, rare reds, ~6 late substitutions, a foul every 2.5 and a shot every 4
    /// minutes (before masking).
    pub fn for_duration(duration: u32, substitution_after: u32) -> Self {
        let duration = duration.max(1);
        let late_window = f64::from(duration.saturating_sub(substitution_after).max(1));
        let minutes = f64::from(duration);
        Self {
            goal: 2.5 / minutes,
            yellow_card: 4.0 / minutes,
            red_card: 0.1 / minutes,
            substitution: 6.0 / late_window,
            foul: 1.0 / 2.5,
            shot: 1.0 / 4.0,
            substitution_after,
        }
    }

    fn probability(&self, kind: EventKind) -> f64 {
        match kind {
            EventKind::Goal => self.goal,
            EventKind::YellowCard => self.yellow_card,
            EventKind::RedCard => self.red_card,
            EventKind::Substitution => self.substitution,
            EventKind::Foul => self.foul,
            EventKind::Shot => self.shot,
        }
    }
}

impl Default for EventRates {
    fn default() -> Self {
        Self::for_duration(90, 60)
    }
}

/// Deterministic for a given random source: same seed and same match state give
/// the same outcome.
pub struct EventGenerator<R> {
    rng: R,
    rates: EventRates,
}

impl<R: Rng> EventGenerator<R> {
    pub fn new(rng: R, rates: EventRates) -> Self {
        Self { rng, rates }
    }

    pub fn rates(&self) -> &EventRates {
        &self.rates
    }

    /// Produces the event for the current minute of `state`, if any.
    ///
    /// A goal bumps the scoring side's score before it is returned; nothing else
    /// in the crate changes the score.
    pub fn generate(&mut self, state: &mut Match) -> Option<MatchEvent> {
        if !state.status.is_in_play() {
            return None;
        }

        for kind in EventKind::PRIORITY {
            if kind == EventKind::Substitution && state.minute <= self.rates.substitution_after {
                continue;
            }
            if self.rng.random::<f64>() < self.rates.probability(kind) {
                let team = self.coin_flip();
                if kind == EventKind::Goal {
                    state.score.increment(team);
                }
                return Some(MatchEvent { kind, team, minute: state.minute });
            }
        }
        None
    }

    fn coin_flip(&mut self) -> Team {
        if self.rng.random::<f64>() < 0.5 {
            Team::Home
        } else {
            Team::Away
        }
    }
}
