//! # Match State
//!
//! Closed enums for status, team and event kind so every consumer (the generator's
//! priority chain in particular) is checked exhaustively by the compiler.

use serde::{Deserialize, Serialize};

/// Lifecycle of a match. Variants are declared in kick-off order, so `Ord`
/// matches the only legal direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    FullTime,
}

impl MatchStatus {
    /// `FullTime` accepts no further ticks.
    pub fn is_terminal(self) -> bool {
        self == MatchStatus::FullTime
    }

    /// Whether the ball is in play, i.e. events may happen.
    pub fn is_in_play(self) -> bool {
        matches!(self, MatchStatus::FirstHalf | MatchStatus::SecondHalf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
    Foul,
    Shot,
}

impl EventKind {
    /// Order in which the generator runs its trials. The first success wins the minute.
    pub const PRIORITY: [EventKind; 6] = [
        EventKind::Goal,
        EventKind::YellowCard,
        EventKind::RedCard,
        EventKind::Substitution,
        EventKind::Foul,
        EventKind::Shot,
    ];
}

/// Something that happened on the pitch. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub team: Team,
    pub minute: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn increment(&mut self, team: Team) {
        match team {
            Team::Home => self.home += 1,
            Team::Away => self.away += 1,
        }
    }
}

/// Running counters. They only ever go up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub shots: u32,
    pub fouls: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub substitutions: u32,
}

impl MatchStats {
    /// Bumps the counter matching `kind`. Goals have no counter of their own,
    /// the score records them.
    pub fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Goal => {}
            EventKind::YellowCard => self.yellow_cards += 1,
            EventKind::RedCard => self.red_cards += 1,
            EventKind::Substitution => self.substitutions += 1,
            EventKind::Foul => self.fouls += 1,
            EventKind::Shot => self.shots += 1,
        }
    }
}

/// # Match
///
/// Authoritative state of one simulated match. Only the scheduler's task for this
/// match mutates it; everybody else sees serialized copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub home: String,
    pub away: String,
    pub score: Score,
    pub minute: u32,
    pub status: MatchStatus,
    #[serde(default)]
    pub events: Vec<MatchEvent>,
    pub stats: MatchStats,
}

impl Match {
    /// A fresh match at minute zero with a generated id.
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), home, away)
    }

    pub fn with_id(id: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            home: home.into(),
            away: away.into(),
            score: Score::default(),
            minute: 0,
            status: MatchStatus::NotStarted,
            events: Vec::new(),
            stats: MatchStats::default(),
        }
    }

    /// The score/minute/status/stats view pushed to viewers every tick.
    pub fn score_update(&self) -> ScoreUpdate {
        ScoreUpdate {
            score: self.score,
            minute: self.minute,
            status: self.status,
            stats: self.stats,
        }
    }
}

/// Per-tick snapshot, published whether or not an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub score: Score,
    pub minute: u32,
    pub status: MatchStatus,
    pub stats: MatchStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_in_screaming_case() {
        let json = serde_json::to_string(&MatchStatus::SecondHalf).unwrap();
        assert_eq!(json, "\"SECOND_HALF\"");
        assert!(MatchStatus::FirstHalf < MatchStatus::HalfTime);
        assert!(MatchStatus::FullTime.is_terminal());
        assert!(!MatchStatus::HalfTime.is_in_play());
    }

    #[test]
    fn event_uses_type_field() {
        let event = MatchEvent { kind: EventKind::YellowCard, team: Team::Away, minute: 12 };
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value, serde_json::json!({"type": "yellow_card", "team": "away", "minute": 12}));
    }

    #[test]
    fn goal_touches_no_stat_counter() {
        let mut stats = MatchStats::default();
        stats.record(EventKind::Goal);
        assert_eq!(stats, MatchStats::default());
        stats.record(EventKind::Foul);
        stats.record(EventKind::Shot);
        assert_eq!((stats.fouls, stats.shots), (1, 1));
    }

    #[test]
    fn match_without_events_field_still_decodes() {
        let json = serde_json::json!({
            "id": "m1", "home": "Lions", "away": "Bears",
            "score": {"home": 1, "away": 0}, "minute": 10, "status": "FIRST_HALF",
            "stats": {"shots": 0, "fouls": 2, "yellow_cards": 0, "red_cards": 0, "substitutions": 0}
        });
        let decoded: Match = serde_json::from_value(json).unwrap();
        assert!(decoded.events.is_empty());
        assert_eq!(decoded.score.home, 1);
    }
}
