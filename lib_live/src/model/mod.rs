//! # Event Model
//!
//! Shared vocabulary for the simulator, the distribution layer and the read API.
//!
//! - **`match_state`**: `Match`, its `Score`/`MatchStats` counters, `MatchStatus`
//!   and the immutable `MatchEvent`.
//! - **`message`**: typed messages crossing the publish/subscribe boundary
//!   (`FeedMessage`) and the viewer socket (`ClientMessage`, `ServerMessage`).
//! - **`keys`**: cache keys and channel names shared by every process.

pub mod keys;
pub mod match_state;
pub mod message;

pub use match_state::{EventKind, Match, MatchEvent, MatchStats, MatchStatus, Score, ScoreUpdate, Team};
pub use message::{ClientMessage, FeedMessage, ServerMessage};
