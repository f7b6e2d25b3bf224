//! # lib_live
//!
//! The engine behind the live score service: a scheduler that simulates a fixed
//! set of concurrent matches minute by minute, and a distribution layer that fans
//! those changes out to connected viewers together with presence, chat and typing
//! signals.
//!
//! ## Layout
//!
//! - **`model`**: the shared vocabulary (`Match`, `MatchEvent`, `MatchStatus`) plus
//!   the typed messages that cross the publish/subscribe boundary and the viewer socket.
//! - **`simulator`**: `EventGenerator`, `MatchClock`, the cancellable `RepeatingTask`
//!   and the `SimulationScheduler` that drives one task per match.
//! - **`realtime`**: `BroadcastHub` rooms, `ChatGate`, `TypingTracker` and the
//!   per-connection `ViewerSession`.
//! - **`connections`**: the `BroadcastMedium` and `DurableStore` seams with their
//!   in-process and networked (feature `connections`) implementations.
//! - **`readpath`**: cache-then-store lookups backing the HTTP read API.
//!
//! The scheduler never talks to a hub directly. Everything it produces goes through
//! the broadcast medium, so any number of hub processes can sit behind one simulator.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod connections;
pub mod error;
pub mod model;
pub mod readpath;
pub mod realtime;
pub mod simulator;

pub use connections::{BroadcastMedium, DurableStore, MemoryMedium, MemoryStore};
pub use error::{ChatRejection, MediumError, ReadError, StoreError};
pub use model::{Match, MatchEvent, MatchStatus, Team};
pub use readpath::ReadPath;
pub use realtime::{BroadcastHub, SessionLimits, ViewerHandle, ViewerSession};
pub use simulator::{SimulationScheduler, SimulationSettings};
