//! # Realtime Distribution
//!
//! The viewer-facing half of the engine. A `BroadcastHub` is shared by all
//! connections of one process; each connection owns a `ViewerSession` holding its
//! `ChatGate` and `TypingTracker`, so no global map has to be cleaned up when a
//! viewer goes away.

pub mod chat;
pub mod hub;
pub mod session;
pub mod typing;

pub use chat::ChatGate;
pub use hub::{BroadcastHub, ViewerHandle};
pub use session::{SessionLimits, ViewerSession};
pub use typing::TypingTracker;
