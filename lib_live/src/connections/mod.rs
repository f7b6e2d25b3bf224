//! # Connections Module
//!
//! The two collaborators the engine talks to, expressed as traits so the
//! scheduler and the hubs can run against in-process backends in tests and
//! single-node setups, or against Redis and PostgreSQL in production.

/// Cache + publish/subscribe contract.
pub mod medium;
/// Document store contract used as read fallback and audit log.
pub mod store;
/// In-process implementations of both contracts.
pub mod memory;

/// Redis-backed broadcast medium.
#[cfg(feature = "connections")]
pub mod cache_redis;
/// PostgreSQL-backed durable store.
#[cfg(feature = "connections")]
pub mod db_postgres;

pub use medium::{BroadcastMedium, Subscription};
pub use memory::{MemoryMedium, MemoryStore};
pub use store::{DurableStore, Query, Record};

#[cfg(feature = "connections")]
pub use cache_redis::RedisMedium;
#[cfg(feature = "connections")]
pub use db_postgres::PostgresStore;
