use crate::live_logic::config::Config;
use anyhow::{Context, Result};
use lib_live::connections::{PostgresStore, RedisMedium};
use lib_live::{BroadcastMedium, DurableStore, MemoryMedium, MemoryStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Redis when `redis_url` is set, otherwise an in-process medium.
pub async fn connect_medium(config: &Config) -> Result<Arc<dyn BroadcastMedium>> {
    match &config.redis_url {
        Some(url) => {
            let medium = RedisMedium::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            info!("Broadcast medium: Redis");
            Ok(Arc::new(medium))
        }
        None => {
            if !config.run_simulator() {
                warn!("Hub-only mode without REDIS_URL: nothing will ever be published to this process.");
            }
            info!("Broadcast medium: in-process");
            Ok(Arc::new(MemoryMedium::new()))
        }
    }
}

/// PostgreSQL when `database_url` is set, otherwise an in-process store.
pub async fn connect_store(config: &Config) -> Result<Arc<dyn DurableStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, config.db_pool_size.unwrap_or(8))
                .await
                .context("Failed to connect to PostgreSQL")?;
            info!("Durable store: PostgreSQL");
            Ok(Arc::new(store))
        }
        None => {
            info!("Durable store: in-process");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
