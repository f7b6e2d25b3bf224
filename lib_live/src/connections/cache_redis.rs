//! # Redis Broadcast Medium
//!
//! Cache commands go through a shared `ConnectionManager`, which reconnects on its
//! own. Every subscription opens a dedicated pub/sub connection that lives exactly
//! as long as the returned stream.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::medium::{BroadcastMedium, Subscription};
use crate::error::MediumError;

pub struct RedisMedium {
    /// Used to open pub/sub connections.
    client: Client,
    /// Multiplexed connection for plain commands.
    manager: ConnectionManager,
}

impl RedisMedium {
    /// Connects to the server at `url` (e.g. "redis://127.0.0.1/").
    pub async fn connect(url: &str) -> Result<Self, MediumError> {
        let client = Client::open(url).map_err(|e| MediumError::ConnectionError(e.to_string()))?;
        let manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| MediumError::ConnectionError(e.to_string()))?;
        Ok(Self { client, manager })
    }
}

fn command_error(e: redis::RedisError) -> MediumError {
    MediumError::CommandError(e.to_string())
}

#[async_trait]
impl BroadcastMedium for RedisMedium {
    async fn get(&self, key: &str) -> Result<Option<String>, MediumError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(command_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        let mut conn = self.manager.clone();
        let _: () = conn.set(key, value).await.map_err(command_error)?;
        Ok(())
    }

    async fn list_append(&self, key: &str, value: &str) -> Result<(), MediumError> {
        let mut conn = self.manager.clone();
        let _: () = conn.rpush(key, value).await.map_err(command_error)?;
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, MediumError> {
        let mut conn = self.manager.clone();
        conn.lrange(key, start, stop).await.map_err(command_error)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), MediumError> {
        let mut conn = self.manager.clone();
        let _: () = conn.publish(channel, message).await.map_err(command_error)?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, MediumError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| MediumError::ConnectionError(e.to_string()))?;
        pubsub.subscribe(channel).await.map_err(command_error)?;

        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move { msg.get_payload::<String>().ok() });
        Ok(stream.boxed())
    }
}
