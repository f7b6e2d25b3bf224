//! # Durable Store
//!
//! A schemaless document store. Records are JSON objects; `upsert` keys them by
//! their `id` field. From the scheduler's point of view every write is best-effort.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub type Record = Value;

/// Field-equality conjunction with an optional ordering field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, bool)>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.order_by = Some((field.into(), ascending));
        self
    }

    /// Whether `record` satisfies every equality filter.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Inserts or replaces the record with the same `id` in `collection`.
    async fn upsert(&self, collection: &str, record: Record) -> Result<(), StoreError>;

    async fn insert(&self, collection: &str, record: Record) -> Result<(), StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>, StoreError>;
}
