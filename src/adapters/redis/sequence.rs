//! Durable slot counter.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use crate::ports::sequence::SlotSequence;
use async_trait::async_trait;
use deadpool_redis::redis::{pipe, Pipeline};

/// Key holding the last used slot counter
pub const SLOT_COUNTER_KEY: &str = "ladder:slot_counter";

/// Seeds the key with `start` unless it already exists, then reads it.
fn current_pipeline(key: &str, start: u64) -> Pipeline {
    let mut p = pipe();
    p.atomic().set_nx(key, start).ignore().get(key);
    p
}

/// Seeds the key with `start` unless it already exists, then increments it.
fn advance_pipeline(key: &str, start: u64) -> Pipeline {
    let mut p = pipe();
    p.atomic().set_nx(key, start).ignore().incr(key, 1u64);
    p
}

/// Slot counter stored in Redis so restarts and replicas never reuse a name.
#[derive(Clone)]
pub struct RedisSlotSequence {
    redis: RedisPool,
    start: u64,
    key: String,
}

impl RedisSlotSequence {
    pub fn new(redis: RedisPool, start: u64) -> Self {
        Self {
            redis,
            start,
            key: SLOT_COUNTER_KEY.to_string(),
        }
    }

    async fn query(&self, pipeline: Pipeline) -> Result<u64, RedisAdapterError> {
        let mut conn = self.redis.connection().await?;
        let (value,): (u64,) = pipeline.query_async(&mut conn).await?;
        Ok(value)
    }
}

#[async_trait]
impl SlotSequence for RedisSlotSequence {
    async fn current(&self) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.query(current_pipeline(&self.key, self.start)).await?)
    }

    async fn advance(&self) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.query(advance_pipeline(&self.key, self.start)).await?)
    }
}
