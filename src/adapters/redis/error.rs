//! Redis adapter errors.

use deadpool_redis::{CreatePoolError, PoolError};

pub type RedisError = deadpool_redis::redis::RedisError;

#[derive(Debug, thiserror::Error)]
pub enum RedisAdapterError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Create pool error: {0}")]
    CreatePool(#[from] CreatePoolError),
}
