//! Redis connection pool.

use super::error::RedisAdapterError;
use deadpool_redis::{Config, Connection, Pool, Runtime};

/// Shared by the real-time publisher and the slot counter.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl RedisPool {
    /// Create a new RedisPool. Connections are opened lazily.
    pub fn new(redis_url: &str) -> Result<Self, RedisAdapterError> {
        let pool = Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    pub(super) async fn connection(&self) -> Result<Connection, RedisAdapterError> {
        Ok(self.pool.get().await?)
    }
}
