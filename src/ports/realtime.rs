use async_trait::async_trait;
use std::error::Error;

/// Pub/sub transport keyed by user identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimePort: Send + Sync {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}
