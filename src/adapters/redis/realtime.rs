//! Real-time fan-out over Redis pub/sub.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use crate::ports::realtime::RealtimePort;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use serde_json::{json, Value};

/// Wire envelope delivered to subscribers of a user's channel.
pub(super) fn envelope(event: &str, payload: &Value) -> Value {
    json!({ "event": event, "data": payload })
}

#[async_trait]
impl RealtimePort for RedisPool {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let message = serde_json::to_string(&envelope(event, payload))
            .map_err(RedisAdapterError::from)?;
        let mut conn = self.connection().await?;
        let receivers: i64 = conn
            .publish(channel, message)
            .await
            .map_err(RedisAdapterError::from)?;
        tracing::debug!(channel, event, receivers, "published realtime event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let payload = json!({ "success": true, "message": "ok", "data": {} });
        assert_eq!(
            envelope("statusUpdate", &payload),
            json!({ "event": "statusUpdate", "data": payload })
        );
    }
}
