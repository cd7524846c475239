use crate::domain::events::QueueMessage;
use async_trait::async_trait;
use std::error::Error;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueuePort: Send + Sync {
    /// Receive at most one message, hiding it from other consumers for
    /// `visibility_timeout_secs`.
    async fn receive(
        &self,
        visibility_timeout_secs: u32,
    ) -> Result<Option<QueueMessage>, Box<dyn Error + Send + Sync>>;

    /// Delete a leased message using its pop receipt.
    async fn delete(&self, message: &QueueMessage) -> Result<(), Box<dyn Error + Send + Sync>>;
}
