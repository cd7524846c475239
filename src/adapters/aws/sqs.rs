//! SQS queue of upload events.
//!
//! Message bodies must carry base64 encoded Event Grid events (see
//! `domain::events`), so the queue is fed by a bridge from the Event Grid
//! subscription rather than by S3 bucket notifications.

use crate::domain::events::QueueMessage;
use crate::ports::queue::QueuePort;
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use std::error::Error;

/// SqsAdapter implements QueuePort for the upload event queue.
#[derive(Clone)]
pub struct SqsAdapter {
    client: Client,
    queue_url: String,
}

impl SqsAdapter {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl QueuePort for SqsAdapter {
    async fn receive(
        &self,
        visibility_timeout_secs: u32,
    ) -> Result<Option<QueueMessage>, Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .visibility_timeout(visibility_timeout_secs as i32)
            .send()
            .await?;

        let Some(msg) = resp.messages.and_then(|m| m.into_iter().next()) else {
            return Ok(None);
        };

        let pop_receipt = msg
            .receipt_handle()
            .ok_or("received message has no receipt handle")?
            .to_string();

        Ok(Some(QueueMessage {
            message_id: msg.message_id().unwrap_or_default().to_string(),
            pop_receipt,
            body: msg.body().unwrap_or_default().to_string(),
            visibility_timeout_secs,
        }))
    }

    async fn delete(&self, message: &QueueMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.pop_receipt)
            .send()
            .await?;
        Ok(())
    }
}
