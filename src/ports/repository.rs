use crate::domain::jobs::{JobRecord, JobStatus, Notification, TranscodedVideo};
use async_trait::async_trait;
use std::error::Error;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Set the terminal status of a job and link its rendition when given.
    /// Returns `None` when no job matches `unique_id`.
    async fn update_status(
        &self,
        unique_id: &str,
        status: JobStatus,
        rendition: Option<&TranscodedVideo>,
    ) -> Result<Option<JobRecord>, Box<dyn Error + Send + Sync>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Append to the user's notification history
    async fn append(&self, notification: &Notification)
        -> Result<(), Box<dyn Error + Send + Sync>>;
}
