use crate::domain::jobs::{JobRecord, JobStatus, Notification, TranscodedVideo};
use crate::ports::repository::{JobRepository, NotificationRepository};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::error::Error;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn now_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

/// Reads a job row as returned by `ReturnValues=ALL_NEW`.
fn job_record_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<JobRecord, Box<dyn Error + Send + Sync>> {
    let unique_id = string_attr(item, "unique_id").ok_or("job row has no unique_id")?;
    let raw_status = string_attr(item, "status").unwrap_or_default();
    let status = JobStatus::parse(&raw_status)
        .ok_or_else(|| format!("job {} has unknown status {:?}", unique_id, raw_status))?;

    Ok(JobRecord {
        unique_id,
        owner_id: string_attr(item, "owner_id"),
        title: string_attr(item, "title"),
        status,
    })
}

/// DynamoAdapter implements the job and notification repositories for DynamoDB.
#[derive(Clone)]
pub struct DynamoAdapter {
    client: Client,
    jobs_table: String,
    notifications_table: String,
}

impl DynamoAdapter {
    pub fn new(client: Client, jobs_table: String, notifications_table: String) -> Self {
        Self {
            client,
            jobs_table,
            notifications_table,
        }
    }
}

#[async_trait]
impl JobRepository for DynamoAdapter {
    async fn update_status(
        &self,
        unique_id: &str,
        status: JobStatus,
        rendition: Option<&TranscodedVideo>,
    ) -> Result<Option<JobRecord>, Box<dyn Error + Send + Sync>> {
        let mut update = "SET #status = :status, updated_at = :now".to_string();
        let mut request = self
            .client
            .update_item()
            .table_name(&self.jobs_table)
            .key("unique_id", AttributeValue::S(unique_id.to_string()))
            .condition_expression("attribute_exists(unique_id)")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":status", AttributeValue::S(status.as_str().to_string()))
            .expression_attribute_values(":now", AttributeValue::N(now_millis()))
            .return_values(ReturnValue::AllNew);

        if let Some(video) = rendition {
            update.push_str(", transcoded_video = :video");
            let video_map = HashMap::from([
                ("name".to_string(), AttributeValue::S(video.name.clone())),
                ("url".to_string(), AttributeValue::S(video.url.clone())),
            ]);
            request = request.expression_attribute_values(":video", AttributeValue::M(video_map));
        }

        let resp = match request.update_expression(update).send().await {
            Ok(resp) => resp,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match resp.attributes {
            Some(item) => Ok(Some(job_record_from_item(&item)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl NotificationRepository for DynamoAdapter {
    async fn append(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.notifications_table)
            .item("id", AttributeValue::S(Uuid::new_v4().to_string()))
            .item("user_id", AttributeValue::S(notification.user_id.clone()))
            .item("unique_id", AttributeValue::S(notification.unique_id.clone()))
            .item(
                "event",
                AttributeValue::S(notification.event.as_str().to_string()),
            )
            .item("created_at", AttributeValue::N(now_millis()));

        if let Some(title) = &notification.title {
            request = request.item("title", AttributeValue::S(title.clone()));
        }

        request.send().await?;
        Ok(())
    }
}
