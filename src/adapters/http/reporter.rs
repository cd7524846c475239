use crate::domain::jobs::StatusReport;
use crate::ports::reporter::{Delivery, StatusReporter};
use async_trait::async_trait;
use std::error::Error;
use std::time::Duration;

/// Posts status reports as JSON to the callback URL.
pub struct HttpReporter {
    http: reqwest::Client,
    callback_url: String,
}

impl HttpReporter {
    pub fn new(callback_url: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, callback_url })
    }
}

#[async_trait]
impl StatusReporter for HttpReporter {
    async fn send(&self, report: &StatusReport) -> Result<Delivery, Box<dyn Error + Send + Sync>> {
        let resp = self
            .http
            .post(&self.callback_url)
            .json(report)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(Delivery::Accepted);
        }
        let body = resp.text().await.unwrap_or_default();
        Ok(Delivery::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
