use super::rendition::Resolution;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            JobStatus::Finished
        } else {
            JobStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Finished => "FINISHED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "FINISHED" => Some(JobStatus::Finished),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted upload, as seen by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub unique_id: String,
    pub source_reference: String,
    pub target_resolutions: Vec<Resolution>,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodedVideo {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    pub transcoded_video: TranscodedVideo,
}

/// Worker → receiver outcome message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub success: bool,
    pub message: String,
    pub data: ReportData,
}

impl StatusReport {
    pub fn succeeded(unique_id: String, video: TranscodedVideo) -> Self {
        Self {
            success: true,
            message: "Video transcoded successfully".to_string(),
            data: ReportData {
                unique_id: Some(unique_id),
                transcoded_video: video,
            },
        }
    }

    /// Failure reports still name the video; the URL stays empty.
    pub fn failed(unique_id: Option<String>, video_name: String, error: &str) -> Self {
        Self {
            success: false,
            message: format!("Transcoding failed: {}", error),
            data: ReportData {
                unique_id,
                transcoded_video: TranscodedVideo {
                    name: video_name,
                    url: String::new(),
                },
            },
        }
    }
}

/// Persisted job row returned by a status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub unique_id: String,
    pub owner_id: Option<String>,
    pub title: Option<String>,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: String,
    pub unique_id: String,
    pub event: JobStatus,
    pub title: Option<String>,
}

impl Notification {
    pub fn for_record(user_id: &str, record: &JobRecord) -> Self {
        Self {
            user_id: user_id.to_string(),
            unique_id: record.unique_id.clone(),
            event: record.status,
            title: record.title.clone(),
        }
    }
}
