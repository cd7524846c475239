//! Configuration for the three deployment surfaces.
//!
//! Each struct is built once at startup from a key lookup (the process
//! environment in production). Every missing required key is collected before
//! failing so a misconfigured deployment reports all of them at once.

use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Collects values and problems from a lookup function.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<String>,
    invalid: Option<ConfigError>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
            invalid: None,
        }
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&mut self, key: &str) -> String {
        match self.optional(key) {
            Some(v) => v,
            None => {
                self.missing.push(key.to_string());
                String::new()
            }
        }
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&mut self, key: &str, default: T) -> T {
        match self.optional(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => v,
                Err(_) => {
                    if self.invalid.is_none() {
                        self.invalid = Some(ConfigError::Invalid {
                            key: key.to_string(),
                            value: raw,
                        });
                    }
                    default
                }
            },
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ConfigError> {
        if !self.missing.is_empty() {
            return Err(ConfigError::Missing(self.missing));
        }
        match self.invalid {
            Some(e) => Err(e),
            None => Ok(value),
        }
    }
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Environment variable names shared by the orchestrator (which sets them on
/// each slot) and the worker (which reads them).
pub mod worker_env {
    pub const SOURCE_BUCKET: &str = "BUCKET_NAME";
    pub const INPUT_VIDEO: &str = "INPUT_VIDEO";
    pub const OUTPUT_BUCKET: &str = "OUTPUT_VIDEO_BUCKET";
    pub const CALLBACK_URL: &str = "WEBHOOK_URL";
    /// Credentials forwarded to the slot when the orchestrator has them.
    pub const FORWARDED_SECRETS: [&str; 3] =
        ["AWS_REGION", "AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"];
}

/// Configuration for the queue-polling orchestrator.
#[cfg(feature = "orchestrator")]
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Queue URL to poll for upload events
    pub queue_url: String,
    /// Prefix of every compute slot name
    pub slot_group_prefix: String,
    /// Container name prefix inside a slot
    pub container_name: String,
    /// Worker image reference
    pub container_image: String,
    pub source_bucket: String,
    pub output_bucket: String,
    /// Status callback the worker reports to
    pub callback_url: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub registry_server: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    /// Durable slot counter; process-local when unset
    pub redis_url: Option<String>,
    pub slot_counter_start: u64,
    pub poll_interval_secs: u64,
    pub visibility_timeout_secs: u32,
    pub slot_cpu: f64,
    pub slot_memory_gb: f64,
    pub discard_foreign_events: bool,
    /// Secrets copied into each slot's environment
    pub forwarded_secrets: Vec<(String, String)>,
}

#[cfg(feature = "orchestrator")]
impl OrchestratorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut r = EnvReader::new(lookup);
        let config = Self {
            queue_url: r.required("QUEUE_URL"),
            slot_group_prefix: r.required("CONTAINER_GROUP_NAME"),
            container_name: r.required("CONTAINER_NAME"),
            container_image: r.required("CONTAINER_IMAGE"),
            source_bucket: r.required(worker_env::SOURCE_BUCKET),
            output_bucket: r.required(worker_env::OUTPUT_BUCKET),
            callback_url: r.required("WEBHOOK_UPLOADSTATUS_URL"),
            subscription_id: r.required("SUBSCRIPTION_ID"),
            resource_group: r.required("AZURE_RESOURCE_GROUP"),
            location: r.or("AZURE_LOCATION", "eastus"),
            tenant_id: r.required("AZURE_TENANT_ID"),
            client_id: r.required("AZURE_CLIENT_ID"),
            client_secret: r.required("AZURE_CLIENT_SECRET"),
            registry_server: r.optional("REGISTRY_SERVER"),
            registry_username: r.optional("REGISTRY_USERNAME"),
            registry_password: r.optional("REGISTRY_PASSWORD"),
            redis_url: r.optional("REDIS_URL"),
            slot_counter_start: r.parsed("SLOT_COUNTER_START", 5),
            poll_interval_secs: r.parsed("POLL_INTERVAL_SECS", 20),
            visibility_timeout_secs: r.parsed("VISIBILITY_TIMEOUT_SECS", 70),
            slot_cpu: r.parsed("SLOT_CPU", 2.0),
            slot_memory_gb: r.parsed("SLOT_MEMORY_GB", 4.0),
            discard_foreign_events: r.parsed("DISCARD_FOREIGN_EVENTS", false),
            forwarded_secrets: worker_env::FORWARDED_SECRETS
                .iter()
                .filter_map(|k| r.optional(k).map(|v| (k.to_string(), v)))
                .collect(),
        };
        r.finish(config)
    }
}

/// Configuration for one worker run inside a compute slot.
#[cfg(feature = "worker")]
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub source_bucket: String,
    /// Blob name of the source video
    pub input_video: String,
    pub output_bucket: String,
    pub callback_url: String,
    /// Base for manifest URLs; the bucket's own URL when unset
    pub public_base_url: Option<String>,
    /// Parent of the per-job temporary workspace
    pub work_dir: Option<String>,
    pub ffmpeg_path: String,
}

#[cfg(feature = "worker")]
impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut r = EnvReader::new(lookup);
        let config = Self {
            source_bucket: r.required(worker_env::SOURCE_BUCKET),
            input_video: r.required(worker_env::INPUT_VIDEO),
            output_bucket: r.required(worker_env::OUTPUT_BUCKET),
            callback_url: r.required(worker_env::CALLBACK_URL),
            public_base_url: r.optional("PUBLIC_BASE_URL"),
            work_dir: r.optional("WORK_DIR"),
            ffmpeg_path: r.or("FFMPEG_PATH", "ffmpeg"),
        };
        r.finish(config)
    }
}

/// Configuration for the status callback receiver.
#[cfg(feature = "receiver")]
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: u16,
    pub jobs_table: String,
    pub notifications_table: String,
    /// Redis used as the real-time channel
    pub redis_url: String,
}

#[cfg(feature = "receiver")]
impl ReceiverConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut r = EnvReader::new(lookup);
        let config = Self {
            addr: r.or("ADDR", "0.0.0.0"),
            port: r.parsed("PORT", 8000),
            jobs_table: r.required("JOBS_TABLE"),
            notifications_table: r.required("NOTIFICATIONS_TABLE"),
            redis_url: r.required("REDIS_URL"),
        };
        r.finish(config)
    }
}

#[cfg(all(test, feature = "full"))]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_worker_config_reports_every_missing_key() {
        let err = WorkerConfig::from_lookup(lookup(&[("INPUT_VIDEO", "clip.mp4")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec![
                "BUCKET_NAME".to_string(),
                "OUTPUT_VIDEO_BUCKET".to_string(),
                "WEBHOOK_URL".to_string(),
            ])
        );
        assert!(err.to_string().contains("BUCKET_NAME, OUTPUT_VIDEO_BUCKET, WEBHOOK_URL"));
    }

    #[test]
    fn test_worker_config_treats_blank_as_missing() {
        let err = WorkerConfig::from_lookup(lookup(&[
            ("BUCKET_NAME", "src"),
            ("INPUT_VIDEO", "  "),
            ("OUTPUT_VIDEO_BUCKET", "out"),
            ("WEBHOOK_URL", "http://cb"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["INPUT_VIDEO".to_string()]));
    }

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("BUCKET_NAME", "src"),
            ("INPUT_VIDEO", "clip.mp4"),
            ("OUTPUT_VIDEO_BUCKET", "out"),
            ("WEBHOOK_URL", "http://cb"),
        ]))
        .unwrap();
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.public_base_url, None);
    }

    fn orchestrator_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("QUEUE_URL", "https://queue"),
            ("CONTAINER_GROUP_NAME", "group"),
            ("CONTAINER_NAME", "encoder"),
            ("CONTAINER_IMAGE", "registry/encoder:latest"),
            ("BUCKET_NAME", "uploads"),
            ("OUTPUT_VIDEO_BUCKET", "renditions"),
            ("WEBHOOK_UPLOADSTATUS_URL", "https://app/api/webhooks/update-status"),
            ("SUBSCRIPTION_ID", "sub"),
            ("AZURE_RESOURCE_GROUP", "rg"),
            ("AZURE_TENANT_ID", "tenant"),
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", "secret"),
        ]
    }

    #[test]
    fn test_orchestrator_config_defaults() {
        let config = OrchestratorConfig::from_lookup(lookup(&orchestrator_pairs())).unwrap();
        assert_eq!(config.slot_counter_start, 5);
        assert_eq!(config.poll_interval_secs, 20);
        assert_eq!(config.visibility_timeout_secs, 70);
        assert_eq!(config.slot_cpu, 2.0);
        assert_eq!(config.slot_memory_gb, 4.0);
        assert_eq!(config.location, "eastus");
        assert!(!config.discard_foreign_events);
        assert!(config.redis_url.is_none());
        assert!(config.forwarded_secrets.is_empty());
    }

    #[test]
    fn test_orchestrator_config_rejects_bad_number() {
        let mut pairs = orchestrator_pairs();
        pairs.push(("POLL_INTERVAL_SECS", "soon"));
        let err = OrchestratorConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS".to_string(),
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_orchestrator_config_forwards_present_secrets() {
        let mut pairs = orchestrator_pairs();
        pairs.push(("AWS_REGION", "eu-west-1"));
        let config = OrchestratorConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.forwarded_secrets,
            vec![("AWS_REGION".to_string(), "eu-west-1".to_string())]
        );
    }

    #[test]
    fn test_receiver_config_missing_keys() {
        let err = ReceiverConfig::from_lookup(lookup(&[("PORT", "9000")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec![
                "JOBS_TABLE".to_string(),
                "NOTIFICATIONS_TABLE".to_string(),
                "REDIS_URL".to_string(),
            ])
        );
    }
}
