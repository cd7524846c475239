use crate::config::{worker_env, OrchestratorConfig};
use crate::domain::dispatch::{self, Action, DispatchPolicy, Triage};
use crate::domain::events::QueueMessage;
use crate::domain::slots::{slot_name, EnvVar, RegistryCredentials, SlotSpec};
use crate::ports::compute::ComputePort;
use crate::ports::queue::QueuePort;
use crate::ports::sequence::SlotSequence;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Fixed part of every slot the orchestrator creates.
#[derive(Clone, Debug)]
pub struct SlotTemplate {
    pub group_prefix: String,
    pub container_name: String,
    pub image: String,
    pub location: String,
    pub cpu: f64,
    pub memory_gb: f64,
    pub source_bucket: String,
    pub output_bucket: String,
    pub callback_url: String,
    pub forwarded_secrets: Vec<(String, String)>,
    pub registry: Option<RegistryCredentials>,
}

impl SlotTemplate {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        let registry = match (
            &config.registry_server,
            &config.registry_username,
            &config.registry_password,
        ) {
            (Some(server), Some(username), Some(password)) => Some(RegistryCredentials {
                server: server.clone(),
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Self {
            group_prefix: config.slot_group_prefix.clone(),
            container_name: config.container_name.clone(),
            image: config.container_image.clone(),
            location: config.location.clone(),
            cpu: config.slot_cpu,
            memory_gb: config.slot_memory_gb,
            source_bucket: config.source_bucket.clone(),
            output_bucket: config.output_bucket.clone(),
            callback_url: config.callback_url.clone(),
            forwarded_secrets: config.forwarded_secrets.clone(),
            registry,
        }
    }

    pub fn spec_for(&self, counter: u64, blob_name: &str) -> SlotSpec {
        let mut env = vec![
            EnvVar::plain(worker_env::SOURCE_BUCKET, self.source_bucket.as_str()),
            EnvVar::plain(worker_env::INPUT_VIDEO, blob_name),
            EnvVar::plain(worker_env::OUTPUT_BUCKET, self.output_bucket.as_str()),
            EnvVar::plain(worker_env::CALLBACK_URL, self.callback_url.as_str()),
        ];
        env.extend(
            self.forwarded_secrets
                .iter()
                .map(|(name, value)| EnvVar::secure(name, value.as_str())),
        );

        SlotSpec {
            slot_name: slot_name(&self.group_prefix, counter),
            container_name: slot_name(&self.container_name, counter),
            image: self.image.clone(),
            location: self.location.clone(),
            cpu: self.cpu,
            memory_gb: self.memory_gb,
            env,
            registry: self.registry.clone(),
        }
    }
}

/// Result of one poll iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The queue had nothing visible.
    Idle,
    Handled { message_id: String, action: Action },
}

pub struct OrchestratorService<Q, C, S> {
    queue: Q,
    compute: C,
    sequence: S,
    template: SlotTemplate,
    policy: DispatchPolicy,
    poll_interval: Duration,
    visibility_timeout_secs: u32,
}

impl<Q, C, S> OrchestratorService<Q, C, S>
where
    Q: QueuePort,
    C: ComputePort,
    S: SlotSequence,
{
    pub fn new(
        queue: Q,
        compute: C,
        sequence: S,
        template: SlotTemplate,
        policy: DispatchPolicy,
        poll_interval: Duration,
        visibility_timeout_secs: u32,
    ) -> Self {
        Self {
            queue,
            compute,
            sequence,
            template,
            policy,
            poll_interval,
            visibility_timeout_secs,
        }
    }

    /// Polls forever with a constant delay between iterations. Errors are
    /// logged and never end the loop.
    pub async fn run_loop(&self) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            visibility_timeout_secs = self.visibility_timeout_secs,
            "orchestrator polling"
        );
        loop {
            match self.poll_once().await {
                Ok(PollOutcome::Idle) => debug!("queue empty"),
                Ok(PollOutcome::Handled { message_id, action }) => {
                    debug!(%message_id, ?action, "iteration complete")
                }
                Err(e) => error!(error = %e, "poll iteration failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Receives at most one message and acts on it.
    pub async fn poll_once(&self) -> Result<PollOutcome, Box<dyn Error + Send + Sync>> {
        let Some(message) = self.queue.receive(self.visibility_timeout_secs).await? else {
            return Ok(PollOutcome::Idle);
        };

        let action = match dispatch::triage(&message, &self.policy) {
            Triage::Skip(action) => {
                self.skip(&message, &action).await;
                action
            }
            Triage::Candidate { blob_name, .. } => self.handle_candidate(&message, blob_name).await?,
        };

        Ok(PollOutcome::Handled {
            message_id: message.message_id,
            action,
        })
    }

    async fn handle_candidate(
        &self,
        message: &QueueMessage,
        blob_name: String,
    ) -> Result<Action, Box<dyn Error + Send + Sync>> {
        let counter = self.sequence.current().await?;
        let spec = self.template.spec_for(counter, &blob_name);
        let status = self.compute.slot_status(&spec.slot_name).await?;

        let action = dispatch::for_slot(blob_name, status);
        match &action {
            Action::Dispatch { blob_name } => {
                self.compute.dispatch(&spec).await?;
                info!(slot = %spec.slot_name, %blob_name, "dispatched transcode slot");
                self.delete(message).await;
            }
            other => self.skip(message, other).await,
        }

        let next = self.sequence.advance().await?;
        debug!(next, "slot counter advanced");
        Ok(action)
    }

    async fn skip(&self, message: &QueueMessage, action: &Action) {
        match action {
            Action::SkipDelete(reason) => {
                info!(message_id = %message.message_id, ?reason, "discarding message");
                self.delete(message).await;
            }
            Action::SkipKeep(reason) => {
                warn!(message_id = %message.message_id, ?reason, "skipping message, it will be redelivered");
            }
            Action::Dispatch { .. } => {}
        }
    }

    /// A failed delete only means the message comes back; the slot check
    /// on redelivery keeps that from dispatching twice.
    async fn delete(&self, message: &QueueMessage) {
        if let Err(e) = self.queue.delete(message).await {
            error!(message_id = %message.message_id, error = %e, "failed to delete message");
        }
    }
}
