//! Orchestrator Binary
//!
//! Long-running poller: reads upload events from the queue and dispatches one
//! transcode slot per accepted upload.
//!
//! Environment Variables:
//! - QUEUE_URL: upload event queue
//! - CONTAINER_GROUP_NAME / CONTAINER_NAME / CONTAINER_IMAGE: slot naming and image
//! - BUCKET_NAME / OUTPUT_VIDEO_BUCKET: source and rendition buckets
//! - WEBHOOK_UPLOADSTATUS_URL: status callback handed to each worker
//! - SUBSCRIPTION_ID / AZURE_RESOURCE_GROUP / AZURE_TENANT_ID / AZURE_CLIENT_ID / AZURE_CLIENT_SECRET
//! - REDIS_URL (optional): durable slot counter

use ladder::adapters::aws::sqs::SqsAdapter;
use ladder::adapters::http::container_groups::{ContainerGroupsAdapter, ServicePrincipal};
use ladder::adapters::memory::MemorySequence;
use ladder::adapters::redis::{RedisPool, RedisSlotSequence};
use ladder::application::orchestrator::{OrchestratorService, SlotTemplate};
use ladder::domain::dispatch::DispatchPolicy;
use ladder::ports::sequence::SlotSequence;
use ladder::OrchestratorConfig;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const LEASE_MARGIN: Duration = Duration::from_secs(15);

async fn run<S: SlotSequence>(
    config: &OrchestratorConfig,
    queue: SqsAdapter,
    compute: ContainerGroupsAdapter,
    sequence: S,
) {
    let orchestrator = OrchestratorService::new(
        queue,
        compute,
        sequence,
        SlotTemplate::from_config(config),
        DispatchPolicy {
            discard_foreign_events: config.discard_foreign_events,
        },
        Duration::from_secs(config.poll_interval_secs),
        config.visibility_timeout_secs,
    );

    tokio::select! {
        _ = orchestrator.run_loop() => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match OrchestratorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let queue = SqsAdapter::new(aws_sdk_sqs::Client::new(&aws), config.queue_url.clone());

    let principal = ServicePrincipal {
        tenant_id: config.tenant_id.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
    };
    // Leave the rest of the lease for the status check and the delete.
    let provisioning_timeout = Duration::from_secs(u64::from(config.visibility_timeout_secs))
        .saturating_sub(LEASE_MARGIN);
    let compute = match ContainerGroupsAdapter::new(
        principal,
        config.subscription_id.clone(),
        config.resource_group.clone(),
    ) {
        Ok(compute) => compute.with_provisioning_timeout(provisioning_timeout),
        Err(e) => {
            error!(error = %e, "failed to build compute client");
            return ExitCode::FAILURE;
        }
    };

    match &config.redis_url {
        Some(url) => {
            let pool = match RedisPool::new(url) {
                Ok(pool) => pool,
                Err(e) => {
                    error!(error = %e, "failed to create redis pool");
                    return ExitCode::FAILURE;
                }
            };
            let sequence = RedisSlotSequence::new(pool, config.slot_counter_start);
            run(&config, queue, compute, sequence).await;
        }
        None => {
            warn!("REDIS_URL not set, slot numbering restarts with the process");
            let sequence = MemorySequence::new(config.slot_counter_start);
            run(&config, queue, compute, sequence).await;
        }
    }

    ExitCode::SUCCESS
}
