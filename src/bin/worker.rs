//! Worker Binary
//!
//! Runs once inside a compute slot: transcodes `INPUT_VIDEO` into the HLS
//! ladder and reports the outcome to `WEBHOOK_URL`. Exits non-zero only when
//! configuration is invalid or the callback cannot be reached, so the compute
//! layer restarts the slot. Any HTTP answer from the callback, error statuses
//! included, ends the run with success.
//!
//! Environment Variables:
//! - BUCKET_NAME: source bucket
//! - INPUT_VIDEO: source blob name
//! - OUTPUT_VIDEO_BUCKET: rendition bucket
//! - WEBHOOK_URL: status callback
//! - PUBLIC_BASE_URL, WORK_DIR, FFMPEG_PATH (optional)

use ladder::adapters::aws::s3::S3Adapter;
use ladder::adapters::http::reporter::HttpReporter;
use ladder::application::worker::WorkerService;
use ladder::av::encoder::FfmpegExecutor;
use ladder::domain::rendition::default_ladder;
use ladder::WorkerConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws);
    let source = S3Adapter::new(s3_client.clone(), config.source_bucket.clone());
    let output = S3Adapter::new(s3_client, config.output_bucket.clone())
        .with_public_base_url(config.public_base_url.clone());

    let reporter = match HttpReporter::new(config.callback_url.clone()) {
        Ok(reporter) => reporter,
        Err(e) => {
            error!(error = %e, "failed to build callback client");
            return ExitCode::FAILURE;
        }
    };

    let worker = WorkerService::new(
        source,
        output,
        reporter,
        Arc::new(FfmpegExecutor::new(config.ffmpeg_path.clone())),
        default_ladder(),
    )
    .with_work_dir(config.work_dir.as_ref().map(PathBuf::from));

    info!(input = %config.input_video, "worker started");

    match worker.run(&config.input_video).await {
        Ok(report) => {
            info!(success = report.success, message = %report.message, "run finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "worker failed");
            ExitCode::FAILURE
        }
    }
}
