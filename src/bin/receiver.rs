//! Receiver Binary
//!
//! HTTP server for worker status callbacks. Persists the terminal status and
//! notifies the owning user over Redis pub/sub.
//!
//! Environment Variables:
//! - ADDR / PORT: bind address (default 0.0.0.0:8000)
//! - JOBS_TABLE / NOTIFICATIONS_TABLE: DynamoDB tables
//! - REDIS_URL: real-time channel

use ladder::adapters::aws::dynamodb::DynamoAdapter;
use ladder::adapters::http::routes::router;
use ladder::adapters::redis::RedisPool;
use ladder::application::receiver::StatusReceiver;
use ladder::ReceiverConfig;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ReceiverConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let tables = DynamoAdapter::new(
        aws_sdk_dynamodb::Client::new(&aws),
        config.jobs_table.clone(),
        config.notifications_table.clone(),
    );
    let realtime = match RedisPool::new(&config.redis_url) {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "failed to create redis pool");
            return ExitCode::FAILURE;
        }
    };

    let receiver = Arc::new(StatusReceiver::new(tables.clone(), tables, realtime));
    let app = router(receiver);

    let addr = format!("{}:{}", config.addr, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(%addr, "receiver listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
