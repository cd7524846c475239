//! AWS-backed adapters: object storage, the upload event queue and the job tables.

#[cfg(feature = "receiver")]
pub mod dynamodb;
#[cfg(feature = "worker")]
pub mod s3;
#[cfg(feature = "orchestrator")]
pub mod sqs;
