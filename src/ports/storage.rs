use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

/// One bucket of the artifact store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// User metadata stored alongside a blob
    async fn metadata(
        &self,
        key: &str,
    ) -> Result<HashMap<String, String>, Box<dyn Error + Send + Sync>>;

    /// Download a file from storage to a local path
    async fn download(
        &self,
        key: &str,
        local_path: &Path,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Upload a file from a local path to storage
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Public URL of a stored object
    fn object_url(&self, key: &str) -> String;
}
