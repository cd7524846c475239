use crate::ports::storage::StoragePort;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

/// Content type stored with an uploaded artifact, chosen by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// S3Adapter implements StoragePort for one S3 bucket.
#[derive(Clone)]
pub struct S3Adapter {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3Adapter {
    pub fn new(client: Client, bucket: String) -> Self {
        let public_base_url = match client.config().region() {
            Some(region) => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
            None => format!("https://{}.s3.amazonaws.com", bucket),
        };
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Serve object URLs from a CDN or custom domain instead of the bucket.
    pub fn with_public_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base) = base_url {
            self.public_base_url = base.trim_end_matches('/').to_string();
        }
        self
    }
}

#[async_trait]
impl StoragePort for S3Adapter {
    async fn metadata(
        &self,
        key: &str,
    ) -> Result<HashMap<String, String>, Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        Ok(resp.metadata().cloned().unwrap_or_default())
    }

    async fn download(
        &self,
        key: &str,
        local_path: &Path,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        let mut body = resp.body.into_async_read();
        let mut file = tokio::fs::File::create(local_path).await?;
        tokio::io::copy(&mut body, &mut file).await?;
        Ok(())
    }

    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let byte_stream = ByteStream::from_path(local_path).await?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type_for(local_path))
            .body(byte_stream)
            .send()
            .await?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key.trim_start_matches('/'))
    }
}
