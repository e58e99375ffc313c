//! Cloudflare R2 bucket behind the S3 API.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

/// Where rendered media is published.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// S3 API endpoint of the account
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// "auto" unless the account pins a jurisdiction
    pub region: String,
    /// Custom domain or r2.dev URL that serves the bucket
    pub public_base_url: String,
}

fn required(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::missing_var(name))
}

impl R2Config {
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: required("R2_ENDPOINT_URL")?,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: required("R2_PUBLIC_URL")?,
        })
    }
}

/// Publishes generated audio, video and images to a public R2 bucket.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl R2Client {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "studio-r2",
        );
        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    async fn put(&self, key: &str, body: ByteStream, content_type: &str) -> StorageResult<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::publish(key, e))?;
        Ok(self.public_url(key))
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::publish(key, e))?;
        let url = self.put(key, body, content_type).await?;
        info!(key, source = %path.display(), "Published media file");
        Ok(url)
    }

    async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        debug!(key, bytes = data.len(), "Publishing media bytes");
        self.put(key, ByteStream::from(data), content_type).await
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    async fn ping(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(public_base_url: &str) -> R2Config {
        R2Config {
            endpoint_url: "https://account.r2.cloudflarestorage.com".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "media".to_string(),
            region: "auto".to_string(),
            public_base_url: public_base_url.to_string(),
        }
    }

    #[test]
    fn test_public_url_ignores_trailing_slash() {
        let client = R2Client::new(config("https://media.example.com/"));
        assert_eq!(
            client.public_url("org/video/o1/final.mp4"),
            "https://media.example.com/org/video/o1/final.mp4"
        );
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        assert!(!StorageError::missing_var("R2_BUCKET_NAME").is_retryable());
        assert!(StorageError::publish("k", "503").is_retryable());
    }
}
