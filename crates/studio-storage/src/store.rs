//! Storage contract.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Write-only view of a public media bucket.
///
/// Uploads return the public URL the object can be fetched from.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str)
        -> StorageResult<String>;

    async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Public URL for `key`; does not check that the object exists.
    fn public_url(&self, key: &str) -> String;

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
