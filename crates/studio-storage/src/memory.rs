//! Bucket held in memory.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageResult;
use crate::store::ObjectStore;

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-memory [`ObjectStore`] for tests and single-process runs.
pub struct MemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://media")
    }
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(path).await?;
        self.upload_bytes(data, key, content_type).await
    }

    async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let store = MemoryObjectStore::new("https://media.example.com");
        let url = store
            .upload_bytes(b"abc".to_vec(), "org/audio/out/a.mp3", "audio/mpeg")
            .await
            .unwrap();

        assert_eq!(url, "https://media.example.com/org/audio/out/a.mp3");
        let object = store.get("org/audio/out/a.mp3").await.unwrap();
        assert_eq!(object.data, b"abc");
        assert_eq!(object.content_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_upload_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, b"video").await.unwrap();

        let store = MemoryObjectStore::default();
        store
            .upload_file(&path, "org/video/out/final.mp4", "video/mp4")
            .await
            .unwrap();
        assert_eq!(store.keys().await, vec!["org/video/out/final.mp4"]);
    }

    #[tokio::test]
    async fn test_reupload_replaces_object() {
        let store = MemoryObjectStore::default();
        store
            .upload_bytes(b"v1".to_vec(), "org/image/a/thumbnail.png", "image/png")
            .await
            .unwrap();
        store
            .upload_bytes(b"v2".to_vec(), "org/image/a/thumbnail.png", "image/png")
            .await
            .unwrap();
        let object = store.get("org/image/a/thumbnail.png").await.unwrap();
        assert_eq!(object.data, b"v2");
        assert_eq!(store.keys().await.len(), 1);
    }
}
