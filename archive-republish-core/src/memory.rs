use crate::contract::{DestinationReference, ObjectStore, SourceReference};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub media_type: String,
}

/// In-memory object store.
///
/// Objects live in a BTreeMap keyed by (bucket, key), which gives deterministic listing
/// order. Clones share the same map, so a test can keep one clone for assertions while
/// the pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    objects: Arc<RwLock<BTreeMap<(String, String), StoredObject>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace an object.
    pub async fn put(&self, bucket: &str, key: &str, data: Vec<u8>, media_type: &str) {
        let mut objects = self.objects.write().await;
        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                media_type: media_type.to_string(),
            },
        );
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let objects = self.objects.read().await;
        objects.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    /// Keys in `bucket`, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let objects = self.objects.read().await;
        objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

fn validate(bucket: &str, key: &str) -> Result<(), StoreError> {
    if bucket.is_empty() {
        return Err(StoreError::NotFound("bucket must be non-empty".into()));
    }
    if key.is_empty() {
        return Err(StoreError::NotFound("key must be non-empty".into()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn download(
        &self,
        source: &SourceReference,
        destination: &Path,
    ) -> Result<(), StoreError> {
        validate(&source.bucket, &source.key)?;
        let object = self
            .get(&source.bucket, &source.key)
            .await
            .ok_or_else(|| StoreError::NotFound(source.to_string()))?;
        tokio::fs::write(destination, &object.data)
            .await
            .map_err(|e| StoreError::Transient(format!("writing {}: {e}", destination.display())))
    }

    async fn upload(
        &self,
        content: Vec<u8>,
        destination: &DestinationReference,
    ) -> Result<(), StoreError> {
        validate(&destination.bucket, &destination.key)?;
        self.put(
            &destination.bucket,
            &destination.key,
            content,
            &destination.media_type,
        )
        .await;
        Ok(())
    }
}
