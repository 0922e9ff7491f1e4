use async_trait::async_trait;
use bytes::Bytes;

use super::error::StorageError;
use super::key::ObjectKey;

/// An object read back from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    /// MIME type recorded at upload time, if the backend kept one.
    pub content_type: Option<String>,
}

/// Key-addressed object storage (a bucket).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `key`, replacing any existing object.
    async fn put(
        &self,
        key: &ObjectKey,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Retrieve an object.
    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Short backend name reported by health checks.
    fn backend_name(&self) -> &'static str;
}
