//! Object-store boundary for user media.
//!
//! Database rows reference media by URL and, for newer rows, by object key.
//! [`MediaLocator`] captures both shapes and is resolved to a key in one place.
//! Deletes through this gateway are best-effort: failures are logged and
//! swallowed so that database cleanup always proceeds.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use otogram_common::storage::filesystem::FilesystemObjectStore;
use otogram_common::storage::s3::S3ObjectStore;
use otogram_common::storage::{ObjectKey, ObjectStore, StorageError, StoredObject};
use tracing::{debug, warn};

use crate::config::{StorageBackend, StorageConfig};
use crate::utils::filename::sanitize_filename;

/// Top-level key prefixes used for media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Videos,
    Profiles,
    Thumbnails,
}

impl MediaFolder {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaFolder::Videos => "videos",
            MediaFolder::Profiles => "profiles",
            MediaFolder::Thumbnails => "thumbnails",
        }
    }

    /// Map a `/files/{folder}` path segment. `images` is an alias of `profiles`.
    pub fn from_route_segment(segment: &str) -> Option<Self> {
        match segment {
            "videos" => Some(MediaFolder::Videos),
            "profiles" | "images" => Some(MediaFolder::Profiles),
            "thumbnails" => Some(MediaFolder::Thumbnails),
            _ => None,
        }
    }
}

/// Where a stored media object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocator {
    /// The object key recorded at upload time.
    ByKey(String),
    /// Only a public URL is known; the key is derived from it.
    ByDerivedUrl(String),
}

impl MediaLocator {
    /// Prefer the stored key, fall back to the URL. `None` when neither is set.
    pub fn from_parts(key: Option<&str>, url: Option<&str>) -> Option<Self> {
        match (key, url) {
            (Some(k), _) if !k.trim().is_empty() => Some(MediaLocator::ByKey(k.to_string())),
            (_, Some(u)) if !u.trim().is_empty() => Some(MediaLocator::ByDerivedUrl(u.to_string())),
            _ => None,
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub url: String,
    pub key: ObjectKey,
}

#[derive(Clone)]
pub struct MediaGateway {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl MediaGateway {
    pub fn new(store: Arc<dyn ObjectStore>, public_base_url: &str) -> Self {
        Self {
            store,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the gateway for the configured backend.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let max_size = config.max_video_size.max(config.max_image_size);
        let store: Arc<dyn ObjectStore> = match config.backend {
            StorageBackend::Filesystem => Arc::new(
                FilesystemObjectStore::new(config.filesystem.root.clone(), max_size).await?,
            ),
            StorageBackend::S3 => {
                let settings = config.s3.as_ref().ok_or_else(|| {
                    StorageError::Config("storage.s3 must be set for the s3 backend".into())
                })?;
                Arc::new(S3ObjectStore::new(settings)?)
            }
        };
        Ok(Self::new(store, &config.public_base_url))
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn public_url(&self, key: &ObjectKey) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Build the key `{folder}/{unix-millis}-{sanitized filename}`.
    pub fn key_for(folder: MediaFolder, filename: &str) -> Result<ObjectKey, StorageError> {
        let name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_filename(filename)
        );
        ObjectKey::join(folder.as_str(), &name)
    }

    pub async fn upload(
        &self,
        folder: MediaFolder,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadedMedia, StorageError> {
        let key = Self::key_for(folder, filename)?;
        self.store.put(&key, data, content_type).await?;
        debug!(key = %key, backend = self.backend_name(), "Uploaded media");
        Ok(UploadedMedia {
            url: self.public_url(&key),
            key,
        })
    }

    pub async fn upload_video(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadedMedia, StorageError> {
        self.upload(MediaFolder::Videos, data, filename, content_type)
            .await
    }

    pub async fn upload_image(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
        folder: MediaFolder,
    ) -> Result<UploadedMedia, StorageError> {
        self.upload(folder, data, filename, content_type).await
    }

    pub async fn fetch(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        self.store.get(key).await
    }

    /// Resolve a locator to an object key.
    ///
    /// URLs outside the public base (e.g. the default avatar) resolve to `None`.
    pub fn resolve(&self, locator: &MediaLocator) -> Option<ObjectKey> {
        match locator {
            MediaLocator::ByKey(key) => ObjectKey::parse(key).ok(),
            MediaLocator::ByDerivedUrl(url) => {
                let rest = url.strip_prefix(&self.public_base_url)?;
                let key = rest.strip_prefix('/')?;
                let key = key.split(['?', '#']).next().unwrap_or(key);
                ObjectKey::parse(key).ok()
            }
        }
    }

    /// Delete the object behind `locator`, never failing.
    ///
    /// Returns `true` if a delete call reached the store and succeeded.
    pub async fn delete_best_effort(&self, locator: &MediaLocator) -> bool {
        let Some(key) = self.resolve(locator) else {
            warn!(?locator, "Skipping media delete: locator does not resolve to an object key");
            return false;
        };

        match self.store.delete(&key).await {
            Ok(existed) => {
                debug!(key = %key, existed, "Deleted media object");
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Best-effort media delete failed; object may be orphaned");
                false
            }
        }
    }

    /// [`Self::delete_best_effort`] for optional locators.
    pub async fn delete_optional(&self, locator: Option<MediaLocator>) -> bool {
        match locator {
            Some(locator) => self.delete_best_effort(&locator).await,
            None => false,
        }
    }
}
