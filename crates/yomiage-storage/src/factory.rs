#[cfg(feature = "storage-gcs")]
use crate::GcsStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use yomiage_core::Config;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-gcs")]
        StorageBackend::Gcs => {
            let bucket = config.gcs_bucket().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("GCS_BUCKET not configured".to_string())
            })?;

            let storage = GcsStorage::new(bucket)?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-gcs"))]
        StorageBackend::Gcs => Err(StorageError::ConfigError(
            "GCS storage backend not available (storage-gcs feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config
                .local_storage_path()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
                })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
                })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
