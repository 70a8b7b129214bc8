use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};

const PUBLIC_HOST: &str = "https://storage.googleapis.com";

/// Google Cloud Storage implementation
///
/// Credentials are resolved by `object_store` from the environment
/// (`GOOGLE_APPLICATION_CREDENTIALS`, or the instance metadata server on Cloud Run).
#[derive(Clone)]
pub struct GcsStorage {
    store: GoogleCloudStorage,
    bucket: String,
}

impl GcsStorage {
    pub fn new(bucket: String) -> StorageResult<Self> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket.clone())
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(GcsStorage { store, bucket })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Public URL format: `https://storage.googleapis.com/{bucket}/{key}`
pub fn gcs_public_url(bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", PUBLIC_HOST, bucket, key)
}

#[async_trait]
impl Storage for GcsStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let mut opts = PutOptions::default();
        opts.attributes = attributes;

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(Bytes::from(data)), opts)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GCS upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.public_url(storage_key);

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        Ok(url)
    }

    fn public_url(&self, storage_key: &str) -> String {
        gcs_public_url(&self.bucket, storage_key)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}
