//! # Storage Strategies
//!
//! One [`StorageStrategy`] implementation per backend. The caller-facing
//! [`crate::storage::Storage`] resolves the bucket and the object key and then
//! hands both to the strategy, so a strategy only translates the uniform
//! contract into its backend's client calls.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

#[cfg(feature = "storage_remote")]
pub mod aliyun;
#[cfg(feature = "storage_remote")]
pub mod aws_s3;
pub mod local;
pub mod mem;
#[cfg(feature = "storage_remote")]
pub mod minio;
pub mod opendal_adapter;
#[cfg(feature = "storage_remote")]
pub mod qiniu_kodo;
#[cfg(feature = "storage_remote")]
pub mod tencent_cos;

use super::{stream::BytesStream, StorageError, StorageResult};
use crate::config::{Platform, ProviderConfig};

#[derive(Debug, Default)]
pub struct UploadResponse {
    /// Version assigned by a backend with object versioning.
    pub version: Option<String>,
}

#[async_trait]
pub trait StorageStrategy: Sync + Send {
    /// The backend this strategy talks to.
    fn platform(&self) -> Platform;

    /// Writes `content` under `key` in `bucket`.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the backend rejects the write.
    async fn upload(&self, bucket: &str, key: &str, content: Bytes)
        -> StorageResult<UploadResponse>;

    /// Opens the object for reading, `None` when the backend has no such
    /// object.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` for any failure other than a missing object.
    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Option<BytesStream>>;

    /// Checks whether the object exists.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the backend cannot answer.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Deletes one object, returning whether the deletion was accepted.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the backend fails the request.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Deletes a batch of objects. Outcomes of individual keys are logged,
    /// the returned flag only tells whether the batch was accepted.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the batch cannot be issued at all.
    async fn delete_many(&self, bucket: &str, keys: &[String]) -> StorageResult<bool>;

    /// A URL granting read access to the object for `expire`.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    async fn presigned_url(&self, bucket: &str, key: &str, expire: Duration)
        -> StorageResult<String>;

    /// A URL the caller can `PUT` the object to, `None` when the backend
    /// has no client-side upload signing.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    async fn presigned_upload_url(
        &self,
        bucket: &str,
        key: &str,
        expire: Duration,
    ) -> StorageResult<Option<String>>;

    /// How `bucket` is reported back to callers in upload results.
    fn bucket_label(&self, bucket: &str) -> String {
        bucket.to_string()
    }
}

/// Builds the strategy matching the provider's platform.
///
/// # Errors
///
/// Returns a `StorageError` when the configuration is incomplete for the
/// platform or the backend client cannot be constructed.
pub fn create(config: &ProviderConfig) -> StorageResult<Arc<dyn StorageStrategy>> {
    config.validate()?;

    let strategy: Arc<dyn StorageStrategy> = match config.platform {
        Platform::Local => Arc::new(local::LocalStrategy::new(config)?),
        Platform::Memory => Arc::new(mem::new()?),
        #[cfg(feature = "storage_remote")]
        Platform::Minio => Arc::new(minio::new(config)?),
        #[cfg(feature = "storage_remote")]
        Platform::AwsS3 => Arc::new(aws_s3::new(config)?),
        #[cfg(feature = "storage_remote")]
        Platform::Aliyun => Arc::new(aliyun::new(config)?),
        #[cfg(feature = "storage_remote")]
        Platform::TencentCos => Arc::new(tencent_cos::new(config)?),
        #[cfg(feature = "storage_remote")]
        Platform::QiniuKodo => Arc::new(qiniu_kodo::new(config)?),

        #[allow(unreachable_patterns)]
        platform => {
            return Err(StorageError::configuration(format!(
                "platform `{platform}` was not compiled in, enable the `storage_remote` feature"
            )))
        }
    };

    Ok(strategy)
}
