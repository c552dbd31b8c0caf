//! # Storage
//!
//! [`Storage`] is the handle application code talks to. It pairs a provider
//! configuration with the [`strategies::StorageStrategy`] of its platform, so
//! uploads, downloads, deletions and access URLs look the same whether the
//! objects end up in MinIO, S3, Aliyun OSS, Tencent COS, Qiniu Kodo, on local
//! disk or in memory.
//!
//! ```rust,no_run
//! use oss_bridge::{config::{Platform, ProviderConfig}, storage::Storage};
//!
//! # async fn run() -> oss_bridge::storage::StorageResult<()> {
//! let storage = Storage::from_config("mem", ProviderConfig::new(Platform::Memory))?;
//! let uploaded = storage
//!     .upload(&b"hello"[..], "hello.txt", None)
//!     .await?;
//! let url = storage.use_bucket("archive").presigned_url(&uploaded.key).await?;
//! # Ok(())
//! # }
//! ```
use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncSeek};

mod bucket;
mod bulk;
pub mod error;
pub mod key;
pub mod registry;
pub mod sniff;
pub mod strategies;
pub mod stream;

pub use bucket::BucketScope;
pub use error::{StorageError, StorageResult};
pub use registry::{RegistryBuilder, StrategyRegistry};
pub use stream::BytesStream;

use self::strategies::StorageStrategy;
use crate::config::{Platform, ProviderConfig};

/// Lifetime of read URLs when the caller does not pick one.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(3 * 60 * 60);

/// Lifetime of presigned upload URLs.
pub const UPLOAD_URL_EXPIRY: Duration = Duration::from_secs(12 * 60 * 60);

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub filename: String,
    pub suffix: String,
    /// Absent for backends without object versioning.
    pub version_id: Option<String>,
}

/// A key reserved for a client-side upload together with the URL to `PUT`
/// the object to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUploadTicket {
    pub bucket: String,
    pub key: String,
    pub upload_url: String,
}

/// A file received from a client: original name, declared content type and
/// the content itself.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

impl UploadFile {
    #[must_use]
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// An object ready to be served as a download.
#[derive(Debug)]
pub struct Attachment {
    pub filename: String,
    /// Value of the `Content-Disposition` header.
    pub content_disposition: String,
    pub stream: BytesStream,
}

impl Attachment {
    #[must_use]
    pub fn new(filename: impl Into<String>, stream: BytesStream) -> Self {
        let filename = filename.into();
        let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes()).collect();
        Self {
            content_disposition: format!("attachment;filename={encoded}"),
            filename,
            stream,
        }
    }
}

/// A configured storage provider.
///
/// Operations called on the handle itself always target the provider's
/// configured bucket. To target another bucket for a single operation, go
/// through [`Storage::use_bucket`].
#[derive(Clone)]
pub struct Storage {
    name: String,
    config: Arc<ProviderConfig>,
    strategy: Arc<dyn StorageStrategy>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("name", &self.name)
            .field("platform", &self.strategy.platform())
            .field("bucket", &self.config.bucket_name)
            .finish()
    }
}

impl Storage {
    /// Creates a handle over an already constructed strategy.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        config: ProviderConfig,
        strategy: Arc<dyn StorageStrategy>,
    ) -> Self {
        Self {
            name: name.into(),
            config: Arc::new(config),
            strategy,
        }
    }

    /// Creates a handle, building the strategy of the configured platform.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the configuration is incomplete or the
    /// backend client cannot be built.
    pub fn from_config(name: impl Into<String>, config: ProviderConfig) -> StorageResult<Self> {
        let strategy = strategies::create(&config)?;
        Ok(Self::new(name, config, strategy))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.strategy.platform()
    }

    /// Bucket used when no override is given.
    #[must_use]
    pub fn default_bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Targets `bucket` for the next operation only. The returned scope is
    /// consumed by that operation. An empty name keeps the default bucket.
    #[must_use]
    pub fn use_bucket(&self, bucket: impl Into<String>) -> BucketScope<'_> {
        let bucket = bucket.into();
        BucketScope::new(self, (!bucket.is_empty()).then_some(bucket))
    }

    /// Targets the configured bucket, clearing any override.
    #[must_use]
    pub fn use_default_bucket(&self) -> BucketScope<'_> {
        BucketScope::new(self, None)
    }

    /// Checks the media type of the content against the configured
    /// `allow_media_type` prefixes and returns the detected type. Without an
    /// allow-list every media type is accepted.
    ///
    /// The stream is left at the position it had before the call.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IllegalMediaType`] when the detected type is
    /// not allowed, or [`StorageError::UnreadableStream`] when the stream
    /// cannot be inspected.
    pub async fn allow_media_type<R>(&self, reader: &mut R) -> StorageResult<&'static str>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        let allowed = self.config.allow_media_type.as_deref();
        self.allow_media_type_with(reader, |media_type| {
            allowed.map_or(true, |allowed| sniff::is_allowed(media_type, allowed))
        })
        .await
    }

    /// Like [`Storage::allow_media_type`], with `predicate` deciding instead
    /// of the configured allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IllegalMediaType`] when `predicate` rejects the
    /// detected type, or [`StorageError::UnreadableStream`] when the stream
    /// cannot be inspected.
    pub async fn allow_media_type_with<R, F>(
        &self,
        reader: &mut R,
        predicate: F,
    ) -> StorageResult<&'static str>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
        F: Fn(&str) -> bool + Send,
    {
        let media_type = sniff::detect_reader(reader)
            .await
            .map_err(StorageError::UnreadableStream)?;
        if predicate(media_type) {
            Ok(media_type)
        } else {
            tracing::warn!(storage = %self.name, media_type, "media type rejected");
            Err(StorageError::IllegalMediaType(media_type.to_string()))
        }
    }

    /// Reads `reader` to the end and stores it under `object_key`, or under a
    /// generated key carrying the suffix of `filename`.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the stream cannot be read or the backend
    /// rejects the write.
    pub async fn upload<R>(
        &self,
        reader: R,
        filename: &str,
        object_key: Option<&str>,
    ) -> StorageResult<UploadResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.use_default_bucket()
            .upload(reader, filename, object_key)
            .await
    }

    /// Stores a client file under `dir`, named `file_name` or a generated key.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the backend rejects the write.
    pub async fn upload_file(
        &self,
        file: &UploadFile,
        dir: Option<&str>,
        file_name: Option<&str>,
    ) -> StorageResult<UploadResult> {
        self.use_default_bucket()
            .upload_file(file, dir, file_name)
            .await
    }

    /// Opens the object for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ObjectNotFound`] when there is no such object.
    pub async fn download(&self, key: &str) -> StorageResult<BytesStream> {
        self.use_default_bucket().download(key).await
    }

    /// Opens the object for reading, along with its delivery headers.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ObjectNotFound`] when there is no such object.
    pub async fn download_attachment(&self, key: &str) -> StorageResult<Attachment> {
        self.use_default_bucket().download_attachment(key).await
    }

    /// # Errors
    ///
    /// Returns a `StorageError` when the backend cannot answer.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.use_default_bucket().exists(key).await
    }

    /// # Errors
    ///
    /// Returns a `StorageError` when the backend fails the request.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.use_default_bucket().delete(key).await
    }

    /// # Errors
    ///
    /// Returns a `StorageError` when the batch cannot be issued.
    pub async fn delete_many(&self, keys: &[String]) -> StorageResult<bool> {
        self.use_default_bucket().delete_many(keys).await
    }

    /// Read URL valid for [`DEFAULT_URL_EXPIRY`].
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    pub async fn presigned_url(&self, key: &str) -> StorageResult<String> {
        self.use_default_bucket().presigned_url(key).await
    }

    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    pub async fn presigned_url_with_expiry(
        &self,
        key: &str,
        expire: Duration,
    ) -> StorageResult<String> {
        self.use_default_bucket()
            .presigned_url_with_expiry(key, expire)
            .await
    }

    /// Reserves a fresh key for `filename` and signs an upload URL for it,
    /// `None` when the platform has no client-side uploads.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    pub async fn presigned_upload_ticket(
        &self,
        filename: &str,
    ) -> StorageResult<Option<PresignedUploadTicket>> {
        self.use_default_bucket()
            .presigned_upload_ticket(filename)
            .await
    }

    /// Fetches several objects as one download, see [`BucketScope::fetch`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ObjectNotFound`] naming the first missing key.
    pub async fn fetch(&self, keys: &[String]) -> StorageResult<Option<Attachment>> {
        self.use_default_bucket().fetch(keys).await
    }

    pub(crate) fn strategy(&self) -> &Arc<dyn StorageStrategy> {
        &self.strategy
    }
}
