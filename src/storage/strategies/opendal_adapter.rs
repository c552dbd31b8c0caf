use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use moka::sync::Cache;
use opendal::{layers::TimeoutLayer, ErrorKind, Operator};
use tracing::{debug, info, warn};

use super::{StorageStrategy, UploadResponse};
use crate::config::Platform;
use crate::storage::{stream::BytesStream, StorageError, StorageResult};

/// Builds the backend client bound to one bucket.
pub type OperatorFactory = Box<dyn Fn(&str) -> opendal::Result<Operator> + Send + Sync>;

/// How read URLs are produced.
#[derive(Debug, Clone)]
pub enum ReadUrl {
    /// Signed by the backend, valid for the requested duration.
    Presign,
    /// Unsigned `<domain>/<key>` for publicly readable buckets.
    PublicDomain(String),
    /// The bare key, for backends that have no URL scheme of their own.
    Key,
}

#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Applied to every operation of remote backends.
    pub timeout: Option<Duration>,
    pub read_url: ReadUrl,
    /// Whether the backend can sign client-side `PUT` uploads.
    pub presign_upload: bool,
}

/// A [`StorageStrategy`] over `OpenDAL` operators.
///
/// An operator is bound to a single bucket, so one is built per bucket on
/// first use and kept for the lifetime of the strategy. The default bucket's
/// operator is built up front, which surfaces configuration mistakes at
/// startup.
pub struct OpendalAdapter {
    platform: Platform,
    factory: OperatorFactory,
    operators: Cache<String, Operator>,
    options: AdapterOptions,
}

impl OpendalAdapter {
    /// Constructor for creating a new adapter.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the operator for `default_bucket` cannot
    /// be built.
    pub fn new(
        platform: Platform,
        default_bucket: &str,
        factory: OperatorFactory,
        options: AdapterOptions,
    ) -> StorageResult<Self> {
        let adapter = Self {
            platform,
            factory,
            operators: Cache::builder().build(),
            options,
        };
        adapter.operator(default_bucket)?;
        Ok(adapter)
    }

    fn operator(&self, bucket: &str) -> StorageResult<Operator> {
        self.operators
            .try_get_with(bucket.to_string(), || {
                let op = (self.factory)(bucket)?;
                Ok::<_, opendal::Error>(match self.options.timeout {
                    Some(timeout) => op.layer(TimeoutLayer::new().with_timeout(timeout)),
                    None => op,
                })
            })
            .map_err(|err| {
                StorageError::configuration(format!(
                    "cannot build {} client for bucket `{bucket}`: {err}",
                    self.platform
                ))
            })
    }
}

#[async_trait]
impl StorageStrategy for OpendalAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
    ) -> StorageResult<UploadResponse> {
        let size = content.len();
        let meta = self.operator(bucket)?.write(key, content).await?;
        debug!(platform = %self.platform, bucket, key, size, "object written");
        Ok(UploadResponse {
            version: meta.version().map(std::string::ToString::to_string),
        })
    }

    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Option<BytesStream>> {
        let op = self.operator(bucket)?;
        match op.stat(key).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        }
        let reader = op.reader(key).await?;
        Ok(Some(BytesStream::from_reader(reader).await?))
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.operator(bucket)?.exists(key).await?)
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.operator(bucket)?.delete(key).await?;
        Ok(true)
    }

    async fn delete_many(&self, bucket: &str, keys: &[String]) -> StorageResult<bool> {
        let op = self.operator(bucket)?;
        // batched per the backend's delete limits, one-by-one where unsupported
        let mut deleter = op.deleter().await?;
        for key in keys {
            deleter.delete(key.as_str()).await?;
        }
        match deleter.close().await {
            Ok(()) => {
                info!(platform = %self.platform, bucket, count = keys.len(), "objects deleted");
                Ok(true)
            }
            Err(err) => {
                warn!(platform = %self.platform, bucket, count = keys.len(), error = %err, "batch delete failed");
                Err(err.into())
            }
        }
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expire: Duration,
    ) -> StorageResult<String> {
        match &self.options.read_url {
            ReadUrl::Presign => {
                let req = self.operator(bucket)?.presign_read(key, expire).await?;
                Ok(req.uri().to_string())
            }
            ReadUrl::PublicDomain(domain) => {
                Ok(format!("{}/{key}", domain.trim_end_matches('/')))
            }
            ReadUrl::Key => Ok(key.to_string()),
        }
    }

    async fn presigned_upload_url(
        &self,
        bucket: &str,
        key: &str,
        expire: Duration,
    ) -> StorageResult<Option<String>> {
        if !self.options.presign_upload {
            return Ok(None);
        }
        let req = self.operator(bucket)?.presign_write(key, expire).await?;
        Ok(Some(req.uri().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use opendal::services::Memory;

    use super::*;

    fn memory() -> OpendalAdapter {
        OpendalAdapter::new(
            Platform::Memory,
            "primary",
            Box::new(|_bucket: &str| -> opendal::Result<Operator> {
                Ok(Operator::new(Memory::default())?.finish())
            }),
            AdapterOptions {
                timeout: None,
                read_url: ReadUrl::Key,
                presign_upload: false,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn batch_delete_removes_every_listed_key() {
        let adapter = memory();
        for key in ["a", "b", "keep"] {
            adapter
                .upload("primary", key, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let keys = vec!["a".to_string(), "b".to_string(), "never-existed".to_string()];
        assert!(adapter.delete_many("primary", &keys).await.unwrap());

        assert!(!adapter.exists("primary", "a").await.unwrap());
        assert!(!adapter.exists("primary", "b").await.unwrap());
        assert!(adapter.exists("primary", "keep").await.unwrap());
    }

    #[tokio::test]
    async fn buckets_get_their_own_operator() {
        let adapter = memory();
        adapter
            .upload("other", "a", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(adapter.exists("other", "a").await.unwrap());
        assert!(!adapter.exists("primary", "a").await.unwrap());
    }

    #[tokio::test]
    async fn public_domain_urls_are_unsigned() {
        let adapter = OpendalAdapter {
            options: AdapterOptions {
                timeout: None,
                read_url: ReadUrl::PublicDomain("https://cdn.example.com/".to_string()),
                presign_upload: false,
            },
            ..memory()
        };

        assert_eq!(
            adapter
                .presigned_url("primary", "a/b.png", Duration::from_secs(60))
                .await
                .unwrap(),
            "https://cdn.example.com/a/b.png"
        );
    }
}
