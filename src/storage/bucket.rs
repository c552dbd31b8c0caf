//! # Bucket Scope
//!
//! A [`BucketScope`] carries an optional bucket override for exactly one
//! storage operation. Every operation takes the scope by value, so an
//! override cannot leak into a later call or into another task: it is an
//! ordinary local value owned by whoever asked for it.
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek};
use tracing::debug;

use super::{
    bulk, key, sniff, Attachment, BytesStream, PresignedUploadTicket, Storage, StorageError,
    StorageResult, UploadFile, UploadResult, DEFAULT_URL_EXPIRY, UPLOAD_URL_EXPIRY,
};

#[derive(Debug)]
#[must_use = "a bucket scope does nothing until an operation is called on it"]
pub struct BucketScope<'a> {
    storage: &'a Storage,
    bucket: Option<String>,
}

impl<'a> BucketScope<'a> {
    pub(super) fn new(storage: &'a Storage, bucket: Option<String>) -> Self {
        Self { storage, bucket }
    }

    /// The bucket the operation will target.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.bucket
            .as_deref()
            .unwrap_or_else(|| self.storage.default_bucket())
    }

    /// Runs the configured media type gate, keeping the scope for the upload
    /// that follows.
    ///
    /// # Errors
    ///
    /// See [`Storage::allow_media_type`].
    pub async fn allow_media_type<R>(self, reader: &mut R) -> StorageResult<Self>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        self.storage.allow_media_type(reader).await?;
        Ok(self)
    }

    /// Runs the media type gate with a caller predicate, keeping the scope.
    ///
    /// # Errors
    ///
    /// See [`Storage::allow_media_type_with`].
    pub async fn allow_media_type_with<R, F>(
        self,
        reader: &mut R,
        predicate: F,
    ) -> StorageResult<Self>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
        F: Fn(&str) -> bool + Send,
    {
        self.storage.allow_media_type_with(reader, predicate).await?;
        Ok(self)
    }

    /// See [`Storage::upload`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnreadableStream`] when the stream fails, or
    /// the backend error when the write is rejected.
    pub async fn upload<R>(
        self,
        mut reader: R,
        filename: &str,
        object_key: Option<&str>,
    ) -> StorageResult<UploadResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .await
            .map_err(StorageError::UnreadableStream)?;

        let suffix = key::suffix_of(filename);
        let object_key = key::resolve(suffix, object_key);
        self.put(object_key, filename, suffix, Bytes::from(content))
            .await
    }

    /// See [`Storage::upload_file`].
    ///
    /// # Errors
    ///
    /// Returns the backend error when the write is rejected.
    pub async fn upload_file(
        self,
        file: &UploadFile,
        dir: Option<&str>,
        file_name: Option<&str>,
    ) -> StorageResult<UploadResult> {
        let suffix = match file.content_type.as_deref().and_then(sniff::extension_for) {
            Some(extension) => extension,
            None => key::suffix_of(&file.filename),
        };
        let object_key = key::with_dir(dir, key::resolve(suffix, file_name));
        self.put(object_key, &file.filename, suffix, file.content.clone())
            .await
    }

    async fn put(
        self,
        object_key: String,
        filename: &str,
        suffix: &str,
        content: Bytes,
    ) -> StorageResult<UploadResult> {
        let strategy = self.storage.strategy();
        let bucket = self.bucket();
        let response = strategy
            .upload(bucket, key::normalize(&object_key), content)
            .await?;

        Ok(UploadResult {
            bucket: strategy.bucket_label(bucket),
            key: object_key,
            filename: filename.to_string(),
            suffix: suffix.to_string(),
            version_id: response.version,
        })
    }

    /// See [`Storage::download`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ObjectNotFound`] when there is no such object.
    pub async fn download(self, key: &str) -> StorageResult<BytesStream> {
        let bucket = self.bucket();
        debug!(storage = self.storage.name(), bucket, key, "download");
        self.storage
            .strategy()
            .download(bucket, key::normalize(key))
            .await?
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
    }

    /// See [`Storage::download_attachment`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ObjectNotFound`] when there is no such object.
    pub async fn download_attachment(self, key: &str) -> StorageResult<Attachment> {
        let stream = self.download(key).await?;
        Ok(Attachment::new(key, stream))
    }

    /// # Errors
    ///
    /// Returns a `StorageError` when the backend cannot answer.
    pub async fn exists(self, key: &str) -> StorageResult<bool> {
        self.storage
            .strategy()
            .exists(self.bucket(), key::normalize(key))
            .await
    }

    /// # Errors
    ///
    /// Returns a `StorageError` when the backend fails the request.
    pub async fn delete(self, key: &str) -> StorageResult<bool> {
        self.storage
            .strategy()
            .delete(self.bucket(), key::normalize(key))
            .await
    }

    /// Deletes a batch of keys. An empty batch is refused with `false`
    /// without reaching the backend. Otherwise the flag only tells whether
    /// the batch was accepted, per-key outcomes are logged.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when the batch cannot be issued.
    pub async fn delete_many(self, keys: &[String]) -> StorageResult<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        let keys = keys
            .iter()
            .map(|k| key::normalize(k).to_string())
            .collect::<Vec<_>>();
        self.storage
            .strategy()
            .delete_many(self.bucket(), &keys)
            .await
    }

    /// Read URL valid for [`DEFAULT_URL_EXPIRY`].
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    pub async fn presigned_url(self, key: &str) -> StorageResult<String> {
        self.presigned_url_with_expiry(key, DEFAULT_URL_EXPIRY)
            .await
    }

    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    pub async fn presigned_url_with_expiry(
        self,
        key: &str,
        expire: Duration,
    ) -> StorageResult<String> {
        self.storage
            .strategy()
            .presigned_url(self.bucket(), key::normalize(key), expire)
            .await
    }

    /// See [`Storage::presigned_upload_ticket`]. The URL is valid for
    /// [`UPLOAD_URL_EXPIRY`].
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when signing fails.
    pub async fn presigned_upload_ticket(
        self,
        filename: &str,
    ) -> StorageResult<Option<PresignedUploadTicket>> {
        let strategy = self.storage.strategy();
        let bucket = self.bucket();
        let object_key = key::generate(key::suffix_of(filename));

        let upload_url = strategy
            .presigned_upload_url(bucket, key::normalize(&object_key), UPLOAD_URL_EXPIRY)
            .await?;

        Ok(upload_url.map(|upload_url| PresignedUploadTicket {
            bucket: strategy.bucket_label(bucket),
            key: object_key,
            upload_url,
        }))
    }

    /// Fetches several objects as one download.
    ///
    /// * no keys: `None`
    /// * one key: the object itself, named after its key
    /// * more keys: a zip archive named `download.zip`, one entry per key in
    ///   the given order, streamed while it is being built
    ///
    /// Every key is resolved against the same bucket. All keys are checked
    /// before the archive is started, so a missing key fails the call instead
    /// of truncating the archive.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ObjectNotFound`] naming the first missing key.
    pub async fn fetch(self, keys: &[String]) -> StorageResult<Option<Attachment>> {
        match keys {
            [] => Ok(None),
            [key] => self.download_attachment(key).await.map(Some),
            _ => {
                let bucket = self.bucket().to_string();
                bulk::archive(self.storage.strategy().clone(), bucket, keys.to_vec())
                    .await
                    .map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Platform, ProviderConfig};

    fn memory() -> Storage {
        Storage::from_config(
            "mem",
            ProviderConfig {
                bucket_name: "primary".to_string(),
                ..ProviderConfig::new(Platform::Memory)
            },
        )
        .unwrap()
    }

    #[test]
    fn scope_resolves_bucket() {
        let storage = memory();
        assert_eq!(storage.use_bucket("other").bucket(), "other");
        assert_eq!(storage.use_bucket("").bucket(), "primary");
        assert_eq!(storage.use_default_bucket().bucket(), "primary");
    }

    #[tokio::test]
    async fn override_applies_to_one_operation() {
        let storage = memory();

        let uploaded = storage
            .use_bucket("other")
            .upload(&b"x"[..], "x.txt", Some("x.txt"))
            .await
            .unwrap();
        assert_eq!(uploaded.bucket, "other");

        // the next call goes back to the default bucket
        assert!(!storage.exists("x.txt").await.unwrap());
        assert!(storage.use_bucket("other").exists("x.txt").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_overrides_are_isolated() {
        let storage = Arc::new(memory());

        let tasks = ["left", "right"].map(|bucket| {
            let storage = storage.clone();
            tokio::spawn(async move {
                let mut results = Vec::new();
                for i in 0..20 {
                    let uploaded = storage
                        .use_bucket(bucket)
                        .upload(&b"x"[..], "x.bin", Some(&format!("{bucket}-{i}")))
                        .await
                        .unwrap();
                    results.push(uploaded.bucket);
                    tokio::task::yield_now().await;
                }
                (bucket, results)
            })
        });

        for task in tasks {
            let (bucket, results) = task.await.unwrap();
            assert!(results.iter().all(|b| b == bucket));
        }

        let afterwards = storage
            .upload(&b"x"[..], "x.bin", Some("after"))
            .await
            .unwrap();
        assert_eq!(afterwards.bucket, "primary");
    }

    #[tokio::test]
    async fn media_gate_keeps_scope() {
        let storage = memory();
        let mut reader = std::io::Cursor::new(b"plain text".to_vec());

        let scope = storage
            .use_bucket("docs")
            .allow_media_type(&mut reader)
            .await
            .unwrap();
        assert_eq!(scope.bucket(), "docs");

        let uploaded = scope.upload(&mut reader, "a.txt", None).await.unwrap();
        assert_eq!(uploaded.bucket, "docs");
        assert_eq!(
            storage
                .use_bucket("docs")
                .download(&uploaded.key)
                .await
                .unwrap()
                .collect()
                .await
                .unwrap(),
            Bytes::from_static(b"plain text")
        );
    }
}
