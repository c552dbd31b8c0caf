//! # Local Disk
//!
//! Objects live at `<local_file_path>/<key>`. Buckets do not exist on disk,
//! the bucket argument of every operation is ignored and results report the
//! public base URL in its place.
use std::{
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{StorageStrategy, UploadResponse};
use crate::{
    config::{Platform, ProviderConfig},
    storage::{stream::BytesStream, StorageError, StorageResult},
};

#[derive(Debug, Clone)]
pub struct LocalStrategy {
    root: PathBuf,
    base_url: Option<String>,
}

impl LocalStrategy {
    /// Constructor for creating a new local strategy.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` when `local_file_path` is not configured.
    pub fn new(config: &ProviderConfig) -> StorageResult<Self> {
        let root = config
            .local_file_path
            .clone()
            .ok_or_else(|| StorageError::configuration("local platform requires `local_file_path`"))?;
        Ok(Self::with_root(root, config.local_file_url.clone()))
    }

    /// Strategy rooted at `root`, serving read URLs under `base_url`.
    pub fn with_root(root: impl Into<PathBuf>, base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Maps a key onto a path below the root. Keys that would leave the
    /// root (absolute paths, `..`, drive prefixes) are refused.
    fn path_of(&self, key: &str) -> StorageResult<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::local_io(
                        key,
                        io::Error::new(ErrorKind::InvalidInput, "key escapes the storage root"),
                    ));
                }
            }
        }
        Ok(path)
    }

    async fn remove(path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::local_io(path, err)),
        }
    }
}

#[async_trait]
impl StorageStrategy for LocalStrategy {
    fn platform(&self) -> Platform {
        Platform::Local
    }

    async fn upload(
        &self,
        _bucket: &str,
        key: &str,
        content: Bytes,
    ) -> StorageResult<UploadResponse> {
        let path = self.path_of(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::local_io(parent, err))?;
        }
        fs::write(&path, &content)
            .await
            .map_err(|err| StorageError::local_io(&path, err))?;
        debug!(path = %path.display(), size = content.len(), "file written");
        Ok(UploadResponse::default())
    }

    async fn download(&self, _bucket: &str, key: &str) -> StorageResult<Option<BytesStream>> {
        let path = self.path_of(key)?;
        // the handle is closed once the whole file is in memory
        match fs::read(&path).await {
            Ok(content) => Ok(Some(BytesStream::from_bytes(Bytes::from(content)))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::local_io(path, err)),
        }
    }

    async fn exists(&self, _bucket: &str, key: &str) -> StorageResult<bool> {
        let path = self.path_of(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|err| StorageError::local_io(path, err))
    }

    async fn delete(&self, _bucket: &str, key: &str) -> StorageResult<bool> {
        Self::remove(&self.path_of(key)?).await
    }

    async fn delete_many(&self, _bucket: &str, keys: &[String]) -> StorageResult<bool> {
        for key in keys {
            let outcome = match self.path_of(key) {
                Ok(path) => Self::remove(&path).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(true) => info!(key, "file deleted"),
                Ok(false) => warn!(key, "file to delete does not exist"),
                Err(err) => warn!(key, error = %err, "file delete failed"),
            }
        }
        Ok(true)
    }

    async fn presigned_url(
        &self,
        _bucket: &str,
        key: &str,
        _expire: Duration,
    ) -> StorageResult<String> {
        Ok(match &self.base_url {
            Some(base) => format!("{base}/{key}"),
            None => key.to_string(),
        })
    }

    async fn presigned_upload_url(
        &self,
        _bucket: &str,
        _key: &str,
        _expire: Duration,
    ) -> StorageResult<Option<String>> {
        Ok(None)
    }

    fn bucket_label(&self, _bucket: &str) -> String {
        self.base_url.clone().unwrap_or_default()
    }
}
