use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use oss_bridge::{
    config::Platform,
    storage::{
        strategies::{StorageStrategy, UploadResponse},
        BytesStream, StorageResult,
    },
};

/// Strategy that only counts how often the backend was reached.
#[derive(Debug, Default)]
pub struct CountingStrategy {
    calls: AtomicUsize,
}

impl CountingStrategy {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageStrategy for CountingStrategy {
    fn platform(&self) -> Platform {
        Platform::Memory
    }

    async fn upload(&self, _: &str, _: &str, _: Bytes) -> StorageResult<UploadResponse> {
        self.hit();
        Ok(UploadResponse::default())
    }

    async fn download(&self, _: &str, _: &str) -> StorageResult<Option<BytesStream>> {
        self.hit();
        Ok(None)
    }

    async fn exists(&self, _: &str, _: &str) -> StorageResult<bool> {
        self.hit();
        Ok(false)
    }

    async fn delete(&self, _: &str, _: &str) -> StorageResult<bool> {
        self.hit();
        Ok(true)
    }

    async fn delete_many(&self, _: &str, _: &[String]) -> StorageResult<bool> {
        self.hit();
        Ok(true)
    }

    async fn presigned_url(&self, _: &str, key: &str, _: Duration) -> StorageResult<String> {
        self.hit();
        Ok(key.to_string())
    }

    async fn presigned_upload_url(
        &self,
        _: &str,
        _: &str,
        _: Duration,
    ) -> StorageResult<Option<String>> {
        self.hit();
        Ok(None)
    }
}
