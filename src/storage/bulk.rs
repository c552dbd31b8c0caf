//! # Bulk Download
//!
//! Streams several objects as a single zip archive. The archive is written
//! by a producer task into a bounded in-memory pipe while the caller reads
//! the other end, so neither the objects nor the archive are ever held in
//! memory as a whole. Each source object is released before the next one is
//! opened.
use std::{io, sync::Arc};

use async_zip::{base::write::ZipFileWriter, Compression, ZipEntryBuilder};
use futures_util::{future, io::copy, stream, StreamExt, TryStreamExt};
use tokio::io::{duplex, AsyncWrite};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::{key, strategies::StorageStrategy, Attachment, BytesStream, StorageError, StorageResult};

/// Name of the archive handed to the caller.
pub const ARCHIVE_NAME: &str = "download.zip";

/// Capacity of the pipe between the archive producer and the caller.
const PIPE_CAPACITY: usize = 64 * 1024;

fn archive_error(err: impl std::fmt::Display) -> StorageError {
    StorageError::Archive(err.to_string())
}

/// Checks that every key exists, then starts streaming the archive.
pub(super) async fn archive(
    strategy: Arc<dyn StorageStrategy>,
    bucket: String,
    keys: Vec<String>,
) -> StorageResult<Attachment> {
    for key in &keys {
        if !strategy.exists(&bucket, key::normalize(key)).await? {
            return Err(StorageError::ObjectNotFound(key.clone()));
        }
    }

    let (sink, source) = duplex(PIPE_CAPACITY);
    let producer = tokio::spawn(write_archive(strategy, bucket, keys, sink));

    // a failed producer surfaces as a read error once its bytes are drained
    let outcome = stream::once(async move {
        match producer.await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(Err(io::Error::other(err))),
            Err(err) => Some(Err(io::Error::other(err))),
        }
    })
    .filter_map(future::ready);

    let body = ReaderStream::new(source).chain(outcome);
    Ok(Attachment::new(ARCHIVE_NAME, BytesStream::from_stream(body)))
}

async fn write_archive<W>(
    strategy: Arc<dyn StorageStrategy>,
    bucket: String,
    keys: Vec<String>,
    sink: W,
) -> StorageResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = ZipFileWriter::with_tokio(sink);

    for key in keys {
        let Some(object) = strategy.download(&bucket, key::normalize(&key)).await? else {
            warn!(bucket = %bucket, key = %key, "object disappeared while archiving");
            return Err(StorageError::ObjectNotFound(key));
        };

        let entry = ZipEntryBuilder::new(key.clone().into(), Compression::Deflate);
        let mut entry_writer = writer
            .write_entry_stream(entry)
            .await
            .map_err(archive_error)?;
        copy(object.into_async_read(), &mut entry_writer)
            .await
            .map_err(archive_error)?;
        entry_writer.close().await.map_err(archive_error)?;

        debug!(bucket = %bucket, key = %key, "archive entry written");
    }

    writer.close().await.map_err(archive_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_zip::base::read::mem::ZipFileReader;
    use bytes::Bytes;

    use crate::{
        config::{Platform, ProviderConfig},
        storage::Storage,
    };

    use super::*;

    async fn storage_with(objects: &[(&str, &[u8])]) -> Storage {
        let storage = Storage::from_config(
            "mem",
            ProviderConfig {
                bucket_name: "primary".to_string(),
                ..ProviderConfig::new(Platform::Memory)
            },
        )
        .unwrap();
        for (key, content) in objects {
            storage.upload(*content, key, Some(*key)).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn no_keys_fetch_nothing() {
        let storage = storage_with(&[]).await;
        assert!(storage.fetch(&[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn single_key_is_passed_through() {
        let storage = storage_with(&[("a.txt", &b"first"[..])]).await;

        let attachment = storage
            .fetch(&["a.txt".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attachment.filename, "a.txt");
        assert_eq!(
            attachment.stream.collect().await.unwrap(),
            Bytes::from_static(b"first")
        );
    }

    #[tokio::test]
    async fn several_keys_are_zipped_in_order() {
        let storage = storage_with(&[("b/2.txt", &b"second"[..]), ("a.txt", &b"first"[..])]).await;

        let attachment = storage
            .fetch(&["a.txt".to_string(), "b/2.txt".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attachment.filename, ARCHIVE_NAME);
        assert_eq!(
            attachment.content_disposition,
            "attachment;filename=download.zip"
        );

        let archive = attachment.stream.collect().await.unwrap();
        assert!(archive.starts_with(b"PK\x03\x04"));

        let reader = ZipFileReader::new(archive.to_vec()).await.unwrap();
        let names = reader
            .file()
            .entries()
            .iter()
            .map(|entry| entry.filename().as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.txt", "b/2.txt"]);

        let mut content = Vec::new();
        reader
            .reader_with_entry(1)
            .await
            .unwrap()
            .read_to_end_checked(&mut content)
            .await
            .unwrap();
        assert_eq!(content, b"second");
    }

    #[tokio::test]
    async fn missing_key_fails_before_archiving() {
        let storage = storage_with(&[("a.txt", &b"first"[..])]).await;

        let err = storage
            .fetch(&["a.txt".to_string(), "missing.txt".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound(key) if key == "missing.txt"));
    }

    #[tokio::test]
    async fn bucket_is_resolved_once_for_all_keys() {
        let storage = storage_with(&[]).await;
        for key in ["x", "y"] {
            storage
                .use_bucket("other")
                .upload(&b"data"[..], key, Some(key))
                .await
                .unwrap();
        }

        let attachment = storage
            .use_bucket("other")
            .fetch(&["x".to_string(), "y".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert!(!attachment.stream.collect().await.unwrap().is_empty());
    }
}
