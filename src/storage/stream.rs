use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use opendal::Reader;

use super::StorageResult;

/// A stream of object bytes that abstracts over the underlying backend.
/// `OpenDAL` types stay out of the public API.
pub struct BytesStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>,
}

impl BytesStream {
    /// Create a `BytesStream` from an `OpenDAL` `Reader`, covering the whole
    /// object.
    pub(crate) async fn from_reader(reader: Reader) -> StorageResult<Self> {
        let stream = reader.into_bytes_stream(..).await?;

        let mapped_stream = stream.map(|result| result.map_err(std::io::Error::other));

        Ok(Self {
            inner: Box::pin(mapped_stream),
        })
    }

    /// Wrap a fully buffered object.
    #[must_use]
    pub fn from_bytes(data: Bytes) -> Self {
        Self {
            inner: Box::pin(stream::once(async move { Ok(data) })),
        }
    }

    /// Wrap any stream of byte chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Collect the entire stream into a single `Bytes` buffer.
    /// This loads the whole object into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the stream fails.
    pub async fn collect(mut self) -> Result<Bytes, std::io::Error> {
        let mut buffer = Vec::new();

        while let Some(chunk) = self.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
        }

        Ok(Bytes::from(buffer))
    }
}

impl Stream for BytesStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for BytesStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BytesStream").finish_non_exhaustive()
    }
}
