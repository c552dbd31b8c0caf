use opendal::{services::Memory, Operator};

use super::opendal_adapter::{AdapterOptions, OpendalAdapter, ReadUrl};
use crate::{config::Platform, storage::StorageResult};

/// Default bucket of a memory strategy built without configuration.
pub const DEFAULT_BUCKET: &str = "memory";

/// Create new in-memory storage. Every bucket is a separate namespace that
/// lives as long as the strategy.
///
/// # Examples
///```
/// use oss_bridge::storage::strategies::mem;
/// let mem_storage = mem::new();
/// ```
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new() -> StorageResult<OpendalAdapter> {
    OpendalAdapter::new(
        Platform::Memory,
        DEFAULT_BUCKET,
        Box::new(|_bucket: &str| -> opendal::Result<Operator> {
            Ok(Operator::new(Memory::default())?.finish())
        }),
        AdapterOptions {
            timeout: None,
            read_url: ReadUrl::Key,
            presign_upload: false,
        },
    )
}
