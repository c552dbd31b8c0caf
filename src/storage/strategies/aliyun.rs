use opendal::{services::Oss, Operator};

use super::opendal_adapter::{AdapterOptions, OpendalAdapter, ReadUrl};
use crate::{
    config::{Platform, ProviderConfig},
    storage::StorageResult,
};

/// Create new Aliyun OSS storage from the provider configuration.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(config: &ProviderConfig) -> StorageResult<OpendalAdapter> {
    let endpoint = config.endpoint.clone();
    let key_id = config.access_key.clone();
    let secret_key = config.secret_key.clone();

    OpendalAdapter::new(
        Platform::Aliyun,
        &config.bucket_name,
        Box::new(move |bucket: &str| -> opendal::Result<Operator> {
            let oss = Oss::default()
                .bucket(bucket)
                .endpoint(&endpoint)
                .access_key_id(&key_id)
                .access_key_secret(&secret_key);
            Ok(Operator::new(oss)?.finish())
        }),
        AdapterOptions {
            timeout: Some(config.connection_timeout()),
            read_url: ReadUrl::Presign,
            presign_upload: true,
        },
    )
}
