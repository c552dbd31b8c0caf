use opendal::{services::S3, Operator};

use super::opendal_adapter::{AdapterOptions, OpendalAdapter, ReadUrl};
use crate::{
    config::{Platform, ProviderConfig},
    storage::StorageResult,
};

const DEFAULT_REGION: &str = "us-east-1";

/// Create new AWS s3 storage from the provider configuration. An empty
/// endpoint lets the client derive the regional AWS endpoint.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(config: &ProviderConfig) -> StorageResult<OpendalAdapter> {
    let endpoint = config.endpoint.clone();
    let region = config
        .region
        .clone()
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    let key_id = config.access_key.clone();
    let secret_key = config.secret_key.clone();

    OpendalAdapter::new(
        Platform::AwsS3,
        &config.bucket_name,
        Box::new(move |bucket: &str| -> opendal::Result<Operator> {
            let mut s3 = S3::default()
                .bucket(bucket)
                .region(&region)
                .access_key_id(&key_id)
                .secret_access_key(&secret_key)
                .enable_virtual_host_style();
            if !endpoint.is_empty() {
                s3 = s3.endpoint(&endpoint);
            }
            Ok(Operator::new(s3)?.finish())
        }),
        AdapterOptions {
            timeout: Some(config.connection_timeout()),
            read_url: ReadUrl::Presign,
            presign_upload: true,
        },
    )
}
