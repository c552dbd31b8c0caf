use opendal::{services::S3, Operator};

use super::opendal_adapter::{AdapterOptions, OpendalAdapter, ReadUrl};
use crate::{
    config::{Platform, ProviderConfig},
    storage::StorageResult,
};

/// Create new minio storage from the provider configuration.
///
/// # Examples
///```no_run
/// use oss_bridge::config::{Platform, ProviderConfig};
/// use oss_bridge::storage::strategies::minio;
///
/// let config = ProviderConfig {
///     endpoint: "http://localhost:9000".to_string(),
///     access_key: "minioadmin".to_string(),
///     secret_key: "minioadmin".to_string(),
///     bucket_name: "uploads".to_string(),
///     ..ProviderConfig::new(Platform::Minio)
/// };
/// let minio_driver = minio::new(&config);
/// ```
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(config: &ProviderConfig) -> StorageResult<OpendalAdapter> {
    let endpoint = config.endpoint.clone();
    let region = config.region.clone().unwrap_or_else(|| "auto".to_string());
    let key_id = config.access_key.clone();
    let secret_key = config.secret_key.clone();

    OpendalAdapter::new(
        Platform::Minio,
        &config.bucket_name,
        Box::new(move |bucket: &str| -> opendal::Result<Operator> {
            let minio = S3::default()
                .bucket(bucket)
                .endpoint(&endpoint)
                .region(&region)
                .access_key_id(&key_id)
                .secret_access_key(&secret_key)
                .disable_config_load()
                .disable_ec2_metadata();
            Ok(Operator::new(minio)?.finish())
        }),
        AdapterOptions {
            timeout: Some(config.connection_timeout()),
            read_url: ReadUrl::Presign,
            presign_upload: true,
        },
    )
}
