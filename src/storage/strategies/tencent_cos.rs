use opendal::{services::Cos, Operator};

use super::opendal_adapter::{AdapterOptions, OpendalAdapter, ReadUrl};
use crate::{
    config::{Platform, ProviderConfig},
    storage::StorageResult,
};

/// COS endpoints are often configured by region name alone
/// (`ap-guangzhou`), expand those into the service URL.
fn endpoint_url(endpoint: &str) -> String {
    if endpoint.contains("://") || endpoint.contains('.') {
        endpoint.to_string()
    } else {
        format!("https://cos.{endpoint}.myqcloud.com")
    }
}

/// Create new Tencent COS storage from the provider configuration.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(config: &ProviderConfig) -> StorageResult<OpendalAdapter> {
    let endpoint = endpoint_url(&config.endpoint);
    let secret_id = config.access_key.clone();
    let secret_key = config.secret_key.clone();

    OpendalAdapter::new(
        Platform::TencentCos,
        &config.bucket_name,
        Box::new(move |bucket: &str| -> opendal::Result<Operator> {
            let cos = Cos::default()
                .bucket(bucket)
                .endpoint(&endpoint)
                .secret_id(&secret_id)
                .secret_key(&secret_key);
            Ok(Operator::new(cos)?.finish())
        }),
        AdapterOptions {
            timeout: Some(config.connection_timeout()),
            read_url: ReadUrl::Presign,
            presign_upload: true,
        },
    )
}
