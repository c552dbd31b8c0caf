//! # Qiniu Kodo
//!
//! Kodo is reached through its S3-compatible API. Read URLs follow the
//! bucket's access control: a public bucket is served unsigned from its
//! bucket domain, a private one gets a signed URL. Kodo does not hand out
//! client-side upload URLs.
use opendal::{services::S3, Operator};

use super::opendal_adapter::{AdapterOptions, OpendalAdapter, ReadUrl};
use crate::{
    config::{AccessControl, Platform, ProviderConfig},
    storage::StorageResult,
};

/// Create new Qiniu Kodo storage from the provider configuration.
///
/// # Errors
///
/// When could not initialize the client instance
pub fn new(config: &ProviderConfig) -> StorageResult<OpendalAdapter> {
    let endpoint = config.endpoint.clone();
    let region = config.region.clone().unwrap_or_else(|| "auto".to_string());
    let key_id = config.access_key.clone();
    let secret_key = config.secret_key.clone();

    let read_url = match (&config.access_control, &config.bucket_domain) {
        (AccessControl::Public, Some(domain)) => ReadUrl::PublicDomain(domain.clone()),
        _ => ReadUrl::Presign,
    };

    OpendalAdapter::new(
        Platform::QiniuKodo,
        &config.bucket_name,
        Box::new(move |bucket: &str| -> opendal::Result<Operator> {
            let kodo = S3::default()
                .bucket(bucket)
                .endpoint(&endpoint)
                .region(&region)
                .access_key_id(&key_id)
                .secret_access_key(&secret_key)
                .disable_config_load();
            Ok(Operator::new(kodo)?.finish())
        }),
        AdapterOptions {
            timeout: Some(config.connection_timeout()),
            read_url,
            presign_upload: false,
        },
    )
}
