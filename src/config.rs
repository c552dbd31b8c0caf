//! # Configuration Management
//!
//! This module defines the configuration structures and functions to load the
//! storage providers of an environment.
//!
//! ```yaml
//! # config/development.yaml
//! logger:
//!   enable: true
//!   level: debug
//!   format: compact
//!
//! # optional, the first provider is the default otherwise
//! default: disk
//!
//! oss:
//!   minio:
//!     platform: minio
//!     endpoint: http://localhost:9000
//!     access_key: {{ get_env(name="MINIO_ACCESS_KEY", default="minioadmin") }}
//!     secret_key: {{ get_env(name="MINIO_SECRET_KEY", default="minioadmin") }}
//!     bucket_name: uploads
//!     allow_media_type: ["image/", "application/pdf"]
//!   disk:
//!     platform: local
//!     local_file_path: /var/files
//!     local_file_url: https://files.example.com
//! ```

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use fs_err as fs;
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::json;
use serde_variant::to_variant_name;
use tracing::info;

use crate::{environment::Environment, logger, storage::StorageError, Error, Result};

const DEFAULT_FOLDER: &str = "config";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logger: Logger,

    /// Name of the provider used when a caller does not name one.
    pub default: Option<String>,

    /// Storage providers by name, in declaration order.
    #[serde(with = "ordered")]
    pub oss: Vec<(String, ProviderConfig)>,
}

/// Logger configuration
///
/// Example (development):
/// ```yaml
/// # config/development.yaml
/// logger:
///   enable: true
///   level: debug
///   format: compact
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Logger {
    /// Enable log write to stdout
    pub enable: bool,

    /// Set the logger level.
    ///
    /// * options: `trace` | `debug` | `info` | `warn` | `error`
    #[serde(default)]
    pub level: logger::LogLevel,

    /// Set the logger format.
    ///
    /// * options: `compact` | `pretty` | `json`
    #[serde(default)]
    pub format: logger::Format,

    /// Override our custom tracing filter.
    ///
    /// Set this to your own filter if you want to see traces from internal
    /// libraries. See more [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives)
    pub override_filter: Option<String>,
}

/// Storage backend of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Minio,
    Aliyun,
    TencentCos,
    AwsS3,
    Local,
    QiniuKodo,
    /// Process memory, for tests and development.
    Memory,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        to_variant_name(self).map_err(|_| fmt::Error)?.fmt(f)
    }
}

/// Read access of a bucket. Only consulted by platforms that can serve
/// public objects without a signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessControl {
    Public,
    #[default]
    Private,
}

/// Configuration of one storage provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub platform: Platform,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    /// Default bucket of the provider.
    #[serde(default)]
    pub bucket_name: String,

    /// Public domain the bucket is served from.
    pub bucket_domain: Option<String>,

    /// Region of S3-protocol platforms.
    pub region: Option<String>,

    /// Timeout of every backend operation, in milliseconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Base URL local files are served from.
    pub local_file_url: Option<String>,

    /// Directory local files are stored under.
    pub local_file_path: Option<PathBuf>,

    /// Media type prefixes accepted by the upload gate.
    pub allow_media_type: Option<Vec<String>>,

    #[serde(default)]
    pub access_control: AccessControl,
}

fn default_connection_timeout() -> u64 {
    60_000
}

impl ProviderConfig {
    /// An empty configuration of the given platform, meant to be completed
    /// with struct update syntax.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket_name: String::new(),
            bucket_domain: None,
            region: None,
            connection_timeout: default_connection_timeout(),
            local_file_url: None,
            local_file_path: None,
            allow_media_type: None,
            access_control: AccessControl::default(),
        }
    }

    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout)
    }

    /// Checks the settings the platform cannot work without.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] naming the first missing
    /// setting.
    pub fn validate(&self) -> std::result::Result<(), StorageError> {
        let missing = |field: &str| -> std::result::Result<(), StorageError> {
            Err(StorageError::configuration(format!(
                "platform `{}` requires `{field}`",
                self.platform
            )))
        };

        match self.platform {
            Platform::Memory => Ok(()),
            Platform::Local if self.local_file_path.is_none() => missing("local_file_path"),
            Platform::Local => Ok(()),
            _ if self.bucket_name.is_empty() => missing("bucket_name"),
            Platform::Minio | Platform::Aliyun | Platform::TencentCos | Platform::QiniuKodo
                if self.endpoint.is_empty() =>
            {
                missing("endpoint")
            }
            Platform::QiniuKodo
                if self.access_control == AccessControl::Public
                    && self.bucket_domain.is_none() =>
            {
                missing("bucket_domain")
            }
            _ => Ok(()),
        }
    }
}

/// (De)serializes a YAML mapping as a list of entries, keeping declaration
/// order.
mod ordered {
    use super::{
        fmt, Deserializer, MapAccess, ProviderConfig, SerializeMap, Serializer, Visitor,
    };

    pub fn serialize<S>(
        entries: &[(String, ProviderConfig)],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (name, config) in entries {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, ProviderConfig)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Vec<(String, ProviderConfig)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of provider names to provider configurations")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or_default());
                while let Some(entry) = access.next_entry::<String, ProviderConfig>()? {
                    entries.push(entry);
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl Config {
    /// Creates a new configuration instance based on the specified
    /// environment, reading from the `config` folder.
    ///
    /// # Errors
    ///
    /// Returns error when could not convert the give path to
    /// [`Config`] struct.
    pub fn new(env: &Environment) -> Result<Self> {
        Self::from_folder(env, Path::new(DEFAULT_FOLDER))
    }

    /// Loads configuration settings from a folder for the specified
    /// environment. `<env>.local.yaml` wins over `<env>.yaml`.
    ///
    /// # Errors
    /// Returns error when could not convert the give path to
    /// [`Config`] struct.
    pub fn from_folder(env: &Environment, path: &Path) -> Result<Self> {
        // by order of precedence
        let files = [
            path.join(format!("{env}.local.yaml")),
            path.join(format!("{env}.yaml")),
        ];

        let selected_path = files
            .iter()
            .find(|p| p.exists())
            .ok_or_else(|| Error::Message("no configuration file found".to_string()))?;

        info!(selected_path =? selected_path, "loading environment from");

        let content = fs::read_to_string(selected_path)?;
        Self::from_yaml(&content)
            .map_err(|err| match err {
                Error::YAML(err) => {
                    Error::YAMLFile(err, selected_path.to_string_lossy().to_string())
                }
                err => err,
            })
    }

    /// Renders `content` as a template and parses the result.
    ///
    /// # Errors
    /// Returns error when the template or the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let rendered = crate::tera::render_string(content, &json!({}))?;
        Ok(serde_yaml::from_str(&rendered)?)
    }

    /// Configuration of the provider with the given name.
    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.oss
            .iter()
            .find_map(|(candidate, config)| (candidate == name).then_some(config))
    }
}
