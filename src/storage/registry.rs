//! # Strategy Registry
//!
//! Holds every configured [`Storage`] by name and knows which one is the
//! default. The default is decided once, when the registry is built: the
//! provider named by `default`, or the first one registered.
use std::collections::HashSet;

use tracing::info;

use super::{Storage, StorageError, StorageResult};
use crate::config::Config;

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    providers: Vec<Storage>,
    default: Option<String>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider under [`Storage::name`]. Registration order decides
    /// the default when none is designated.
    #[must_use]
    pub fn register(mut self, storage: Storage) -> Self {
        self.providers.push(storage);
        self
    }

    /// Designates the default provider by name.
    #[must_use]
    pub fn default_provider(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] when nothing was registered,
    /// a name is registered twice, or the designated default is unknown.
    pub fn build(self) -> StorageResult<StrategyRegistry> {
        if self.providers.is_empty() {
            return Err(StorageError::configuration("no storage provider configured"));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.providers.iter().find(|s| !seen.insert(s.name())) {
            return Err(StorageError::configuration(format!(
                "storage provider `{}` is configured twice",
                duplicate.name()
            )));
        }

        let default = match &self.default {
            Some(name) => self
                .providers
                .iter()
                .position(|s| s.name() == name)
                .ok_or_else(|| {
                    StorageError::configuration(format!(
                        "default storage provider `{name}` is not configured"
                    ))
                })?,
            None => 0,
        };

        Ok(StrategyRegistry {
            providers: self.providers,
            default,
        })
    }
}

/// Configured providers by name.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    providers: Vec<Storage>,
    default: usize,
}

impl StrategyRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Builds one provider per `oss` entry, in configuration order. The
    /// first provider that cannot be built aborts the whole registry.
    ///
    /// # Errors
    ///
    /// Returns the `StorageError` of the failing provider, or a
    /// [`StorageError::Configuration`] from [`RegistryBuilder::build`].
    pub fn from_config(config: &Config) -> StorageResult<Self> {
        let mut builder = RegistryBuilder::new();
        for (name, provider) in &config.oss {
            builder = builder.register(Storage::from_config(name.clone(), provider.clone())?);
        }
        if let Some(default) = &config.default {
            builder = builder.default_provider(default.clone());
        }

        let registry = builder.build()?;
        info!(
            providers = ?registry.names().collect::<Vec<_>>(),
            default = registry.get_default().name(),
            "storage registry ready"
        );
        Ok(registry)
    }

    /// # Errors
    ///
    /// Returns [`StorageError::ProviderNotFound`] for an unknown name.
    pub fn get(&self, name: &str) -> StorageResult<&Storage> {
        self.providers
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| StorageError::ProviderNotFound(name.to_string()))
    }

    #[must_use]
    pub fn get_default(&self) -> &Storage {
        &self.providers[self.default]
    }

    /// The named provider, or the default one when no name is given.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ProviderNotFound`] for an unknown name.
    pub fn storage(&self, name: Option<&str>) -> StorageResult<&Storage> {
        match name {
            Some(name) if !name.is_empty() => self.get(name),
            _ => Ok(self.get_default()),
        }
    }

    /// Provider names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(Storage::name)
    }
}
