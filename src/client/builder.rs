use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::cache::{CacheConfig, ResponseCache};
use crate::client::core::ProviderFactory;
use crate::client::policy::RetryPolicy;
use crate::client::registry::ProviderRegistry;
use crate::config::AiConfig;
use crate::drivers::{create_driver, ProviderDriver, ProviderKind, ProviderSettings};
use crate::{Error, Result};

/// Builder for [`ProviderFactory`].
///
/// Adapters come either from [`ProviderSettings`] (built on [`build`](Self::build))
/// or ready-made via [`driver`](Self::driver); a ready-made adapter wins when
/// both are given for the same kind.
pub struct ProviderFactoryBuilder {
    registry: ProviderRegistry,
    settings: Vec<(ProviderKind, ProviderSettings)>,
    primary: ProviderKind,
    fallback: Option<ProviderKind>,
    max_retries: u32,
    cache_config: CacheConfig,
    cache: Option<ResponseCache>,
    sweeper: bool,
}

impl ProviderFactoryBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            settings: Vec::new(),
            primary: ProviderKind::OpenAi,
            fallback: None,
            max_retries: RetryPolicy::DEFAULT_MAX_RETRIES,
            cache_config: CacheConfig::default(),
            cache: None,
            sweeper: true,
        }
    }

    /// Seed the builder from a loaded [`AiConfig`].
    pub fn from_config(config: &AiConfig) -> Self {
        let mut builder = Self::new()
            .primary(config.factory.primary)
            .max_retries(config.factory.max_retries)
            .cache_config(config.cache.to_cache_config());
        builder.fallback = config.factory.fallback;
        if let Some(settings) = &config.openai {
            builder = builder.provider_settings(ProviderKind::OpenAi, settings.clone());
        }
        if let Some(settings) = &config.claude {
            builder = builder.provider_settings(ProviderKind::Claude, settings.clone());
        }
        builder
    }

    pub fn primary(mut self, kind: ProviderKind) -> Self {
        self.primary = kind;
        self
    }

    pub fn fallback(mut self, kind: ProviderKind) -> Self {
        self.fallback = Some(kind);
        self
    }

    pub fn no_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    /// Attempts per provider; values below 1 are raised to 1.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Share an existing cache instead of creating one.
    pub fn cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Do not start the periodic expiry sweep.
    pub fn without_sweeper(mut self) -> Self {
        self.sweeper = false;
        self
    }

    pub fn provider_settings(mut self, kind: ProviderKind, settings: ProviderSettings) -> Self {
        self.settings.retain(|(k, _)| *k != kind);
        self.settings.push((kind, settings));
        self
    }

    /// Register a ready-made adapter.
    pub fn driver(mut self, kind: ProviderKind, driver: Arc<dyn ProviderDriver>) -> Self {
        self.registry.insert(kind, driver);
        self
    }

    pub fn build(self) -> Result<ProviderFactory> {
        let mut registry = self.registry;
        for (kind, settings) in self.settings {
            if settings.api_key.trim().is_empty() {
                warn!(provider = kind.as_str(), "empty API key, provider not registered");
                continue;
            }
            if !registry.contains(kind) {
                registry.insert(kind, create_driver(kind, settings)?);
            }
        }

        let primary = self.primary;
        if !registry.contains(primary) {
            return Err(Error::ProviderNotConfigured(primary));
        }

        let fallback = match self.fallback {
            Some(kind) if kind == primary => {
                warn!(provider = kind.as_str(), "fallback equals primary, ignoring fallback");
                None
            }
            Some(kind) if !registry.contains(kind) => {
                warn!(provider = kind.as_str(), "fallback provider not configured, ignoring fallback");
                None
            }
            other => other,
        };

        let cache = self
            .cache
            .unwrap_or_else(|| ResponseCache::new(self.cache_config));
        let sweeper = if self.sweeper && tokio::runtime::Handle::try_current().is_ok() {
            Some(cache.spawn_sweeper())
        } else {
            None
        };

        let policy = RetryPolicy::new(self.max_retries);
        info!(
            primary = primary.as_str(),
            fallback = fallback.map(|k| k.as_str()).unwrap_or("none"),
            max_retries = policy.max_retries(),
            "provider factory ready"
        );

        Ok(ProviderFactory {
            registry,
            primary,
            fallback,
            policy,
            cache,
            sweeper: Mutex::new(sweeper),
        })
    }
}

impl Default for ProviderFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFactory {
    /// Build a factory straight from configuration.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        ProviderFactoryBuilder::from_config(config).build()
    }
}
