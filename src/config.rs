//! 配置模块：从环境变量或 YAML 文件加载 AI 提供方与缓存配置。
//!
//! # Configuration
//!
//! [`AiConfig`] gathers everything a [`ProviderFactory`](crate::ProviderFactory)
//! needs. It can be read from the process environment or from YAML:
//!
//! | Variable | Effect | Default |
//! |----------|--------|---------|
//! | `OPENAI_API_KEY` | registers the OpenAI adapter | unset |
//! | `OPENAI_MODEL` / `OPENAI_BASE_URL` | OpenAI overrides | `gpt-4o` / api.openai.com |
//! | `ANTHROPIC_API_KEY` | registers the Claude adapter | unset |
//! | `CLAUDE_MODEL` / `ANTHROPIC_BASE_URL` | Claude overrides | `claude-sonnet-4-20250514` / api.anthropic.com |
//! | `AI_PRIMARY_PROVIDER` | `openai` or `claude` | `openai` |
//! | `AI_FALLBACK_PROVIDER` | `openai`, `claude` or `none` | `claude` |
//! | `AI_MAX_RETRIES` | attempts per provider | `3` |
//! | `AI_CACHE_TTL_HOURS` | cache entry lifetime | `24` |
//! | `AI_CACHE_MAX_ENTRIES` | cache capacity | `1000` |
//! | `AI_HTTP_TIMEOUT_SECS` | per-request timeout | `60` |
//!
//! ```yaml
//! factory:
//!   primary: claude
//!   fallback: openai
//!   max_retries: 2
//! cache:
//!   ttl_hours: 12
//! claude:
//!   api_key: sk-ant-...
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::cache::CacheConfig;
use crate::client::RetryPolicy;
use crate::drivers::{ProviderKind, ProviderSettings};
use crate::error::{Error, ErrorContext};
use crate::Result;

/// Failover and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub primary: ProviderKind,
    pub fallback: Option<ProviderKind>,
    pub max_retries: u32,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            primary: ProviderKind::OpenAi,
            fallback: Some(ProviderKind::Claude),
            max_retries: RetryPolicy::DEFAULT_MAX_RETRIES,
        }
    }
}

/// Serializable form of [`CacheConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_hours: u64,
    pub max_entries: usize,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            max_entries: 1000,
            sweep_interval_secs: 3600,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_ttl_hours(self.ttl_hours)
            .with_max_entries(self.max_entries)
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Complete configuration. A provider section that is absent leaves that
/// adapter unregistered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub factory: FactoryConfig,
    pub cache: CacheSettings,
    pub openai: Option<ProviderSettings>,
    pub claude: Option<ProviderSettings>,
}

impl AiConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let timeout = var("AI_HTTP_TIMEOUT_SECS")
            .map(|v| parse_or("AI_HTTP_TIMEOUT_SECS", &v, 60u64))
            .map(Duration::from_secs);

        let provider = |kind: ProviderKind, key_var: &str, model_var: &str, url_var: &str| {
            var(key_var).map(|key| {
                let mut settings = ProviderSettings::for_kind(kind, key);
                if let Some(model) = var(model_var) {
                    settings = settings.with_model(model);
                }
                if let Some(url) = var(url_var) {
                    settings = settings.with_base_url(url);
                }
                if let Some(t) = timeout {
                    settings = settings.with_timeout(t);
                }
                settings
            })
        };

        let defaults = FactoryConfig::default();
        let primary = match var("AI_PRIMARY_PROVIDER") {
            Some(v) => parse_kind("AI_PRIMARY_PROVIDER", &v)?,
            None => defaults.primary,
        };
        let fallback = match var("AI_FALLBACK_PROVIDER") {
            Some(v) if v.trim().eq_ignore_ascii_case("none") => None,
            Some(v) => Some(parse_kind("AI_FALLBACK_PROVIDER", &v)?),
            None => defaults.fallback,
        };

        let cache_defaults = CacheSettings::default();
        Ok(Self {
            factory: FactoryConfig {
                primary,
                fallback,
                max_retries: var("AI_MAX_RETRIES")
                    .map(|v| parse_or("AI_MAX_RETRIES", &v, defaults.max_retries))
                    .unwrap_or(defaults.max_retries),
            },
            cache: CacheSettings {
                ttl_hours: var("AI_CACHE_TTL_HOURS")
                    .map(|v| parse_or("AI_CACHE_TTL_HOURS", &v, cache_defaults.ttl_hours))
                    .unwrap_or(cache_defaults.ttl_hours),
                max_entries: var("AI_CACHE_MAX_ENTRIES")
                    .map(|v| parse_or("AI_CACHE_MAX_ENTRIES", &v, cache_defaults.max_entries))
                    .unwrap_or(cache_defaults.max_entries),
                sweep_interval_secs: cache_defaults.sweep_interval_secs,
            },
            openai: provider(
                ProviderKind::OpenAi,
                "OPENAI_API_KEY",
                "OPENAI_MODEL",
                "OPENAI_BASE_URL",
            ),
            claude: provider(
                ProviderKind::Claude,
                "ANTHROPIC_API_KEY",
                "CLAUDE_MODEL",
                "ANTHROPIC_BASE_URL",
            ),
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Claude => self.claude.as_ref(),
        }
    }
}

fn parse_kind(var: &str, value: &str) -> Result<ProviderKind> {
    ProviderKind::from_str(value).map_err(|_| {
        Error::configuration_with_context(
            format!("unknown AI provider '{}'", value.trim()),
            ErrorContext::new()
                .with_field_path(var)
                .with_details("expected 'openai' or 'claude'")
                .with_source("env"),
        )
    })
}

fn parse_or<T: FromStr + std::fmt::Display + Copy>(var: &str, value: &str, default: T) -> T {
    match value.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(variable = var, value, default = %default, "unparseable value, using default");
            default
        }
    }
}
