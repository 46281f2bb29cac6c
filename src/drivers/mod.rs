//! Provider 驱动抽象层 — 通过 trait 实现多厂商 API 适配的动态分发
//!
//! Provider driver abstraction. Each vendor adapter implements [`ProviderDriver`]
//! and is held as `Arc<dyn ProviderDriver>`, so the factory code is identical
//! for OpenAI and Claude.
//!
//! Adapters own three translations:
//!
//! | Concern | OpenAI | Claude |
//! |---------|--------|--------|
//! | Roles | passed through | system messages hoisted into `system` |
//! | Streaming | `data:` frames, `[DONE]` | `content_block_delta` / `message_stop` / `error` |
//! | Errors | HTTP status + `error.message` | HTTP status + `error.message` |

pub mod anthropic;
pub mod openai;
mod stream;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorContext, ProviderError};
use crate::types::{ChatResponse, ChunkStream, Message};

pub use anthropic::ClaudeDriver;
pub use openai::OpenAiDriver;
pub(crate) use stream::chunk_stream;

const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// The closed set of vendors this crate can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "claude", alias = "anthropic")]
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => openai::DEFAULT_MODEL,
            ProviderKind::Claude => anthropic::DEFAULT_MODEL,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => openai::DEFAULT_BASE_URL,
            ProviderKind::Claude => anthropic::DEFAULT_BASE_URL,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            other => Err(Error::configuration_with_context(
                format!("unknown AI provider '{other}'"),
                ErrorContext::new().with_details("expected 'openai' or 'claude'"),
            )),
        }
    }
}

/// Per-adapter settings. The API key is never printed by `Debug`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub api_key: String,
    /// Empty means the vendor default.
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            timeout_ms: None,
            base_url: None,
        }
    }

    /// Settings with the vendor's default model.
    pub fn for_kind(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self::new(api_key, kind.default_model())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url.clone().unwrap_or_else(|| default.to_string())
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Core trait for a vendor chat adapter.
///
/// The trait is object-safe; the factory stores adapters as
/// `Arc<dyn ProviderDriver>`.
#[async_trait]
pub trait ProviderDriver: Send + Sync + std::fmt::Debug {
    /// Stable identifier used in logs and error messages.
    fn provider_id(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Model name sent with every request; also part of the cache key.
    fn model(&self) -> &str;

    /// One non-streaming completion. Never returns a partial response.
    async fn chat(
        &self,
        messages: &[Message],
        cancel: Option<&CancellationToken>,
    ) -> Result<ChatResponse, ProviderError>;

    /// Open a streaming completion.
    ///
    /// `Err` means the stream could not be started. Once a stream is returned,
    /// failures arrive as a terminal [`StreamChunk::Error`](crate::types::StreamChunk::Error)
    /// and normal completion as [`StreamChunk::Done`](crate::types::StreamChunk::Done).
    async fn stream_chat(
        &self,
        messages: &[Message],
        cancel: Option<&CancellationToken>,
    ) -> Result<ChunkStream, ProviderError>;

    /// Lightweight authenticated probe. Any failure is `false`.
    async fn is_available(&self) -> bool;
}

/// Build the adapter for `kind`.
pub fn create_driver(
    kind: ProviderKind,
    settings: ProviderSettings,
) -> crate::Result<Arc<dyn ProviderDriver>> {
    let settings = if settings.model.trim().is_empty() {
        settings.with_model(kind.default_model())
    } else {
        settings
    };
    let driver: Arc<dyn ProviderDriver> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiDriver::new(settings)?),
        ProviderKind::Claude => Arc::new(ClaudeDriver::new(settings)?),
    };
    Ok(driver)
}

/// Race a provider request against the caller's cancellation token.
pub(crate) async fn run_cancellable<T, F>(
    provider: &str,
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match cancel {
        Some(token) => {
            if token.is_cancelled() {
                return Err(ProviderError::cancelled(provider));
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ProviderError::cancelled(provider)),
                res = fut => res,
            }
        }
        None => fut.await,
    }
}
