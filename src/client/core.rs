use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{CacheStats, ResponseCache, SweepHandle};
use crate::client::policy::{backoff_sleep, Decision, RetryPolicy};
use crate::client::registry::ProviderRegistry;
use crate::drivers::{ProviderDriver, ProviderKind};
use crate::error::ProviderError;
use crate::types::{ChatResponse, Message};
use crate::{Error, Result};

/// Per-call options for [`ProviderFactory::chat_with`].
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Consult and populate the response cache (default `true`).
    pub use_cache: bool,
    pub cancel: Option<CancellationToken>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cancel: None,
        }
    }
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Provider-agnostic entry point: cache-first lookup, per-provider retry with
/// backoff, then primary -> fallback failover.
///
/// Construct it with [`ProviderFactory::builder`] or
/// [`ProviderFactory::from_config`], and call [`ProviderFactory::shutdown`]
/// when the application stops.
pub struct ProviderFactory {
    pub(crate) registry: ProviderRegistry,
    pub(crate) primary: ProviderKind,
    pub(crate) fallback: Option<ProviderKind>,
    pub(crate) policy: RetryPolicy,
    pub(crate) cache: ResponseCache,
    pub(crate) sweeper: Mutex<Option<SweepHandle>>,
}

impl ProviderFactory {
    pub fn builder() -> crate::client::ProviderFactoryBuilder {
        crate::client::ProviderFactoryBuilder::new()
    }

    pub fn primary(&self) -> ProviderKind {
        self.primary
    }

    pub fn fallback(&self) -> Option<ProviderKind> {
        self.fallback
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        self.registry.kinds()
    }

    /// Look up a configured adapter by kind.
    pub fn provider(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderDriver>> {
        self.registry
            .get(kind)
            .cloned()
            .ok_or(Error::ProviderNotConfigured(kind))
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Primary first, then the fallback if it is configured.
    pub(crate) fn candidates(&self) -> Result<Vec<Arc<dyn ProviderDriver>>> {
        let mut out = vec![self.provider(self.primary)?];
        if let Some(kind) = self.fallback {
            if let Some(driver) = self.registry.get(kind) {
                out.push(driver.clone());
            }
        }
        Ok(out)
    }

    pub(crate) fn validate(messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one message is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Chat with default options (cache enabled, no cancellation).
    pub async fn chat(&self, messages: &[Message]) -> Result<ChatResponse> {
        self.chat_with(messages, ChatOptions::default()).await
    }

    /// Single-turn convenience call returning only the generated text.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        Ok(self.chat(&messages).await?.content)
    }

    pub async fn chat_with(
        &self,
        messages: &[Message],
        options: ChatOptions,
    ) -> Result<ChatResponse> {
        Self::validate(messages)?;
        let request_id = Uuid::new_v4().to_string();
        let candidates = self.candidates()?;
        let cancel = options.cancel.as_ref();

        // Lookups are always keyed by the primary model.
        let primary_key = ResponseCache::generate_key(messages, candidates[0].model());
        if options.use_cache {
            if let Some(content) = self.cache.get(&primary_key) {
                debug!(
                    request_id = request_id.as_str(),
                    cache_key = primary_key.short(),
                    "response cache hit"
                );
                return Ok(ChatResponse::cached(content));
            }
        }

        let mut last: Option<ProviderError> = None;
        for (index, driver) in candidates.iter().enumerate() {
            let is_primary = index == 0;
            if !is_primary {
                info!(
                    request_id = request_id.as_str(),
                    provider = driver.provider_id(),
                    "switching to fallback provider"
                );
            }

            let start = Instant::now();
            match self
                .call_with_retry(driver.as_ref(), messages, cancel, &request_id)
                .await
            {
                Ok(response) => {
                    info!(
                        request_id = request_id.as_str(),
                        provider = driver.provider_id(),
                        model = driver.model(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "chat completed"
                    );
                    if options.use_cache {
                        // A fallback answer is stored under its own model's key.
                        let key = if is_primary {
                            primary_key.clone()
                        } else {
                            ResponseCache::generate_key(messages, driver.model())
                        };
                        self.cache.set(
                            key,
                            response.content.clone(),
                            driver.provider_id(),
                            driver.model(),
                        );
                    }
                    return Ok(response);
                }
                Err(e) if e.is_fatal() => {
                    warn!(
                        request_id = request_id.as_str(),
                        provider = driver.provider_id(),
                        error = %e,
                        "provider failed with a non-recoverable error"
                    );
                    return Err(e.into());
                }
                Err(e) => {
                    if is_primary {
                        warn!(
                            request_id = request_id.as_str(),
                            provider = driver.provider_id(),
                            error = %e,
                            "primary provider failed"
                        );
                    } else {
                        error!(
                            request_id = request_id.as_str(),
                            provider = driver.provider_id(),
                            error = %e,
                            "fallback provider failed"
                        );
                    }
                    last = Some(e);
                }
            }
        }

        Err(match last {
            Some(e) => Error::all_failed(e),
            None => Error::ProviderNotConfigured(self.primary),
        })
    }

    /// Up to `max_retries` sequential attempts against one adapter.
    async fn call_with_retry(
        &self,
        driver: &dyn ProviderDriver,
        messages: &[Message],
        cancel: Option<&CancellationToken>,
        request_id: &str,
    ) -> std::result::Result<ChatResponse, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            debug!(
                request_id,
                provider = driver.provider_id(),
                attempt = attempt + 1,
                "calling provider"
            );
            let err = match driver.chat(messages, cancel).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };
            match self.policy.decide(&err, attempt) {
                Decision::Retry { delay } => {
                    debug!(
                        request_id,
                        provider = driver.provider_id(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    backoff_sleep(driver.provider_id(), delay, cancel).await?;
                    attempt += 1;
                }
                Decision::NextProvider | Decision::Fatal => return Err(err),
            }
        }
    }

    /// Probe every configured adapter concurrently.
    pub async fn is_any_provider_available(&self) -> bool {
        let probes = self.registry.drivers().map(|d| d.is_available());
        futures::future::join_all(probes)
            .await
            .into_iter()
            .any(|ok| ok)
    }

    /// Stop the cache sweeper and drop every cached response.
    pub fn shutdown(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }
        self.cache.clear();
        info!("provider factory shut down");
    }
}

impl std::fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("providers", &self.registry.kinds())
            .field("primary", &self.primary)
            .field("fallback", &self.fallback)
            .field("policy", &self.policy)
            .field("cache", &self.cache)
            .finish()
    }
}
