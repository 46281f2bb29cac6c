use crate::error::ProviderError;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// A pinned, boxed stream of provider results.
pub type ProviderStream<T> = Pin<Box<dyn Stream<Item = Result<T, ProviderError>> + Send + 'static>>;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Thin reqwest wrapper bound to one provider's base URL and credentials.
///
/// Every failure leaves this type as a [`ProviderError`]; raw reqwest errors
/// only survive as the `source` of one.
pub struct HttpTransport {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        provider: &str,
        base_url: &str,
        timeout: Duration,
        headers: &[(&'static str, String)],
    ) -> Result<Self, ProviderError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let mut value = HeaderValue::from_str(value).map_err(|e| {
                ProviderError::malformed(provider, format!("invalid value for header {name}"))
                    .with_source(e)
            })?;
            value.set_sensitive(true);
            header_map.insert(HeaderName::from_static(name), value);
        }

        // Only the connect phase is bounded here; request phases get their own
        // limits because streaming bodies may legitimately outlive `timeout`.
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| ProviderError::network(provider, "failed to build HTTP client").with_source(e))?;

        Ok(Self {
            client,
            provider: provider.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: header_map,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and return the parsed JSON reply.
    ///
    /// The whole exchange, body included, is bounded by the transport timeout.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .post(self.url(path))
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;
        let resp = self.check_status(resp).await?;
        resp.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                self.classify_transport(e)
            } else {
                ProviderError::malformed(&self.provider, "response body is not valid JSON")
                    .with_source(e)
            }
        })
    }

    /// POST a JSON body and hand back the response body as a byte stream.
    ///
    /// Only the wait for response headers is bounded by the timeout.
    pub async fn post_stream(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<ProviderStream<Bytes>, ProviderError> {
        let send = self
            .client
            .post(self.url(path))
            .headers(self.headers.clone())
            .header("accept", "text/event-stream")
            .json(body)
            .send();
        let resp = match tokio::time::timeout(self.timeout, send).await {
            Ok(r) => r.map_err(|e| self.classify_transport(e))?,
            Err(_) => {
                return Err(ProviderError::timeout(
                    &self.provider,
                    format!("no response within {} ms", self.timeout.as_millis()),
                ))
            }
        };
        let resp = self.check_status(resp).await?;

        let provider = self.provider.clone();
        let stream = resp.bytes_stream().map_err(move |e| {
            if e.is_timeout() {
                ProviderError::timeout(&provider, "stream read timed out").with_source(e)
            } else {
                ProviderError::network(&provider, "stream interrupted").with_source(e)
            }
        });
        Ok(Box::pin(stream))
    }

    /// Authenticated GET that reports only whether it succeeded.
    pub async fn probe(&self, path: &str) -> bool {
        let result = self
            .client
            .get(self.url(path))
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await;
        match result {
            Ok(resp) => {
                let ok = resp.status().is_success();
                debug!(
                    provider = self.provider.as_str(),
                    http_status = resp.status().as_u16(),
                    "availability probe finished"
                );
                ok
            }
            Err(e) => {
                debug!(provider = self.provider.as_str(), error = %e, "availability probe failed");
                false
            }
        }
    }

    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!(
            provider = self.provider.as_str(),
            http_status = status.as_u16(),
            "provider request failed"
        );
        Err(ProviderError::from_status(
            &self.provider,
            status.as_u16(),
            extract_error_message(status, &body),
        ))
    }

    fn classify_transport(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::timeout(
                &self.provider,
                format!("request exceeded {} ms", self.timeout.as_millis()),
            )
            .with_source(e)
        } else if let Some(status) = e.status() {
            ProviderError::from_status(&self.provider, status.as_u16(), e.to_string()).with_source(e)
        } else {
            ProviderError::network(&self.provider, format!("request failed: {e}")).with_source(e)
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Human-readable message from a vendor error body.
///
/// Understands the common `{"error": {"message": ...}}` shape used by both
/// OpenAI and Anthropic, then falls back to the raw (truncated) body.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let message = json
            .pointer("/error/message")
            .or_else(|| json.get("message"))
            .or_else(|| json.get("error"))
            .and_then(|v| v.as_str());
        if let Some(m) = message {
            return m.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}
