//! Anthropic Messages API 驱动 — 实现 Anthropic 特有的请求/响应格式转换
//!
//! Claude (Anthropic Messages API) adapter. Handles the key differences from OpenAI:
//! - System messages are a top-level `system` parameter, not part of `messages`.
//! - Content uses typed blocks: `[{"type": "text", "text": "..."}]`.
//! - Streaming uses `event: content_block_delta` with `delta.text`.
//! - `max_tokens` is required, not optional.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{chunk_stream, run_cancellable, ProviderDriver, ProviderKind, ProviderSettings};
use crate::error::ProviderError;
use crate::transport::{decode_sse, HttpTransport, SseEvent};
use crate::types::{ChatResponse, ChunkStream, Message, MessageRole, StreamChunk, Usage};

pub(crate) const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const PROVIDER_ID: &str = "claude";
const API_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";
const MODELS_PATH: &str = "/v1/models";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Claude chat adapter.
#[derive(Debug)]
pub struct ClaudeDriver {
    settings: ProviderSettings,
    transport: HttpTransport,
}

impl ClaudeDriver {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let transport = HttpTransport::new(
            PROVIDER_ID,
            &settings.base_url_or(DEFAULT_BASE_URL),
            settings.timeout(),
            &[
                ("x-api-key", settings.api_key.clone()),
                ("anthropic-version", API_VERSION.to_string()),
            ],
        )?;
        Ok(Self {
            settings,
            transport,
        })
    }

    /// Extract system messages and non-system messages separately.
    /// Every system message is kept, joined by a blank line, in original order.
    fn split_system_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut turns: Vec<Value> = Vec::new();

        for m in messages {
            match m.role {
                MessageRole::System => system_parts.push(&m.content),
                MessageRole::User | MessageRole::Assistant => turns.push(json!({
                    "role": m.role.as_str(),
                    "content": [{ "type": "text", "text": m.content }],
                })),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, turns)
    }

    fn build_body(&self, messages: &[Message], stream: bool) -> Value {
        let (system, turns) = Self::split_system_messages(messages);

        let mut body = json!({
            "model": self.settings.model,
            "messages": turns,
            "max_tokens": self.settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": stream,
        });
        if let Some(sys) = system {
            body["system"] = Value::String(sys);
        }
        if let Some(t) = self.settings.temperature {
            body["temperature"] = json!(t);
        }
        body
    }

    fn normalize_stop_reason(reason: &str) -> String {
        match reason {
            "end_turn" | "stop_sequence" => "stop".to_string(),
            "max_tokens" => "length".to_string(),
            "tool_use" => "tool_calls".to_string(),
            other => other.to_string(),
        }
    }

    fn parse_response(body: &Value) -> Result<ChatResponse, ProviderError> {
        let blocks = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| ProviderError::malformed(PROVIDER_ID, "response has no content blocks"))?;

        let content: String = blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect();

        let mut response = ChatResponse::new(content);
        if let Some(reason) = body.get("stop_reason").and_then(|v| v.as_str()) {
            response = response.with_finish_reason(Self::normalize_stop_reason(reason));
        }
        if let Some(u) = body.get("usage") {
            response = response.with_usage(Usage::new(
                u["input_tokens"].as_u64().unwrap_or(0),
                u["output_tokens"].as_u64().unwrap_or(0),
            ));
        }
        Ok(response)
    }

    fn parse_stream_event(event: &SseEvent) -> Option<StreamChunk> {
        let v: Value = match serde_json::from_str(&event.data) {
            Ok(v) => v,
            Err(e) => {
                debug!(provider = PROVIDER_ID, error = %e, "skipping non-JSON stream frame");
                return None;
            }
        };

        // The JSON `type` mirrors the SSE `event:` line; prefer the payload.
        let event_type = v
            .get("type")
            .and_then(|t| t.as_str())
            .or(event.event.as_deref())
            .unwrap_or("");

        match event_type {
            "content_block_delta" => v
                .pointer("/delta/text")
                .and_then(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .map(StreamChunk::delta),
            "message_stop" => Some(StreamChunk::Done),
            "error" => {
                let message = v
                    .pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("stream error reported by provider");
                Some(StreamChunk::error(message))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl ProviderDriver for ClaudeDriver {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn chat(
        &self,
        messages: &[Message],
        cancel: Option<&CancellationToken>,
    ) -> Result<ChatResponse, ProviderError> {
        let body = self.build_body(messages, false);
        run_cancellable(PROVIDER_ID, cancel, async {
            let json = self.transport.post_json(MESSAGES_PATH, &body).await?;
            Self::parse_response(&json)
        })
        .await
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        cancel: Option<&CancellationToken>,
    ) -> Result<ChunkStream, ProviderError> {
        let body = self.build_body(messages, true);
        let bytes = run_cancellable(
            PROVIDER_ID,
            cancel,
            self.transport.post_stream(MESSAGES_PATH, &body),
        )
        .await?;
        Ok(chunk_stream(
            PROVIDER_ID,
            decode_sse(bytes),
            Self::parse_stream_event,
            cancel.cloned(),
        ))
    }

    async fn is_available(&self) -> bool {
        self.transport.probe(MODELS_PATH).await
    }
}
