//! OpenAI Chat Completions adapter.
//!
//! - `POST /v1/chat/completions` with bearer auth; roles are passed through.
//! - Streaming uses plain `data:` frames closed by `data: [DONE]`.
//! - Availability is a `GET /v1/models`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{chunk_stream, run_cancellable, ProviderDriver, ProviderKind, ProviderSettings};
use crate::error::ProviderError;
use crate::transport::{decode_sse, HttpTransport, SseEvent};
use crate::types::{ChatResponse, ChunkStream, Message, StreamChunk, Usage};

pub(crate) const DEFAULT_MODEL: &str = "gpt-4o";
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const PROVIDER_ID: &str = "openai";
const CHAT_PATH: &str = "/v1/chat/completions";
const MODELS_PATH: &str = "/v1/models";

/// OpenAI chat adapter.
#[derive(Debug)]
pub struct OpenAiDriver {
    settings: ProviderSettings,
    transport: HttpTransport,
}

impl OpenAiDriver {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let transport = HttpTransport::new(
            PROVIDER_ID,
            &settings.base_url_or(DEFAULT_BASE_URL),
            settings.timeout(),
            &[("authorization", format!("Bearer {}", settings.api_key))],
        )?;
        Ok(Self {
            settings,
            transport,
        })
    }

    fn build_body(&self, messages: &[Message], stream: bool) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.settings.model,
            "messages": messages,
            "stream": stream,
        });
        if let Some(t) = self.settings.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(mt) = self.settings.max_tokens {
            body["max_tokens"] = json!(mt);
        }
        body
    }

    fn parse_response(body: &Value) -> Result<ChatResponse, ProviderError> {
        let choice = body
            .pointer("/choices/0")
            .ok_or_else(|| ProviderError::malformed(PROVIDER_ID, "response has no choices"))?;

        // `content` is null when the model answered with tool calls only.
        let content = match choice.pointer("/message/content") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) => String::new(),
            _ => {
                return Err(ProviderError::malformed(
                    PROVIDER_ID,
                    "response choice has no message content",
                ))
            }
        };

        let mut response = ChatResponse::new(content);
        if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
            response = response.with_finish_reason(reason);
        }
        if let Some(u) = body.get("usage") {
            let usage = Usage {
                prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
                completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
                total_tokens: u["total_tokens"].as_u64().unwrap_or(0),
            };
            response = response.with_usage(usage);
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

        if let Some(err) = v.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("stream error reported by provider");
            return Some(StreamChunk::error(message));
        }

        v.pointer("/choices/0/delta/content")
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(StreamChunk::delta)
    }
}

#[async_trait]
impl ProviderDriver for OpenAiDriver {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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
            let json = self.transport.post_json(CHAT_PATH, &body).await?;
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
        let bytes =
            run_cancellable(PROVIDER_ID, cancel, self.transport.post_stream(CHAT_PATH, &body))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> OpenAiDriver {
        OpenAiDriver::new(
            ProviderSettings::for_kind(ProviderKind::OpenAi, "sk-test")
                .with_temperature(0.5)
                .with_max_tokens(1024),
        )
        .unwrap()
    }

    fn frame(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_openai_build_body_keeps_roles() {
        let body = driver().build_body(
            &[Message::system("Be brief."), Message::user("Hello")],
            true,
        );
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_openai_parse_response() {
        let body = json!({
            "choices": [{"message": {"content": "Hi there!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let resp = OpenAiDriver::parse_response(&body).unwrap();
        assert_eq!(resp.content, "Hi there!");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_openai_parse_response_without_choices_is_malformed() {
        let err = OpenAiDriver::parse_response(&json!({"object": "chat.completion"})).unwrap_err();
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_openai_parse_stream_delta() {
        let chunk = OpenAiDriver::parse_stream_event(&frame(
            r#"{"choices":[{"delta":{"content":"Hello"},"index":0}]}"#,
        ));
        assert_eq!(chunk, Some(StreamChunk::delta("Hello")));

        let role_only = OpenAiDriver::parse_stream_event(&frame(
            r#"{"choices":[{"delta":{"role":"assistant"},"index":0}]}"#,
        ));
        assert_eq!(role_only, None);
    }

    #[test]
    fn test_openai_parse_stream_error() {
        let chunk = OpenAiDriver::parse_stream_event(&frame(
            r#"{"error":{"message":"The server had an error"}}"#,
        ));
        assert_eq!(chunk, Some(StreamChunk::error("The server had an error")));
    }
}
