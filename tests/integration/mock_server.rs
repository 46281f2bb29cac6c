//! Mock HTTP server setup for integration tests

use anyagok_ai::drivers::{ClaudeDriver, OpenAiDriver, ProviderKind, ProviderSettings};
use mockito::{Mock, Server, ServerGuard};
use std::time::Duration;

pub const OPENAI_KEY: &str = "sk-test-openai";
pub const CLAUDE_KEY: &str = "sk-ant-test";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    fn settings(&self, kind: ProviderKind, key: &str) -> ProviderSettings {
        ProviderSettings::for_kind(kind, key)
            .with_base_url(self.base_url.as_str())
            .with_timeout(Duration::from_secs(5))
    }

    pub fn openai_driver(&self) -> OpenAiDriver {
        OpenAiDriver::new(self.settings(ProviderKind::OpenAi, OPENAI_KEY)).unwrap()
    }

    pub fn claude_driver(&self) -> ClaudeDriver {
        ClaudeDriver::new(self.settings(ProviderKind::Claude, CLAUDE_KEY)).unwrap()
    }

    /// Create a mock for a JSON response (success or error status)
    pub async fn mock_json_response(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for a successful streaming response (SSE).
    ///
    /// Each frame is sent verbatim followed by a blank line.
    pub async fn mock_sse_stream(&mut self, path: &str, frames: &[&str]) -> Mock {
        let body: String = frames.iter().map(|f| format!("{f}\n\n")).collect();
        self.server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_models(&mut self, status: usize) -> Mock {
        self.server
            .mock("GET", "/v1/models")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await
    }
}
