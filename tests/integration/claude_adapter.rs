use anyagok_ai::{Message, ProviderDriver, ProviderErrorKind, StreamChunk};
use futures::StreamExt;
use serde_json::json;

use crate::mock_server::{MockServerFixture, CLAUDE_KEY};

const PATH: &str = "/v1/messages";

#[tokio::test]
async fn test_claude_chat_hoists_system_messages() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", PATH)
        .match_header("x-api-key", CLAUDE_KEY)
        .match_header("anthropic-version", "2023-06-01")
        .match_body(mockito::Matcher::PartialJson(json!({
            "model": "claude-sonnet-4-20250514",
            "max_tokens": 4096,
            "system": "You write worksheets.\n\nUse Hungarian.",
            "messages": [{"role": "user", "content": [{"type": "text", "text": "Törtek"}]}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id":"msg_1","type":"message","role":"assistant",
                "content":[{"type":"text","text":"<h1>Törtek</h1>"}],
                "stop_reason":"end_turn",
                "usage":{"input_tokens":20,"output_tokens":7}}"#,
        )
        .create_async()
        .await;

    let resp = fixture
        .claude_driver()
        .chat(
            &[
                Message::system("You write worksheets."),
                Message::system("Use Hungarian."),
                Message::user("Törtek"),
            ],
            None,
        )
        .await
        .unwrap();

    assert_eq!(resp.content, "<h1>Törtek</h1>");
    assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    assert_eq!(resp.usage.unwrap().total_tokens, 27);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_claude_forbidden_is_auth_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(
            PATH,
            403,
            r#"{"type":"error","error":{"type":"permission_error","message":"Your API key does not have permission"}}"#,
        )
        .await;

    let err = fixture
        .claude_driver()
        .chat(&[Message::user("Hi")], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Auth);
    assert_eq!(err.message, "Your API key does not have permission");
}

#[tokio::test]
async fn test_claude_overloaded_is_retriable() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(
            PATH,
            529,
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .await;

    let err = fixture
        .claude_driver()
        .chat(&[Message::user("Hi")], None)
        .await
        .unwrap_err();
    assert!(err.is_retriable());
    assert_eq!(err.status(), Some(529));
}

#[tokio::test]
async fn test_claude_streaming_events() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_sse_stream(
            PATH,
            &[
                "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}",
                "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}",
                "event: ping\ndata: {\"type\":\"ping\"}",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}",
                "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}",
                "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}",
                "event: message_stop\ndata: {\"type\":\"message_stop\"}",
            ],
        )
        .await;

    let chunks: Vec<StreamChunk> = fixture
        .claude_driver()
        .stream_chat(&[Message::user("Hi")], None)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(
        chunks,
        vec![
            StreamChunk::delta("Hello"),
            StreamChunk::delta(" there"),
            StreamChunk::Done
        ]
    );
}

#[tokio::test]
async fn test_claude_mid_stream_error_is_terminal_chunk() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_sse_stream(
            PATH,
            &[
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Part\"}}",
                "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"ignored\"}}",
            ],
        )
        .await;

    let chunks: Vec<StreamChunk> = fixture
        .claude_driver()
        .stream_chat(&[Message::user("Hi")], None)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(
        chunks,
        vec![StreamChunk::delta("Part"), StreamChunk::error("Overloaded")]
    );
}

#[tokio::test]
async fn test_claude_availability_probe() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_models(200).await;
    assert!(fixture.claude_driver().is_available().await);
}
