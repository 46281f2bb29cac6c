use anyagok_ai::{Message, ProviderDriver, ProviderErrorKind, StreamChunk};
use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;

use crate::mock_server::{MockServerFixture, OPENAI_KEY};

const PATH: &str = "/v1/chat/completions";

#[tokio::test]
async fn test_openai_chat_success() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", PATH)
        .match_header("authorization", format!("Bearer {OPENAI_KEY}").as_str())
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hi"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"},"finish_reason":"stop"}],
                "usage":{"prompt_tokens":9,"completion_tokens":3,"total_tokens":12}}"#,
        )
        .create_async()
        .await;

    let driver = fixture.openai_driver();
    let resp = driver
        .chat(&[Message::system("Be brief."), Message::user("Hi")], None)
        .await
        .unwrap();

    assert_eq!(resp.content, "Hello!");
    assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    assert_eq!(resp.usage.unwrap().total_tokens, 12);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_openai_unauthorized_is_auth_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(
            PATH,
            401,
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        )
        .await;

    let err = fixture
        .openai_driver()
        .chat(&[Message::user("Hi")], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Auth);
    assert!(err.is_fatal());
    assert_eq!(err.message, "Incorrect API key provided");
    assert_eq!(err.provider, "openai");
}

#[tokio::test]
async fn test_openai_rate_limit_is_retriable() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(PATH, 429, r#"{"error":{"message":"Rate limit reached"}}"#)
        .await;

    let err = fixture
        .openai_driver()
        .chat(&[Message::user("Hi")], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::RateLimit);
    assert!(err.is_retriable());
}

#[tokio::test]
async fn test_openai_server_error_keeps_status() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(PATH, 500, r#"{"error":{"message":"The server had an error"}}"#)
        .await;

    let err = fixture
        .openai_driver()
        .chat(&[Message::user("Hi")], None)
        .await
        .unwrap_err();
    assert!(err.is_retriable());
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("The server had an error"));
}

#[tokio::test]
async fn test_openai_bad_request_is_not_retriable() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(PATH, 400, r#"{"error":{"message":"context_length_exceeded"}}"#)
        .await;

    let err = fixture
        .openai_driver()
        .chat(&[Message::user("Hi")], None)
        .await
        .unwrap_err();
    assert!(!err.is_retriable());
    assert!(!err.is_fatal());
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_openai_invalid_json_body_is_malformed() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json_response(PATH, 200, "<html>oops</html>").await;

    let err = fixture
        .openai_driver()
        .chat(&[Message::user("Hi")], None)
        .await
        .unwrap_err();
    assert!(!err.is_retriable());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_openai_streaming_deltas() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_sse_stream(
            PATH,
            &[
                r#"data: {"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
                r#"data: {"choices":[{"index":0,"delta":{"content":"Szia"}}]}"#,
                r#"data: {"choices":[{"index":0,"delta":{"content":" világ"}}]}"#,
                r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
                "data: [DONE]",
            ],
        )
        .await;

    let stream = fixture
        .openai_driver()
        .stream_chat(&[Message::user("Hi")], None)
        .await
        .unwrap();
    let chunks: Vec<StreamChunk> = stream.collect().await;
    assert_eq!(
        chunks,
        vec![
            StreamChunk::delta("Szia"),
            StreamChunk::delta(" világ"),
            StreamChunk::Done
        ]
    );
}

#[tokio::test]
async fn test_openai_stream_start_failure_is_err() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(PATH, 503, r#"{"error":{"message":"overloaded"}}"#)
        .await;

    let result = fixture
        .openai_driver()
        .stream_chat(&[Message::user("Hi")], None)
        .await;
    let err = result.err().unwrap();
    assert!(err.is_retriable());
}

#[tokio::test]
async fn test_openai_availability_probe() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/v1/models")
        .match_header("authorization", format!("Bearer {OPENAI_KEY}").as_str())
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;

    assert!(fixture.openai_driver().is_available().await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_openai_availability_false_on_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_models(401).await;
    assert!(!fixture.openai_driver().is_available().await);
}
