use std::future::poll_fn;
use std::pin::pin;

use research_agent_model::{
    ErrorKind, ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, ModelTool, ToolChoice,
};
use research_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOOL_CALL_STREAM: &[u8] =
    include_bytes!("../fixtures/tool_call_stream.txt");

fn provider(server: &MockServer) -> OpenAIProvider {
    let config = OpenAIConfigBuilder::with_api_key("sk-test")
        .with_model("test-model")
        .with_base_url(format!("{}/v1", server.uri()))
        .build();
    OpenAIProvider::new(config)
}

fn request() -> ModelRequest {
    ModelRequest::new(
        vec![
            ModelMessage::System("Research things.".to_owned()),
            ModelMessage::User("When was Rust 1.0 released?".to_owned()),
        ],
        vec![ModelTool {
            name: "web_search".to_owned(),
            description: "Search the web.".to_owned(),
            parameters: json!({ "type": "object" }),
        }],
    )
}

#[tokio::test]
async fn test_streamed_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": true,
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(TOOL_CALL_STREAM, "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = provider(&server).send_request(&request()).await.unwrap();
    let mut resp = pin!(resp);
    let mut queries = vec![];
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .unwrap()
    {
        if let ModelResponseEvent::ToolCall(call) = event {
            queries.push(call.arguments["query"].as_str().unwrap().to_owned());
        }
    }
    assert_eq!(queries, ["rust 1.0 release", "rust 2024 edition"]);
    assert!(resp.make_opaque_message().is_some());
}

#[tokio::test]
async fn test_forced_synthesis_sends_tool_choice_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "tool_choice": "none" })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"id\":\"c\",\"choices\":[{\"delta\":{\"content\":\"Done\"},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n",
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut req = request();
    req.tool_choice = ToolChoice::None;
    let resp = provider(&server).send_request(&req).await.unwrap();
    let mut resp = pin!(resp);
    let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .unwrap();
    assert_eq!(
        event,
        Some(ModelResponseEvent::MessageDelta("Done".to_owned()))
    );
}

#[tokio::test]
async fn test_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = provider.send_request(&request()).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    assert!(err.message().contains("Rate limit reached"));

    let err = provider.send_request(&request()).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}

#[tokio::test]
async fn test_unexpected_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })),
        )
        .mount(&server)
        .await;

    let err = provider(&server)
        .send_request(&request())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(err.message().contains("unexpected content type"));
}

#[tokio::test]
async fn test_unreachable_server() {
    let config = OpenAIConfigBuilder::with_api_key("sk-test")
        .with_base_url("http://127.0.0.1:9")
        .build();
    let err = OpenAIProvider::new(config)
        .send_request(&request())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}
