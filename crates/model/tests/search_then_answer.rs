//! Exercises the provider contract with a tiny hand-written provider that
//! asks for one search and then answers from the tool result.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll};

use research_agent_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ToolCallRequest, ToolCallResult, ToolChoice,
};
use serde_json::json;

#[derive(Debug)]
struct FakeError(ErrorKind);

impl Display for FakeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "fake provider failed: {}", self.0)
    }
}

impl Error for FakeError {}

impl ModelProviderError for FakeError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct FakeResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl ModelResponse for FakeResponse {
    type Error = FakeError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}

struct SearchThenAnswer;

impl ModelProvider for SearchThenAnswer {
    type Error = FakeError;
    type Response = FakeResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let evidence = req.messages.iter().find_map(|msg| match msg {
            ModelMessage::Tool(result) => Some(result.content.clone()),
            _ => None,
        });
        let result = match (evidence, req.tool_choice) {
            (_, _) if req.messages.is_empty() => {
                Err(FakeError(ErrorKind::Other))
            }
            (Some(evidence), _) => Ok(vec![
                ModelResponseEvent::MessageDelta(format!("Found: {evidence}")),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]),
            (None, ToolChoice::None) => Ok(vec![
                ModelResponseEvent::MessageDelta("No evidence.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]),
            (None, ToolChoice::Auto) => Ok(vec![
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "web_search".to_owned(),
                    arguments: json!({ "query": "rust release date" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]),
        };
        ready(result.map(|events| FakeResponse {
            events: events.into(),
        }))
    }
}

async fn collect(mut resp: FakeResponse) -> Vec<ModelResponseEvent> {
    let mut events = vec![];
    while let Some(event) = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
        .await
        .unwrap()
    {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_tool_call_then_answer() {
    let provider = SearchThenAnswer;
    let mut req = ModelRequest::new(
        vec![ModelMessage::User("When was Rust 1.0 released?".to_owned())],
        vec![],
    );

    let events = collect(provider.send_request(&req).await.unwrap()).await;
    let ModelResponseEvent::ToolCall(call) = &events[0] else {
        panic!("expected a tool call, got {events:?}");
    };
    assert_eq!(call.arguments["query"], "rust release date");
    assert_eq!(
        events.last(),
        Some(&ModelResponseEvent::Completed(ModelFinishReason::ToolCalls))
    );

    req.messages.push(ModelMessage::Tool(ToolCallResult {
        id: call.id.clone(),
        content: "2015-05-15".to_owned(),
    }));
    let events = collect(provider.send_request(&req).await.unwrap()).await;
    assert_eq!(
        events[0],
        ModelResponseEvent::MessageDelta("Found: 2015-05-15".to_owned())
    );
}

#[tokio::test]
async fn test_forced_answer_without_tools() {
    let provider = SearchThenAnswer;
    let mut req = ModelRequest::new(
        vec![ModelMessage::User("current headlines".to_owned())],
        vec![],
    );
    req.tool_choice = ToolChoice::None;
    let events = collect(provider.send_request(&req).await.unwrap()).await;
    assert_eq!(
        events[0],
        ModelResponseEvent::MessageDelta("No evidence.".to_owned())
    );
}

#[tokio::test]
async fn test_error() {
    let provider = SearchThenAnswer;
    let req = ModelRequest::new(vec![], vec![]);
    let err = provider.send_request(&req).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(!err.kind().is_transient());
}
