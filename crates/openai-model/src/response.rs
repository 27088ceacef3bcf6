use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use research_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use serde_json::Value;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{ChatCompletionChunk, FunctionToolCall, Message, ToolCall};

/// Everything received so far, plus events decided but not yet delivered.
///
/// Tool calls are streamed as fragments keyed by index. They are only
/// turned into events once the response finishes, so every emitted call
/// has its complete arguments.
struct PartialState {
    sse: Sse,
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<ToolCall>,
    pending: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl PartialState {
    fn new(sse: Sse) -> Self {
        Self {
            sse,
            id: None,
            content: String::new(),
            reasoning_content: None,
            tool_calls: vec![],
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn apply_chunk(
        &mut self,
        mut chunk: ChatCompletionChunk,
    ) -> Result<(), Error> {
        if !chunk.id.is_empty()
            && self.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        // Only one choice is requested; the usage chunk has none.
        let Some(choice) = chunk.choices.pop() else {
            return Ok(());
        };

        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                self.content.push_str(&content);
                self.pending
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
        }
        if let Some(reasoning_content) = &choice.delta.reasoning_content {
            self.reasoning_content
                .get_or_insert_default()
                .push_str(reasoning_content);
        }
        for fragment in choice.delta.tool_calls.into_iter().flatten() {
            self.merge_tool_call(fragment);
        }

        match choice.finish_reason.as_deref() {
            None => {}
            Some("content_filter") => {
                return Err(Error::new(
                    "the response was blocked by the content filter",
                    ErrorKind::Moderated,
                ));
            }
            Some(reason) => {
                let reason = if reason == "tool_calls" {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                };
                self.finish(Some(reason));
            }
        }
        Ok(())
    }

    fn merge_tool_call(&mut self, fragment: ToolCall) {
        let Some(partial) = self
            .tool_calls
            .iter_mut()
            .find(|t| t.index == fragment.index)
        else {
            self.tool_calls.push(fragment);
            return;
        };
        if let Some(id) = fragment.id {
            partial.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = fragment.r#type {
            partial.r#type = Some(ty);
        }
        let Some(function) = fragment.function else {
            return;
        };
        let partial_func = partial.function.get_or_insert_default();
        if let Some(name) = function.name {
            partial_func.name.get_or_insert_default().push_str(&name);
        }
        if let Some(arguments) = function.arguments {
            partial_func
                .arguments
                .get_or_insert_default()
                .push_str(&arguments);
        }
    }

    /// Queues the complete tool calls and the completion event. Only the
    /// first call has any effect.
    fn finish(&mut self, reason: Option<ModelFinishReason>) {
        if self.finished {
            return;
        }
        self.finished = true;

        for tool_call in &mut self.tool_calls {
            tool_call.r#type.get_or_insert_with(|| "function".to_owned());
            let function = tool_call.function.get_or_insert_default();
            self.pending
                .push_back(ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: tool_call.id.clone().unwrap_or_default(),
                    name: function.name.clone().unwrap_or_default(),
                    arguments: decode_arguments(function),
                }));
        }

        let reason = reason.unwrap_or(if self.tool_calls.is_empty() {
            ModelFinishReason::Stop
        } else {
            ModelFinishReason::ToolCalls
        });
        self.pending.push_back(ModelResponseEvent::Completed(reason));
    }

    fn into_message(self) -> (String, Message) {
        let tool_calls = if self.tool_calls.is_empty() {
            None
        } else {
            Some(self.tool_calls)
        };
        let content = if self.content.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(self.content)
        };
        // Some compatible servers send no chunk ids.
        let id = self.id.unwrap_or_default();
        let msg = Message::Assistant {
            content,
            tool_calls,
            reasoning_content: self.reasoning_content,
        };
        (id, msg)
    }
}

/// Decodes streamed arguments. Arguments that are not valid JSON are
/// passed on as a string, so the caller can report them to the model.
fn decode_arguments(function: &FunctionToolCall) -> Value {
    let raw = function.arguments.as_deref().unwrap_or_default();
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!("tool call arguments are not valid JSON: {err}");
        Value::String(raw.to_owned())
    })
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        full_msg: Option<(String, Message)>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState::new(sse);
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
            full_msg: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    *this.next_event_fut = None;
                    *this.full_msg = Some(partial_state.into_message());
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));
        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id, msg.clone()))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            // Drain the stream so that the connection can be reused.
            while let Ok(Some(_)) = partial_state.sse.next_event().await {}
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("stream ended without a finish reason");
                partial_state.finish(None);
                continue;
            }
            Err(SseError::ChunksError(err)) => {
                return Err(Error::new(
                    format!("connection lost while streaming: {}", err.message),
                    ErrorKind::Unavailable,
                ));
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.finish(None);
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| {
                Error::new(format!("invalid chunk: {err}"), ErrorKind::Other)
            })?;
        partial_state.apply_chunk(chunk)?;
    }
}
