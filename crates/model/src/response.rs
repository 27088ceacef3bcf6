use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpaqueMessage;
use crate::provider::ModelProviderError;

/// A streamed reply of the reasoning capability.
///
/// A reply is a sequence of events. Answer text arrives in
/// [`ModelResponseEvent::MessageDelta`] pieces as soon as the provider has
/// them, so a caller can show progress. Tool calls are only surfaced once
/// their arguments are complete, each as one
/// [`ModelResponseEvent::ToolCall`]. The last event is
/// [`ModelResponseEvent::Completed`], after which the stream ends.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event of the reply.
    ///
    /// Returns `Poll::Pending` while the provider has not produced the next
    /// event yet, and wakes the task once it may have. `Ok(Some(_))`
    /// carries one event, `Ok(None)` means the stream has ended and keeps
    /// being returned afterwards. An `Err` aborts the reply, and the loop
    /// treats the whole request as failed, including any text streamed
    /// before the error.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;

    /// Returns the reply in the provider's own message format, to be sent
    /// back verbatim in the next request of the run.
    ///
    /// Only meaningful once the stream has ended. Providers that cannot
    /// round-trip their messages return `None`, and the loop falls back to
    /// a plain assistant message built from the streamed text.
    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        None
    }
}

/// Why the reasoning capability stopped producing a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The reply asks for searches; another turn follows.
    ToolCalls,
    /// The reply is a final answer.
    Stop,
}

/// One search (or other tool) the model asked for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Id chosen by the model; the tool result must echo it.
    pub id: String,
    /// Wire name of the requested tool, such as `web_search`.
    pub name: String,
    /// Decoded JSON arguments. Arguments that were not valid JSON are kept
    /// as a JSON string so the loop can reject them.
    pub arguments: Value,
}

/// An event of a [`ModelResponse`] stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The reply is over, for the given reason.
    Completed(ModelFinishReason),
    /// A piece of answer text.
    MessageDelta(String),
    /// A fully assembled tool call.
    ToolCall(ToolCallRequest),
}
