use std::collections::{HashMap, VecDeque};
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use research_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage, ToolChoice,
};
use tokio::time::{Sleep, sleep};

use crate::preset::{PresetEvent, PresetResponse};

#[derive(Debug)]
pub struct TestModelError {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for TestModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for TestModelError {}

impl ModelProviderError for TestModelError {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    opaque_id: String,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = TestModelError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.events.is_empty() {
            return Poll::Ready(Ok(None));
        }

        // Every event is delivered after a short delay, so the consumer
        // really has to suspend between events.
        let delay = this.delay;
        let timer = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(timer.as_mut().poll(cx));
        this.sleep = None;

        Poll::Ready(Ok(this.events.pop_front()))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        Some(OpaqueMessage::new(&self.opaque_id, self.opaque_id.clone()))
    }
}

#[derive(Default)]
struct Recorder {
    attempts: HashMap<StepKey, u64>,
    requests: Vec<ModelRequest>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum StepKey {
    Reasoning(usize),
    Synthesis,
}

/// A local fake model for testing purpose.
///
/// The script is a list of responses, one per reasoning step. The step of a
/// request is the number of model-produced messages already in it, so the
/// first request of a run gets the first response, the request after one
/// tool turn gets the second, and so on. Requests with
/// [`ToolChoice::None`] get the synthesis response instead, if one is set.
/// When the script runs out, the fallback response is used; without a
/// fallback the request fails.
///
/// Clones share the recorded requests and failure counters.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    synthesis: Option<PresetResponse>,
    fallback: Option<PresetResponse>,
    delay: Option<Duration>,
    recorder: Arc<Mutex<Recorder>>,
}

impl TestModelProvider {
    /// Appends the response for the next reasoning step.
    #[inline]
    pub fn add_response_step(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Sets the response for forced synthesis requests.
    #[inline]
    pub fn set_synthesis(&mut self, preset: PresetResponse) {
        self.synthesis = Some(preset);
    }

    /// Sets the response used once the script runs out.
    #[inline]
    pub fn set_fallback(&mut self, preset: PresetResponse) {
        self.fallback = Some(preset);
    }

    /// Sets the delay before each streamed event.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorder> {
        // A panicking test thread must not hide the recorded requests.
        self.recorder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn select(&self, req: &ModelRequest) -> Option<(StepKey, &PresetResponse)> {
        if req.tool_choice == ToolChoice::None {
            if let Some(synthesis) = &self.synthesis {
                return Some((StepKey::Synthesis, synthesis));
            }
        }
        let step = req.messages.iter().filter(|m| m.is_from_model()).count();
        let preset = self.script.get(step).or(self.fallback.as_ref())?;
        Some((StepKey::Reasoning(step), preset))
    }

    fn respond(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, TestModelError> {
        let mut recorder = self.lock();
        recorder.requests.push(req.clone());

        let Some((key, preset)) = self.select(req) else {
            return Err(TestModelError {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };

        let attempts = recorder.attempts.entry(key).or_default();
        *attempts += 1;
        match preset.failures {
            Some(0) => {
                return Err(TestModelError {
                    message: "model is down",
                    kind: ErrorKind::Unavailable,
                });
            }
            Some(failures) if *attempts <= failures => {
                return Err(TestModelError {
                    message: "try again later",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
            _ => {}
        }

        let mut events: VecDeque<_> = preset
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            })
            .collect();
        events.push_back(ModelResponseEvent::Completed(
            if preset.has_tool_call() {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            },
        ));

        Ok(TestModelResponse {
            events,
            opaque_id: format!("msg:{}", req.messages.len()),
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = TestModelError;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.respond(req))
    }
}
