use research_agent_model::ToolCallRequest;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// The preset response for one reasoning step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    #[serde(default)]
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// A response that answers with `text` and calls no tools.
    #[inline]
    pub fn answer<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// A response that calls the `web_search` tool once per query, with
    /// ids `call_1`, `call_2`, and so on.
    pub fn search<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let events: Vec<_> = queries
            .into_iter()
            .enumerate()
            .map(|(idx, query)| {
                PresetEvent::ToolCall(ToolCallRequest {
                    id: format!("call_{}", idx + 1),
                    name: "web_search".to_owned(),
                    arguments: json!({ "query": query.into() }),
                })
            })
            .collect();
        Self::with_events(events)
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    pub(crate) fn has_tool_call(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_events([
            PresetEvent::MessageDelta("Let me look that up.".to_string()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "1".to_string(),
                name: "web_search".to_string(),
                arguments: json!({ "query": "tokio 1.0 release" }),
            }),
        ]);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
        assert!(deserialized.has_tool_call());
    }

    #[test]
    fn test_search_helper() {
        let response = PresetResponse::search(["a", "b"]);
        let ids: Vec<_> = response
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::ToolCall(req) => req.id.as_str(),
                PresetEvent::MessageDelta(_) => unreachable!(),
            })
            .collect();
        assert_eq!(ids, ["call_1", "call_2"]);
        assert!(!PresetResponse::answer("done").has_tool_call());
    }
}
