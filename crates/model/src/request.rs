use serde_json::Value;

use crate::OpaqueMessage;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Whether the model may call the tools in this request.
    pub tool_choice: ToolChoice,
    /// How much of the run's turn budget has been used.
    ///
    /// Providers may forward it to the model or ignore it. The budget is
    /// enforced by the caller regardless.
    pub turn_budget: Option<TurnBudget>,
}

impl ModelRequest {
    /// Creates a request that lets the model call any of `tools`.
    #[inline]
    pub fn new(messages: Vec<ModelMessage>, tools: Vec<ModelTool>) -> Self {
        Self {
            messages,
            tools,
            tool_choice: ToolChoice::Auto,
            turn_budget: None,
        }
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// A tool call result.
    Tool(ToolCallResult),
    /// An opaque message (usually the history message from the model)
    Opaque(OpaqueMessage),
}

impl ModelMessage {
    /// Returns `true` if this message was produced by the model.
    #[inline]
    pub fn is_from_model(&self) -> bool {
        matches!(self, ModelMessage::Assistant(_) | ModelMessage::Opaque(_))
    }
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool, as a
    /// [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}

/// Controls whether the model may call tools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToolChoice {
    /// The model decides.
    #[default]
    Auto,
    /// The model must answer with text only.
    None,
}

/// Turn budget of a run, as seen by the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TurnBudget {
    /// Tool-invocation turns completed so far.
    pub completed: usize,
    /// The maximum number of tool-invocation turns.
    pub max: usize,
}

impl TurnBudget {
    /// Returns the number of turns left.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.completed)
    }

    /// Returns `true` if no turns are left.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_budget() {
        let budget = TurnBudget {
            completed: 3,
            max: 10,
        };
        assert_eq!(budget.remaining(), 7);
        assert!(!budget.is_exhausted());

        let budget = TurnBudget {
            completed: 10,
            max: 10,
        };
        assert!(budget.is_exhausted());

        let budget = TurnBudget {
            completed: 0,
            max: 0,
        };
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_new_request_defaults() {
        let req = ModelRequest::new(vec![ModelMessage::User("hi".into())], vec![]);
        assert_eq!(req.tool_choice, ToolChoice::Auto);
        assert_eq!(req.turn_budget, None);
        assert!(!req.messages[0].is_from_model());
    }
}
