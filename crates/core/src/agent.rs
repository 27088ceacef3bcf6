mod builder;
mod state;

use std::sync::Arc;

use research_agent_model::ModelProvider;
use tracing::Instrument;

use crate::answer::FinalAnswer;
use crate::error::RunError;
use crate::event::RunEvent;
use crate::instructions::Instructions;
use crate::model_client::ModelClient;
use crate::retry::RetryPolicy;
use crate::tool::Toolset;
pub use builder::AgentBuilder;
use state::RunState;

const DEFAULT_MAX_TURNS: usize = 10;

pub(crate) type EventHandler = Arc<dyn Fn(&RunEvent) + Send + Sync>;

/// Limits of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of tool-invocation turns. Once reached, the agent
    /// stops searching and answers from the evidence it has.
    pub max_turns: usize,
    /// How transient failures of the reasoning capability are retried.
    pub model_retry: RetryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            model_retry: RetryPolicy::default(),
        }
    }
}

/// A research agent.
///
/// The agent holds no state between runs, so one agent can serve any
/// number of queries, concurrently or not. Each run alternates between
/// asking the model what to do and running the searches it asks for,
/// until the model answers or the turn budget runs out.
#[derive(Clone)]
pub struct Agent {
    model_client: ModelClient,
    toolset: Option<Toolset>,
    options: RunOptions,
    on_event: Option<EventHandler>,
}

impl Agent {
    /// Researches `query` and returns the answer.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. Dropping the future aborts every search
    /// that is still running.
    pub async fn run(
        &self,
        instructions: &Instructions,
        query: &str,
    ) -> Result<FinalAnswer, RunError> {
        if query.trim().is_empty() {
            return Err(RunError::EmptyQuery);
        }
        let span = info_span!("run", max_turns = self.options.max_turns);
        let state = RunState::new(instructions, query);
        state::drive(self, state).instrument(span).await
    }

    /// Returns the limits of every run.
    #[inline]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    fn emit(&self, event: RunEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(&event);
        }
    }
}

/// Runs a single query with a one-off agent.
pub async fn run_once<P: ModelProvider + 'static>(
    provider: P,
    instructions: &Instructions,
    toolset: Toolset,
    query: &str,
    max_turns: usize,
) -> Result<FinalAnswer, RunError> {
    AgentBuilder::with_model_provider(provider)
        .with_toolset(toolset)
        .max_turns(max_turns)
        .build()
        .run(instructions, query)
        .await
}
