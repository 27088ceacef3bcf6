use std::sync::Arc;

use research_agent_model::ModelProvider;

use super::{Agent, EventHandler, RunOptions};
use crate::event::RunEvent;
use crate::model_client::ModelClient;
use crate::retry::RetryPolicy;
use crate::tool::Toolset;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    toolset: Option<Toolset>,
    options: RunOptions,
    on_event: Option<EventHandler>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            toolset: None,
            options: RunOptions::default(),
            on_event: None,
        }
    }

    /// Sets the tools the model can call. Without a toolset, every tool
    /// call is rejected.
    #[inline]
    pub fn with_toolset(mut self, toolset: Toolset) -> Self {
        self.toolset = Some(toolset);
        self
    }

    /// Replaces all run options.
    #[inline]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the maximum number of tool-invocation turns per run.
    #[inline]
    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.options.max_turns = max_turns;
        self
    }

    /// Sets how transient model failures are retried.
    #[inline]
    pub fn model_retry(mut self, policy: RetryPolicy) -> Self {
        self.options.model_retry = policy;
        self
    }

    /// Attaches a callback that observes the progress of every run.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(&RunEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        let AgentBuilder {
            model_client,
            toolset,
            options,
            on_event,
        } = self;
        Agent {
            model_client,
            toolset,
            options,
            on_event,
        }
    }
}
