//! The closed set of tools the model can call, and their execution.

use std::time::Duration;

use research_agent_model::{ModelTool, ToolCallRequest};
use research_agent_search::{ErrorKind, SearchProvider, SearchResults};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::retry::RetryPolicy;
use crate::search_client::{SearchClient, SearchError};

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SEARCH_ATTEMPTS: u32 = 2;

/// Identifies a tool the model can call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolDescriptor {
    /// Searches the web and returns ranked results with highlights.
    WebSearch,
}

impl ToolDescriptor {
    /// Every tool, in the order they are offered to the model.
    pub const ALL: &'static [ToolDescriptor] = &[ToolDescriptor::WebSearch];

    /// Returns the wire name of the tool.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            ToolDescriptor::WebSearch => "web_search",
        }
    }

    /// Looks a tool up by its wire name.
    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tool| tool.name() == name)
    }

    /// Returns the description shown to the model.
    pub fn description(self) -> &'static str {
        match self {
            ToolDescriptor::WebSearch => {
                "Search the web. Returns the most relevant pages for the \
                 query, each with its URL, title and highlighted excerpts. \
                 Call it several times in one turn to cover different \
                 angles of the question."
            }
        }
    }

    /// Returns the JSON schema of the tool's arguments.
    pub fn parameter_schema(self) -> Value {
        match self {
            ToolDescriptor::WebSearch => schema_for!(WebSearchInput).to_value(),
        }
    }

    /// Returns the definition sent to the model.
    pub fn definition(self) -> ModelTool {
        ModelTool {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameter_schema(),
        }
    }
}

/// Arguments of [`ToolDescriptor::WebSearch`].
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct WebSearchInput {
    /// The search query, phrased the way a person would type it into a
    /// search engine.
    pub query: String,
}

/// A decoded tool call, ready to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Invocation {
    WebSearch { query: String },
}

impl Invocation {
    #[inline]
    pub fn query(&self) -> &str {
        match self {
            Invocation::WebSearch { query } => query,
        }
    }
}

/// The result of one tool call.
#[derive(Clone, Debug)]
pub(crate) enum ToolOutput {
    Search {
        query: String,
        outcome: Result<SearchResults, SearchError>,
    },
    /// The call could not be dispatched.
    Rejected(String),
}

impl ToolOutput {
    /// Returns the number of hits of a successful search.
    #[inline]
    pub fn hit_count(&self) -> Option<usize> {
        match self {
            ToolOutput::Search {
                outcome: Ok(results),
                ..
            } => Some(results.hits.len()),
            _ => None,
        }
    }

    /// Renders the output as the content of a tool message.
    pub fn to_model_content(&self) -> String {
        match self {
            ToolOutput::Search {
                outcome: Ok(results),
                ..
            } => serde_json::to_string(results).unwrap_or_else(|err| {
                format!("Error: failed to encode search results: {err}")
            }),
            ToolOutput::Search {
                query,
                outcome: Err(err),
            } => format!(
                "Search unavailable for query \"{query}\" ({err}). Continue \
                 with the evidence you already have, or try a different query."
            ),
            ToolOutput::Rejected(reason) => format!("Error: {reason}"),
        }
    }
}

/// The tools available to a run, backed by one search provider.
///
/// Every search is bounded by a timeout, and transient failures are
/// retried before the search is reported as unavailable.
#[derive(Clone)]
pub struct Toolset {
    search: SearchClient,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Toolset {
    /// Creates a toolset searching with `provider`.
    #[inline]
    pub fn new<P: SearchProvider + 'static>(provider: P) -> Self {
        Self::with_client(SearchClient::new(provider))
    }

    /// Creates a toolset searching with `client`.
    pub fn with_client(client: SearchClient) -> Self {
        Self {
            search: client,
            timeout: DEFAULT_TOOL_TIMEOUT,
            retry: RetryPolicy::with_max_attempts(DEFAULT_SEARCH_ATTEMPTS),
        }
    }

    /// Sets the time limit of a single tool call, retries included.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how transient search failures are retried.
    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the tools offered to the model.
    #[inline]
    pub fn descriptors(&self) -> &'static [ToolDescriptor] {
        ToolDescriptor::ALL
    }

    /// Returns the tool definitions sent to the model.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.descriptors()
            .iter()
            .map(|tool| tool.definition())
            .collect()
    }

    /// Decodes a tool call requested by the model.
    pub(crate) fn prepare(
        &self,
        call: &ToolCallRequest,
    ) -> Result<Invocation, String> {
        let Some(tool) = ToolDescriptor::from_name(&call.name) else {
            return Err(format!("unknown tool `{}`", call.name));
        };
        match tool {
            ToolDescriptor::WebSearch => {
                let input: WebSearchInput = decode_arguments(&call.arguments)
                    .map_err(|err| {
                    format!("invalid arguments for `{}`: {err}", tool.name())
                })?;
                Ok(Invocation::WebSearch { query: input.query })
            }
        }
    }

    /// Runs a decoded tool call.
    ///
    /// The returned future does not borrow the toolset and is cancel safe.
    pub(crate) fn execute(
        &self,
        invocation: Invocation,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let Invocation::WebSearch { query } = invocation;
        let client = self.search.clone();
        let timeout = self.timeout;
        let retry = self.retry;
        async move {
            let attempts = retry.retry(
                "web search",
                || client.search(&query),
                |err: &SearchError| err.kind().is_transient(),
            );
            let outcome = match tokio::time::timeout(timeout, attempts).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SearchError::new(
                    ErrorKind::Timeout,
                    format!("no results within {timeout:?}"),
                )),
            };
            ToolOutput::Search { query, outcome }
        }
    }
}

/// Decodes tool arguments, which some providers pass as a JSON-encoded
/// string rather than an object.
fn decode_arguments<T: DeserializeOwned>(
    arguments: &Value,
) -> Result<T, serde_json::Error> {
    match arguments {
        Value::String(raw) => serde_json::from_str(raw),
        value => T::deserialize(value),
    }
}
