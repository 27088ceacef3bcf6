use std::collections::HashMap;
use std::time::Duration;

use chrono::Local;
use research_agent_core::{
    Agent, AgentBuilder, FinalAnswer, Instructions, RunError, RunEvent,
    RunOptions, TemplateSource, ToolDescriptor, Toolset, instructions,
};
use research_agent_exa_search::{ExaConfigBuilder, ExaProvider};
use research_agent_model::ModelProvider;
use research_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use research_agent_search::SearchProvider;

use crate::config::{
    BUILTIN_TEMPLATE, ConfigError, DEFAULT_LANGUAGE, ResearchConfig,
};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Errors of [`Session::run_once`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session is misconfigured, nothing was run.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The run failed.
    #[error(transparent)]
    Run(#[from] RunError),
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    toolset: Toolset,
    template: TemplateSource,
    output_language: String,
    max_turns: usize,
}

impl SessionBuilder {
    /// Creates a session builder with the specified providers.
    pub fn with_providers<M, S>(model_provider: M, search_provider: S) -> Self
    where
        M: ModelProvider + 'static,
        S: SearchProvider + 'static,
    {
        Self {
            agent_builder: AgentBuilder::with_model_provider(model_provider),
            toolset: Toolset::new(search_provider),
            template: TemplateSource::Literal(BUILTIN_TEMPLATE.to_owned()),
            output_language: DEFAULT_LANGUAGE.to_owned(),
            max_turns: RunOptions::default().max_turns,
        }
    }

    /// Creates a session builder backed by the OpenAI-compatible model and
    /// Exa search providers described by `config`.
    pub fn from_config(config: &ResearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut openai =
            OpenAIConfigBuilder::with_api_key(&config.openai_api_key);
        if let Some(base_url) = &config.openai_base_url {
            openai = openai.with_base_url(base_url);
        }
        if let Some(model) = &config.model {
            openai = openai.with_model(model);
        }

        let mut exa = ExaConfigBuilder::with_api_key(&config.exa_api_key);
        if let Some(base_url) = &config.exa_base_url {
            exa = exa.with_base_url(base_url);
        }

        debug!("creating session with {config:?}");
        Ok(Self::with_providers(
            OpenAIProvider::new(openai.build()),
            ExaProvider::new(exa.build()),
        )
        .with_template(config.instructions.clone())
        .with_output_language(&config.output_language)
        .max_turns(config.max_turns)
        .tool_timeout(config.tool_timeout))
    }

    /// Sets where the instruction template comes from.
    #[inline]
    pub fn with_template(mut self, template: TemplateSource) -> Self {
        self.template = template;
        self
    }

    /// Sets the language answers are written in.
    #[inline]
    pub fn with_output_language<S: Into<String>>(
        mut self,
        language: S,
    ) -> Self {
        self.output_language = language.into();
        self
    }

    /// Sets the maximum number of search turns per query.
    #[inline]
    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sets the time limit of one search.
    #[inline]
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.toolset = self.toolset.with_timeout(timeout);
        self
    }

    /// Attaches a callback that observes the progress of every query.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(&RunEvent) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_event(on_event);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let agent = self
            .agent_builder
            .with_toolset(self.toolset)
            .max_turns(self.max_turns)
            .build();

        Session {
            agent,
            template: self.template,
            output_language: self.output_language,
        }
    }
}

/// A research session, answering one query after another.
///
/// Queries are independent of each other: every run starts from the
/// instructions and the query alone, and the instructions are rendered
/// again for every run so they carry the current date and time.
#[derive(Clone)]
pub struct Session {
    agent: Agent,
    template: TemplateSource,
    output_language: String,
}

impl Session {
    /// Renders the instructions for a run starting now.
    pub fn instructions(&self) -> Result<Instructions, ConfigError> {
        let variables = HashMap::from([
            (
                "CURRENT_DATETIME".to_owned(),
                Local::now().format(DATETIME_FORMAT).to_string(),
            ),
            ("OUTPUT_LANGUAGE".to_owned(), self.output_language.clone()),
            (
                "MAX_TURNS".to_owned(),
                self.agent.options().max_turns.to_string(),
            ),
            (
                "SEARCH_TOOL".to_owned(),
                ToolDescriptor::WebSearch.name().to_owned(),
            ),
        ]);
        Ok(instructions::build(&self.template, &variables)?)
    }

    /// Researches `query` and returns the answer.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. Dropping the future aborts every search
    /// that is still running.
    pub async fn run_once(
        &self,
        query: &str,
    ) -> Result<FinalAnswer, SessionError> {
        let instructions = self.instructions()?;
        let answer = self.agent.run(&instructions, query).await?;
        info!(
            turns = answer.turns(),
            termination = %answer.termination(),
            "query answered"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use research_agent_core::{Termination, TemplateError};
    use research_agent_model::ModelMessage;
    use research_agent_search::{ErrorKind, SearchHit};
    use research_agent_testing::{
        PresetResponse, TestModelProvider, TestSearchProvider,
    };

    use super::*;

    fn system_prompt(model: &TestModelProvider) -> String {
        let requests = model.requests();
        match &requests[0].messages[0] {
            ModelMessage::System(text) => text.clone(),
            other => panic!("unexpected first message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_template_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let model = TestModelProvider::default();
        let search = TestSearchProvider::default();
        let session =
            SessionBuilder::with_providers(model.clone(), search.clone())
                .with_template(TemplateSource::File(
                    dir.path().join("missing.md"),
                ))
                .build();

        let err = session.run_once("What is Rust?").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Config(ConfigError::Template(
                TemplateError::NotFound(_)
            ))
        ));
        assert_eq!(search.call_count(), 0);
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_instructions_are_rendered_per_run() {
        let mut model = TestModelProvider::default();
        model.add_response_step(PresetResponse::search(["rust 1.0"]));
        model.add_response_step(PresetResponse::answer(
            "Rust 1.0 came out in May 2015 (https://blog.rust-lang.org/).",
        ));
        let mut search = TestSearchProvider::default();
        search.add_hits(
            "rust 1.0",
            vec![SearchHit::new(
                "https://blog.rust-lang.org/",
                "Rust Blog",
                ["Announcing Rust 1.0"],
            )],
        );

        let session = SessionBuilder::with_providers(model.clone(), search)
            .with_template(TemplateSource::Literal(
                "Answer in {{OUTPUT_LANGUAGE}} within {{MAX_TURNS}} turns \
                 using {{SEARCH_TOOL}}. Now: {{CURRENT_DATETIME}}. \
                 {{UNKNOWN}}"
                    .to_owned(),
            ))
            .with_output_language("English")
            .max_turns(4)
            .build();

        let answer = session.run_once("When was Rust 1.0?").await.unwrap();
        assert_eq!(answer.termination(), Termination::Completed);
        assert_eq!(answer.cited_urls(), ["https://blog.rust-lang.org/"]);

        let prompt = system_prompt(&model);
        assert!(prompt.starts_with(
            "Answer in English within 4 turns using web_search. Now: "
        ));
        assert!(!prompt.contains("{{CURRENT_DATETIME}}"));
        assert!(prompt.ends_with("{{UNKNOWN}}"));
    }

    #[tokio::test]
    async fn test_search_outage_still_answers() {
        let mut model = TestModelProvider::default();
        model.add_response_step(PresetResponse::search(["headlines"]));
        model.set_fallback(PresetResponse::answer("Nothing could be found."));
        let mut search = TestSearchProvider::default();
        search.fail_by_default(ErrorKind::Unauthorized);

        let session =
            SessionBuilder::with_providers(model, search.clone()).build();
        let answer = session.run_once("Today's headlines").await.unwrap();
        assert!(!answer.text().is_empty());
        assert!(answer.evidence().is_degraded());
        assert_eq!(search.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_query() {
        let session = SessionBuilder::with_providers(
            TestModelProvider::default(),
            TestSearchProvider::default(),
        )
        .build();
        let err = session.run_once("   ").await.unwrap_err();
        assert!(matches!(err, SessionError::Run(RunError::EmptyQuery)));
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = ResearchConfig::new("exa", "sk");
        config.max_turns = 0;
        assert!(matches!(
            SessionBuilder::from_config(&config),
            Err(ConfigError::InvalidMaxTurns)
        ));

        let config = ResearchConfig::new("exa", "sk");
        let session = SessionBuilder::from_config(&config).unwrap().build();
        let prompt = session.instructions().unwrap();
        assert!(prompt.as_str().contains("Chinese"));
        assert!(prompt.as_str().contains("`web_search`"));
    }
}
