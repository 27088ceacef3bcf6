use std::fmt::{self, Debug};
use std::time::Duration;

use research_agent_core::{TemplateError, TemplateSource};

/// The instruction template used when none is configured.
pub const BUILTIN_TEMPLATE: &str = include_str!("system_prompt.md");

const DEFAULT_MAX_TURNS: usize = 10;
pub(crate) const DEFAULT_LANGUAGE: &str = "Chinese";
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required credential is missing or blank.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    /// The turn budget must allow at least one turn.
    #[error("max turns must be at least 1")]
    InvalidMaxTurns,
    /// The instruction template cannot be loaded.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Everything needed to set up a research session.
#[derive(Clone)]
pub struct ResearchConfig {
    /// Credential of the Exa search API.
    pub exa_api_key: String,
    /// Overrides the Exa API base URL.
    pub exa_base_url: Option<String>,
    /// Credential of the OpenAI-compatible model API.
    pub openai_api_key: String,
    /// Overrides the model API base URL.
    pub openai_base_url: Option<String>,
    /// Overrides the model name.
    pub model: Option<String>,
    /// Maximum number of search turns per query.
    pub max_turns: usize,
    /// The language answers are written in.
    pub output_language: String,
    /// Where the instruction template comes from.
    pub instructions: TemplateSource,
    /// Time limit of one search, retries included.
    pub tool_timeout: Duration,
}

impl ResearchConfig {
    /// Creates a configuration with the given credentials and defaults for
    /// everything else.
    pub fn new<E, O>(exa_api_key: E, openai_api_key: O) -> Self
    where
        E: Into<String>,
        O: Into<String>,
    {
        Self {
            exa_api_key: exa_api_key.into(),
            exa_base_url: None,
            openai_api_key: openai_api_key.into(),
            openai_base_url: None,
            model: None,
            max_turns: DEFAULT_MAX_TURNS,
            output_language: DEFAULT_LANGUAGE.to_owned(),
            instructions: TemplateSource::Literal(BUILTIN_TEMPLATE.to_owned()),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Checks the settings that can be checked without any I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exa_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("EXA_API_KEY"));
        }
        if self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("OPENAI_API_KEY"));
        }
        if self.max_turns == 0 {
            return Err(ConfigError::InvalidMaxTurns);
        }
        Ok(())
    }
}

impl Debug for ResearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchConfig")
            .field("exa_api_key", &"<redacted>")
            .field("exa_base_url", &self.exa_base_url)
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("max_turns", &self.max_turns)
            .field("output_language", &self.output_language)
            .field("tool_timeout", &self.tool_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(ResearchConfig::new("exa", "sk").validate().is_ok());

        let err = ResearchConfig::new("  ", "sk").validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("EXA_API_KEY")));

        let err = ResearchConfig::new("exa", "").validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential("OPENAI_API_KEY")
        ));

        let mut config = ResearchConfig::new("exa", "sk");
        config.max_turns = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxTurns)
        ));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = ResearchConfig::new("exa-secret", "sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("exa-secret"));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("Chinese"));
    }

    #[test]
    fn test_builtin_template_markers() {
        for key in [
            "{{CURRENT_DATETIME}}",
            "{{OUTPUT_LANGUAGE}}",
            "{{MAX_TURNS}}",
            "{{SEARCH_TOOL}}",
        ] {
            assert!(BUILTIN_TEMPLATE.contains(key), "{key} is missing");
        }
    }
}
