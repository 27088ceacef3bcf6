use research_agent_model::ErrorKind;

/// A failure of the reasoning capability, with the provider error flattened
/// into its kind and message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({kind})")]
pub struct ModelError {
    kind: ErrorKind,
    message: String,
}

impl ModelError {
    /// Creates an error of `kind`.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the provider's description of the failure.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that end a run without an answer.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The query was empty or whitespace only.
    #[error("query must not be empty")]
    EmptyQuery,
    /// The reasoning capability failed, after retries where the failure
    /// was transient.
    #[error("reasoning capability failed: {0}")]
    Model(#[from] ModelError),
}
