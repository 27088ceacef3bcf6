use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use research_agent_search::{
    ErrorKind, SearchHit, SearchProvider, SearchProviderError, SearchResults,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSearchError {
    kind: ErrorKind,
}

impl TestSearchError {
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl Display for TestSearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "scripted search failure: {}", self.kind)
    }
}

impl StdError for TestSearchError {}

impl SearchProviderError for TestSearchError {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

type Outcome = Result<Vec<SearchHit>, ErrorKind>;

/// A scripted search capability.
///
/// Answers are looked up by exact query; unknown queries get the default
/// answer, which is an empty result list unless changed. Every query is
/// recorded, and clones share the record.
#[derive(Clone)]
pub struct TestSearchProvider {
    answers: HashMap<String, Outcome>,
    default: Outcome,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for TestSearchProvider {
    fn default() -> Self {
        Self {
            answers: HashMap::new(),
            default: Ok(vec![]),
            delay: None,
            calls: Default::default(),
        }
    }
}

impl TestSearchProvider {
    /// Answers `query` with `hits`.
    #[inline]
    pub fn add_hits<S: Into<String>>(
        &mut self,
        query: S,
        hits: Vec<SearchHit>,
    ) {
        self.answers.insert(query.into(), Ok(hits));
    }

    /// Fails `query` with an error of `kind`.
    #[inline]
    pub fn add_failure<S: Into<String>>(&mut self, query: S, kind: ErrorKind) {
        self.answers.insert(query.into(), Err(kind));
    }

    /// Fails every query that has no explicit answer.
    #[inline]
    pub fn fail_by_default(&mut self, kind: ErrorKind) {
        self.default = Err(kind);
    }

    /// Delays every answer.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the queries received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns how many searches were made.
    #[inline]
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl SearchProvider for TestSearchProvider {
    type Error = TestSearchError;

    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<SearchResults, Self::Error>> + Send + 'static
    {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query.to_owned());

        let outcome = self.answers.get(query).unwrap_or(&self.default).clone();
        let query = query.to_owned();
        let delay = self.delay;
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
                .map(|hits| SearchResults::new(query, hits))
                .map_err(TestSearchError::new)
        }
    }
}
