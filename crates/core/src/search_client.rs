use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;

use research_agent_search::{
    ErrorKind, SearchProvider, SearchProviderError, SearchResults,
};
use tracing::Instrument;

type SearchResult = Result<SearchResults, SearchError>;
type BoxedSearchFuture = Pin<Box<dyn Future<Output = SearchResult> + Send>>;
type HandlerFn = Arc<dyn Fn(&str) -> BoxedSearchFuture + Send + Sync>;

/// A failed search, with the provider error flattened into its kind and
/// message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SearchError {
    kind: ErrorKind,
    message: String,
}

impl SearchError {
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

/// A type-erased handle to a search provider.
///
/// Queries that are empty after trimming are rejected with
/// [`ErrorKind::InvalidQuery`] without reaching the provider.
#[derive(Clone)]
pub struct SearchClient {
    handler_fn: HandlerFn,
}

impl SearchClient {
    /// Wraps `provider`.
    pub fn new<P: SearchProvider + 'static>(provider: P) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |query: &str| {
            if query.trim().is_empty() {
                let err = SearchError::new(
                    ErrorKind::InvalidQuery,
                    "query must not be empty",
                );
                return Box::pin(ready(Err(err))) as BoxedSearchFuture;
            }
            let fut = provider.search(query);
            Box::pin(
                async move {
                    fut.await.map_err(|err| {
                        debug!("search failed: {err:?}");
                        SearchError::new(err.kind(), err.to_string())
                    })
                }
                .instrument(trace_span!("search client req")),
            )
        });
        Self { handler_fn }
    }

    /// Searches for `query`.
    ///
    /// The returned future does not borrow the client.
    #[inline]
    pub fn search(&self, query: &str) -> BoxedSearchFuture {
        (self.handler_fn)(query)
    }
}

#[cfg(test)]
mod tests {
    use research_agent_search::SearchHit;
    use research_agent_testing::TestSearchProvider;

    use super::*;

    #[tokio::test]
    async fn test_empty_query_is_rejected_locally() {
        let provider = TestSearchProvider::default();
        let client = SearchClient::new(provider.clone());

        for query in ["", "   \n"] {
            let err = client.search(query).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidQuery);
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_errors_are_flattened() {
        let mut provider = TestSearchProvider::default();
        provider.add_hits(
            "rust",
            vec![SearchHit::new("https://rust-lang.org", "Rust", ["fast"])],
        );
        provider.add_failure("down", ErrorKind::Unauthorized);
        let client = SearchClient::new(provider);

        let results = client.search("rust").await.unwrap();
        assert_eq!(results.hits.len(), 1);

        let err = client.search("down").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.message().contains("unauthorized"));
    }
}
