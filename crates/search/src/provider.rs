use std::error::Error;

use crate::error::ErrorKind;
use crate::results::SearchResults;

/// The error type for a search provider.
pub trait SearchProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that wraps one external search capability.
///
/// Like model providers, a search provider should behave like a stateless
/// object once created. It makes one outbound request per call and has no
/// other side effects.
pub trait SearchProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: SearchProviderError;

    /// Searches the web for `query`.
    ///
    /// Results are returned in the capability's ranking order. The returned
    /// future must not borrow from `self`, and dropping it must cancel the
    /// outbound request.
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<SearchResults, Self::Error>> + Send + 'static;
}
