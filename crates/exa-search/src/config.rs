use std::fmt::{self, Debug};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.exa.ai";
const DEFAULT_SEARCH_TYPE: &str = "auto";
const DEFAULT_NUM_RESULTS: u32 = 10;
const DEFAULT_HIGHLIGHT_SENTENCES: u32 = 3;
const DEFAULT_HIGHLIGHTS_PER_URL: u32 = 3;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`ExaConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ExaConfigBuilder {
    api_key: String,
    base_url: Option<String>,
    search_type: Option<String>,
    num_results: Option<u32>,
    highlight_sentences: Option<u32>,
    highlights_per_url: Option<u32>,
    request_timeout: Option<Duration>,
}

impl ExaConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            search_type: None,
            num_results: None,
            highlight_sentences: None,
            highlights_per_url: None,
            request_timeout: None,
        }
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the search type, such as `auto`, `neural` or `keyword`.
    #[inline]
    pub fn with_search_type<S: Into<String>>(mut self, search_type: S) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    /// Sets how many results a search returns.
    #[inline]
    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = Some(num_results);
        self
    }

    /// Sets the number of sentences per highlight and highlights per page.
    #[inline]
    pub fn with_highlights(mut self, sentences: u32, per_url: u32) -> Self {
        self.highlight_sentences = Some(sentences);
        self.highlights_per_url = Some(per_url);
        self
    }

    /// Sets the time limit of a single search request.
    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ExaConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        ExaConfig {
            api_key: self.api_key,
            base_url: base_url.trim_end_matches('/').to_owned(),
            search_type: self
                .search_type
                .unwrap_or_else(|| DEFAULT_SEARCH_TYPE.to_owned()),
            num_results: self.num_results.unwrap_or(DEFAULT_NUM_RESULTS),
            highlight_sentences: self
                .highlight_sentences
                .unwrap_or(DEFAULT_HIGHLIGHT_SENTENCES),
            highlights_per_url: self
                .highlights_per_url
                .unwrap_or(DEFAULT_HIGHLIGHTS_PER_URL),
            request_timeout: self
                .request_timeout
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl Debug for ExaConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExaConfigBuilder")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("search_type", &self.search_type)
            .field("num_results", &self.num_results)
            .finish_non_exhaustive()
    }
}

/// Configuration for the Exa search provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ExaConfig {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) search_type: String,
    pub(crate) num_results: u32,
    pub(crate) highlight_sentences: u32,
    pub(crate) highlights_per_url: u32,
    pub(crate) request_timeout: Duration,
}

impl ExaConfig {
    /// Returns the base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Debug for ExaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExaConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("search_type", &self.search_type)
            .field("num_results", &self.num_results)
            .field("highlight_sentences", &self.highlight_sentences)
            .field("highlights_per_url", &self.highlights_per_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_api_key() {
        let builder = ExaConfigBuilder::with_api_key("exa-secret");
        assert!(!format!("{builder:?}").contains("exa-secret"));
        let config = builder.with_base_url("http://localhost:1234/").build();
        assert!(!format!("{config:?}").contains("exa-secret"));
        assert_eq!(config.base_url(), "http://localhost:1234");
        assert_eq!(config.num_results, DEFAULT_NUM_RESULTS);
    }
}
