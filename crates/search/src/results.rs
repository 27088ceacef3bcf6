use serde::{Deserialize, Serialize};

/// One entry of a search result, ranked by the search capability.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Source URL.
    pub url: String,
    /// Page title, may be empty.
    pub title: String,
    /// Snippets of the page that are relevant to the query.
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Publication date as reported by the search capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Author as reported by the search capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Relevance score, if the capability exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchHit {
    /// Creates a hit with a URL, a title and highlights.
    #[inline]
    pub fn new<U, T, I, S>(url: U, title: T, highlights: I) -> Self
    where
        U: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            url: url.into(),
            title: title.into(),
            highlights: highlights.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// The ordered results of one search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// The query that produced these results.
    pub query: String,
    /// Hits in ranking order.
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    /// Creates results for `query`.
    #[inline]
    pub fn new<S: Into<String>>(query: S, hits: Vec<SearchHit>) -> Self {
        Self {
            query: query.into(),
            hits,
        }
    }

    /// Returns `true` if the search found nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterates over the URLs of the hits, in ranking order.
    #[inline]
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|hit| hit.url.as_str())
    }
}
