use research_agent_search::{SearchHit, SearchResults};
use serde::{Deserialize, Serialize};

use crate::ExaConfig;

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    query: &'a str,
    r#type: &'a str,
    num_results: u32,
    contents: Contents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Contents {
    highlights: Highlights,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Highlights {
    num_sentences: u32,
    highlights_per_url: u32,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -----------
// Conversions
// -----------

pub fn create_request<'a>(
    query: &'a str,
    config: &'a ExaConfig,
) -> SearchRequest<'a> {
    SearchRequest {
        query,
        r#type: &config.search_type,
        num_results: config.num_results,
        contents: Contents {
            highlights: Highlights {
                num_sentences: config.highlight_sentences,
                highlights_per_url: config.highlights_per_url,
            },
        },
    }
}

pub fn into_results(query: &str, resp: SearchResponse) -> SearchResults {
    let hits = resp
        .results
        .into_iter()
        .map(|result| SearchHit {
            url: result.url,
            title: result.title.unwrap_or_default(),
            highlights: result.highlights.unwrap_or_default(),
            published_date: result.published_date,
            author: result.author,
            score: result.score,
        })
        .collect();
    SearchResults::new(query, hits)
}
