//! The ledger of searches made during a run.

use research_agent_search::{SearchHit, SearchResults};

use crate::search_client::SearchError;

/// One search made by the agent, successful or not.
#[derive(Clone, Debug, PartialEq)]
pub struct EvidenceRecord {
    /// The turn the search belongs to, starting from 1.
    pub turn: usize,
    /// Id of the tool call that requested the search.
    pub call_id: String,
    /// The query as requested by the model.
    pub query: String,
    /// Results, or the reason the search is unavailable.
    pub outcome: Result<SearchResults, SearchError>,
}

impl EvidenceRecord {
    /// Returns `true` if the search failed.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.outcome.is_err()
    }

    /// Returns the hits of a successful search, or nothing.
    #[inline]
    pub fn hits(&self) -> &[SearchHit] {
        match &self.outcome {
            Ok(results) => &results.hits,
            Err(_) => &[],
        }
    }
}

/// Every search of a run, in the order the model requested them.
///
/// Results are kept as returned: nothing is re-sorted or deduplicated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evidence {
    records: Vec<EvidenceRecord>,
}

impl Evidence {
    pub(crate) fn push(&mut self, record: EvidenceRecord) {
        self.records.push(record);
    }

    /// Returns all records.
    #[inline]
    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    /// Returns `true` if no search was made.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if at least one search failed.
    pub fn is_degraded(&self) -> bool {
        self.records.iter().any(EvidenceRecord::is_degraded)
    }

    /// Iterates over every hit, in request order and then ranking order.
    pub fn hits(&self) -> impl Iterator<Item = &SearchHit> {
        self.records.iter().flat_map(|record| record.hits())
    }

    /// Returns the URLs of all hits, each once, in first-seen order.
    pub fn source_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = vec![];
        for hit in self.hits() {
            if !urls.contains(&hit.url.as_str()) {
                urls.push(&hit.url);
            }
        }
        urls
    }
}

#[cfg(test)]
mod tests {
    use research_agent_search::ErrorKind;

    use super::*;

    fn record(turn: usize, query: &str, urls: &[&str]) -> EvidenceRecord {
        let hits = urls
            .iter()
            .map(|url| SearchHit::new(*url, "", [""; 0]))
            .collect();
        EvidenceRecord {
            turn,
            call_id: format!("call_{turn}"),
            query: query.to_owned(),
            outcome: Ok(SearchResults::new(query, hits)),
        }
    }

    #[test]
    fn test_ledger() {
        let mut evidence = Evidence::default();
        assert!(evidence.is_empty());

        let urls = ["https://b.example", "https://a.example"];
        evidence.push(record(1, "a", &urls));
        evidence.push(EvidenceRecord {
            turn: 1,
            call_id: "call_2".to_owned(),
            query: "down".to_owned(),
            outcome: Err(SearchError::new(ErrorKind::Timeout, "took too long")),
        });
        let urls = ["https://a.example", "https://c.example"];
        evidence.push(record(2, "b", &urls));

        assert!(evidence.is_degraded());
        assert_eq!(evidence.records().len(), 3);
        assert_eq!(evidence.hits().count(), 4);
        assert_eq!(
            evidence.source_urls(),
            ["https://b.example", "https://a.example", "https://c.example"]
        );
    }
}
