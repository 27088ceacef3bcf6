use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;

use crate::evidence::Evidence;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>()\[\]{}"'`]+"#).expect("valid URL pattern")
});

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Termination {
    /// The model answered within the turn budget.
    Completed,
    /// The turn budget ran out and the answer was forced from the evidence
    /// gathered so far.
    Exhausted,
}

impl Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed"),
            Termination::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// The answer of a run, together with what it was based on.
#[derive(Clone, Debug)]
pub struct FinalAnswer {
    pub(crate) text: String,
    pub(crate) termination: Termination,
    pub(crate) turns: usize,
    pub(crate) evidence: Evidence,
}

impl FinalAnswer {
    /// Returns the answer text. Never empty.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the answer and returns its text.
    #[inline]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Returns how the run ended.
    #[inline]
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Returns `true` if the turn budget ran out.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.termination == Termination::Exhausted
    }

    /// Returns the number of completed tool-invocation turns.
    #[inline]
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Returns the searches the answer is based on.
    #[inline]
    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    /// Returns the URLs that appear in the answer text, each once, in order
    /// of appearance. Trailing punctuation is not part of a URL.
    pub fn cited_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = vec![];
        for m in URL_RE.find_iter(&self.text) {
            let url = m
                .as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?', '*']);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}

/// Composes an answer for a run whose model never produced one.
pub(crate) fn fallback_answer(query: &str, evidence: &Evidence) -> String {
    let mut text = format!(
        "I could not put together a complete answer to \"{query}\" because \
         the evidence gathered was insufficient."
    );
    let sources = evidence.source_urls();
    if sources.is_empty() {
        text.push_str(" No relevant search results were found.");
        return text;
    }
    text.push_str("\n\nSources consulted:\n");
    for url in sources {
        text.push_str("- ");
        text.push_str(url);
        text.push('\n');
    }
    text
}
