use crate::answer::Termination;

/// Progress notifications of a run, delivered to the `on_event` callback
/// in the order they happen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunEvent {
    /// The model is deciding what to do in `turn`.
    Thinking {
        /// The turn being decided, starting from 1.
        turn: usize,
    },
    /// A piece of streamed answer text.
    MessageDelta(String),
    /// A search has been dispatched.
    SearchStarted {
        /// The turn the search belongs to.
        turn: usize,
        /// Id of the requesting tool call.
        call_id: String,
        /// The query.
        query: String,
    },
    /// A search has finished.
    SearchFinished {
        /// The turn the search belongs to.
        turn: usize,
        /// Id of the requesting tool call.
        call_id: String,
        /// Number of hits, or `None` if the search failed.
        hits: Option<usize>,
    },
    /// The turn budget ran out, forced synthesis follows.
    BudgetExhausted {
        /// Completed turns.
        turns: usize,
    },
    /// The run produced its answer.
    Finished {
        /// How the run ended.
        termination: Termination,
        /// Completed turns.
        turns: usize,
    },
}
