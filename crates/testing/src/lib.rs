//! Deterministic stand-ins for the reasoning and search capabilities.
//!
//! Both providers are scripted up front and record every request they
//! receive, so tests can drive the orchestration loop through exact
//! sequences of tool calls, failures and answers, and then assert on what
//! the loop actually sent.

mod model;
mod preset;
mod search;

pub use model::{TestModelError, TestModelProvider, TestModelResponse};
pub use preset::*;
pub use search::{TestSearchError, TestSearchProvider};
