//! Core logic of the research agent: the bounded orchestration loop, the
//! closed toolset it dispatches to, instruction building, and the evidence
//! ledger a run accumulates.
//!
//! A run starts from a query and a set of [`Instructions`], alternates
//! between reasoning and concurrent web searches, and always ends with a
//! non-empty [`FinalAnswer`], unless the reasoning capability itself is
//! unreachable.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
mod answer;
mod error;
mod event;
pub mod evidence;
pub mod instructions;
mod model_client;
mod retry;
mod search_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, RunOptions, run_once};
pub use answer::{FinalAnswer, Termination};
pub use error::{ModelError, RunError};
pub use event::RunEvent;
pub use evidence::{Evidence, EvidenceRecord};
pub use instructions::{Instructions, TemplateError, TemplateSource};
pub use retry::RetryPolicy;
pub use search_client::{SearchClient, SearchError};
pub use tool::{ToolDescriptor, Toolset};
