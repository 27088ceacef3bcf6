//! A web research assistant that answers questions from live search
//! results.
//!
//! The crate wires the OpenAI-compatible model provider and the Exa search
//! provider into a research agent, and ships a CLI for using it in the
//! terminal. It can also be used as a library through [`Session`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod session;

pub use config::{BUILTIN_TEMPLATE, ConfigError, ResearchConfig};
pub use session::{Session, SessionBuilder, SessionError};

/// Re-exports of [`research_agent_core`] crate.
pub mod core {
    pub use research_agent_core::*;
}
