//! An abstraction layer for the reasoning capability of the research agent.
//!
//! The orchestration loop never talks to a concrete LLM service. It talks to
//! a [`ModelProvider`], which accepts the accumulated conversation plus the
//! tools the model may call, and streams back either tool call requests or
//! the text of an answer.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. A provider can be
//! backed by a remote API, or by a scripted stub in tests.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
