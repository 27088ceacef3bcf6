//! An abstraction layer for the web search capability.
//!
//! A [`SearchProvider`] takes a query string and returns ranked results,
//! each with a URL, a title and highlighted snippets. Providers surface
//! failures through [`SearchProviderError::kind`], and never retry or cache
//! on their own. Retry policy belongs to the caller.

#![deny(missing_docs)]

mod error;
mod provider;
mod results;

pub use error::*;
pub use provider::*;
pub use results::*;
