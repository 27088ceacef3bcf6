//! System instructions and the `{{KEY}}` template language they are built
//! from.
//!
//! Substitution is a single left-to-right pass. A marker whose key is in
//! the variable map is replaced by the value; every other marker, including
//! an unterminated `{{`, is copied verbatim. Inserted values are never
//! scanned again, and keys are matched exactly.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

/// Where a template comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateSource {
    /// The template text itself.
    Literal(String),
    /// A file holding the template, read as UTF-8.
    File(PathBuf),
}

/// Errors raised while loading a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template file does not exist.
    #[error("instruction template not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The template file exists but could not be read.
    #[error("failed to read instruction template {}", .path.display())]
    Read {
        /// Path of the template file.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
}

/// Rendered system instructions for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instructions(String);

impl Instructions {
    /// Returns the instruction text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Instructions {
    #[inline]
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Instructions {
    #[inline]
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TemplateSource {
    /// Returns the template text.
    pub fn load(&self) -> Result<String, TemplateError> {
        match self {
            TemplateSource::Literal(text) => Ok(text.clone()),
            TemplateSource::File(path) => {
                std::fs::read_to_string(path).map_err(|err| {
                    if err.kind() == io::ErrorKind::NotFound {
                        TemplateError::NotFound(path.clone())
                    } else {
                        TemplateError::Read {
                            path: path.clone(),
                            source: err,
                        }
                    }
                })
            }
        }
    }
}

/// Loads the template from `source` and substitutes `variables` into it.
pub fn build(
    source: &TemplateSource,
    variables: &HashMap<String, String>,
) -> Result<Instructions, TemplateError> {
    let template = source.load()?;
    trace!(len = template.len(), "loaded instruction template");
    Ok(Instructions(render(&template, variables)))
}

/// Substitutes `variables` into `template`.
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            // Unterminated, so the remainder is plain text.
            output.push_str(&rest[start..]);
            return output;
        };
        let key = &after_open[..end];
        match variables.get(key) {
            Some(value) => {
                output.push_str(value);
                rest = &after_open[end + 2..];
            }
            None => {
                // Only the opening braces are literal, a known marker may
                // still follow inside them.
                output.push_str("{{");
                rest = after_open;
            }
        }
    }
    output.push_str(rest);
    output
}
