//! Error and diagnostic types.
//!
//! [`Error`] covers failures that reach the caller (cache I/O, configuration, the explicit
//! sync actions). [`Diagnostic`] covers faults that are contained inside a generation pass:
//! they are logged and collected, but never abort the pass.

use log::{debug, warn};
use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("template error: {0}")]
    Template(String),

    #[error("parse error in {}: {message}", file.display())]
    SourceParse { file: PathBuf, message: String },

    #[error("unable to load route definitions from {}: {message}", file.display())]
    Load { file: PathBuf, message: String },

    #[error("unable to locate `{reference}`: {reason}")]
    Locate { reference: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised before any remote call when no API key is configured.
    #[error("no Postman API key was found, set `postman.key` or DEVTOOLS_POSTMAN_KEY")]
    MissingCredential,

    #[error("collection host answered {status}: {message}")]
    Sync { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A contained fault raised while processing one file, comment or tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    /// The file could not be parsed or loaded; it is skipped.
    #[error("skipping {file}: {message}")]
    SourceParse { file: String, message: String },

    /// A tag formatter rejected the content; only that occurrence is dropped.
    #[error("tag skipped (invalid value) @{tag} at {file}:{line}: {message}")]
    TagFormat {
        tag: String,
        file: String,
        line: usize,
        message: String,
    },

    /// A single-valued tag appeared more than once; extras are dropped.
    #[error("tag skipped (multiple values) @{tag} at {file}:{line}")]
    TagCardinality { tag: String, file: String, line: usize },

    /// Declared methods and located method keys disagree in number.
    #[error("{file}: {declared} declared methods but {located} located in source")]
    StructureMismatch {
        file: String,
        declared: usize,
        located: usize,
    },

    /// A middleware location or exclusion lookup failed; the field is degraded.
    #[error("{file}: lookup of {subject} failed: {message}")]
    ExternalLookup {
        file: String,
        subject: String,
        message: String,
    },

    /// The file path does not follow `<type>/<module>/.../<leaf><suffix>`.
    #[error("{file} does not match the route-file naming convention")]
    UnmatchedPath { file: String },
}

impl Diagnostic {
    /// Emit the diagnostic through the `log` facade.
    pub fn log(&self) {
        match self {
            Diagnostic::TagCardinality { .. } | Diagnostic::UnmatchedPath { .. } => {
                debug!("{}", self)
            }
            _ => warn!("{}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_messages_name_the_location() {
        let diag = Diagnostic::TagFormat {
            tag: "headers".to_string(),
            file: "modules/users/iam/users.server.iam.js".to_string(),
            line: 12,
            message: "expected value".to_string(),
        };
        let text = diag.to_string();
        assert!(text.contains("@headers"));
        assert!(text.contains("users.server.iam.js:12"));
    }

    #[test]
    fn test_missing_credential_message() {
        assert!(Error::MissingCredential.to_string().contains("API key"));
    }
}
