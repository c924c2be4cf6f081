//! Typed errors for the impact-selection pipeline.
//!
//! The taxonomy mirrors how callers recover: `NotFound` is always recoverable
//! (the caller takes the conservative branch and runs the test), `Parse` aborts
//! only the affected file's contribution to a diff, and `History`/`Storage`
//! failures degrade to "no baseline usable". Orchestration code composes these
//! through `anyhow::Result`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NabazError {
    /// A historical file, store record, or enclosing function is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A source buffer failed to parse.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The version-control backend could not produce a diff or file content.
    #[error("history provider failure: {0}")]
    History(String),

    /// The run-history store failed to read or write a record.
    #[error("run history storage failure: {0}")]
    Storage(String),
}

impl NabazError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self::History(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_recognizable_through_anyhow() {
        let err: anyhow::Error = NabazError::not_found("pkg/math.go at abc123").into();
        let typed = err.downcast_ref::<NabazError>().unwrap();
        assert!(typed.is_not_found());
    }

    #[test]
    fn parse_error_carries_path() {
        let err = NabazError::parse("src/lib.rs", "unexpected token");
        assert!(err.to_string().contains("src/lib.rs"));
        assert!(!err.is_not_found());
    }
}
