//! Error taxonomy for the engine.
//!
//! Only configuration-level failures are represented here. Per-file problems
//! (unreadable files, rule parse failures, failed remediations) degrade into
//! verdicts or remediation results and never surface as `CanonError`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("no configuration document found (looked for canon.toml|yaml|yml from {0})")]
    ConfigMissing(PathBuf),

    #[error("unknown rule group '{0}'")]
    UnknownGroup(String),

    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    #[error("file not found: {0}")]
    UnknownFile(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("acknowledgment store {path} is unusable: {message}")]
    Store { path: PathBuf, message: String },
}

impl CanonError {
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CanonError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CanonError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CanonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CanonError::config("canon.toml", "missing [groups]");
        assert_eq!(
            err.to_string(),
            "configuration error in canon.toml: missing [groups]"
        );
        let err = CanonError::UnknownGroup("backend".into());
        assert_eq!(err.to_string(), "unknown rule group 'backend'");
    }
}
