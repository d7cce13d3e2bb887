//! Error types for the extraction engine.
//!
//! Extraction itself does not fail on unrecognized constructs: those are
//! reported as diagnostics and replaced by placeholder labels. The errors
//! here cover what cannot be papered over: loading an IR document, and I/O
//! on trap output.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ir::DeclId;

/// Errors raised by the extraction engine.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// I/O failure writing a trap or sidecar file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O failure with no particular file attached.
    #[error("I/O error: {0}")]
    Stream(#[from] io::Error),

    /// The IR document is not valid JSON for the IR model.
    #[error("invalid IR document: {0}")]
    Json(#[from] serde_json::Error),

    /// The IR document is well-formed but inconsistent.
    #[error("invalid IR: {message}")]
    InvalidIr { message: String },

    /// A reference to a declaration that the program does not contain.
    #[error("dangling declaration reference {0}")]
    DanglingDecl(DeclId),
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_ir(message: impl Into<String>) -> Self {
        ExtractError::InvalidIr {
            message: message.into(),
        }
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::io("out/A.trap", io::Error::other("denied"));
        assert_eq!(err.to_string(), "I/O error on out/A.trap: denied");

        let err = ExtractError::invalid_ir("file 3 is missing");
        assert_eq!(err.to_string(), "invalid IR: file 3 is missing");

        let err = ExtractError::DanglingDecl(DeclId(7));
        assert_eq!(err.to_string(), "dangling declaration reference d7");
    }

    #[test]
    fn test_from_io() {
        let err: ExtractError = io::Error::other("boom").into();
        assert!(matches!(err, ExtractError::Stream(_)));
    }
}
