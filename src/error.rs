//! Error types for the extraction driver.
//!
//! Extraction-engine errors ([`ExtractError`]) are bridged into
//! [`DriverError`], which the binary maps to a process exit code:
//! - `2`: invalid arguments or configuration
//! - `3`: the IR input could not be loaded
//! - `4`: writing the output failed
//! - `10`: internal errors

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use trapgen_core::ExtractError;

// ============================================================================
// Exit Codes
// ============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCodeKind {
    InvalidArguments = 2,
    InvalidInput = 3,
    OutputError = 4,
    InternalError = 10,
}

impl ExitCodeKind {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ExitCodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Driver Error
// ============================================================================

#[derive(Debug, Error)]
pub enum DriverError {
    /// No invocation trap file was given; nothing can be extracted.
    #[error("no invocation trap file specified")]
    MissingInvocationTrap,

    /// A configuration value could not be used.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// The IR document could not be read or is malformed.
    #[error("failed to load IR from {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    /// I/O failure on the primary output.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure inside the extraction engine.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl DriverError {
    pub fn config(message: impl Into<String>) -> Self {
        DriverError::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DriverError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> ExitCodeKind {
        match self {
            DriverError::MissingInvocationTrap | DriverError::Config { .. } => {
                ExitCodeKind::InvalidArguments
            }
            DriverError::Input { .. } => ExitCodeKind::InvalidInput,
            DriverError::Io { .. } => ExitCodeKind::OutputError,
            DriverError::Extract(ExtractError::Io { .. } | ExtractError::Stream(_)) => {
                ExitCodeKind::OutputError
            }
            DriverError::Extract(_) => ExitCodeKind::InternalError,
        }
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
