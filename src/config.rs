//! Extractor configuration.
//!
//! Values come from the environment the build system sets up, then from
//! command-line overrides. An environment variable set to the empty string
//! counts as unset.

use std::path::PathBuf;

use trapgen_core::logging::DEFAULT_DIAGNOSTIC_LIMIT;

use crate::error::{DriverError, DriverResult};

pub const TRAP_DIR_VAR: &str = "CODEQL_EXTRACTOR_JAVA_TRAP_DIR";
pub const SOURCE_ARCHIVE_DIR_VAR: &str = "CODEQL_EXTRACTOR_JAVA_SOURCE_ARCHIVE_DIR";
pub const DIAGNOSTIC_LIMIT_VAR: &str = "CODEQL_EXTRACTOR_KOTLIN_DIAGNOSTIC_LIMIT";

const DEFAULT_TRAP_DIR: &str = "kotlin-extractor/trap";
const DEFAULT_SOURCE_ARCHIVE_DIR: &str = "kotlin-extractor/src";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Trap file for facts about the compiler invocation itself.
    pub invocation_trap: PathBuf,
    pub trap_dir: PathBuf,
    pub source_archive_dir: PathBuf,
    /// Compare regenerated traps against existing ones instead of skipping
    /// files whose trap already exists.
    pub check_trap_identical: bool,
    pub exit_after_extraction: bool,
    /// When the compilation started, in milliseconds since the epoch.
    pub compilation_start_ms: Option<u64>,
    /// Diagnostics per call site before rate limiting; 0 disables the limit.
    pub diagnostic_limit: u32,
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub invocation_trap: Option<PathBuf>,
    pub trap_dir: Option<PathBuf>,
    pub source_archive_dir: Option<PathBuf>,
    pub check_trap_identical: bool,
    pub exit_after_extraction: bool,
    pub compilation_start_ms: Option<u64>,
    pub diagnostic_limit: Option<u32>,
}

impl ExtractorConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> DriverResult<Self> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve with `lookup` standing in for the environment.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> DriverResult<Self> {
        let env = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let invocation_trap = overrides
            .invocation_trap
            .ok_or(DriverError::MissingInvocationTrap)?;
        let trap_dir = overrides
            .trap_dir
            .or_else(|| env(TRAP_DIR_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRAP_DIR));
        let source_archive_dir = overrides
            .source_archive_dir
            .or_else(|| env(SOURCE_ARCHIVE_DIR_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_ARCHIVE_DIR));
        let diagnostic_limit = match overrides.diagnostic_limit {
            Some(limit) => limit,
            None => match env(DIAGNOSTIC_LIMIT_VAR) {
                Some(value) => value.trim().parse().map_err(|_| {
                    DriverError::config(format!(
                        "{} is not a number: {}",
                        DIAGNOSTIC_LIMIT_VAR, value
                    ))
                })?,
                None => DEFAULT_DIAGNOSTIC_LIMIT,
            },
        };

        Ok(ExtractorConfig {
            invocation_trap,
            trap_dir,
            source_archive_dir,
            check_trap_identical: overrides.check_trap_identical,
            exit_after_extraction: overrides.exit_after_extraction,
            compilation_start_ms: overrides.compilation_start_ms,
            diagnostic_limit,
        })
    }
}
