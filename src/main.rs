//! Binary entry point for the trapgen CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Extract a compilation's IR, appending invocation facts to the trap
//! trapgen --invocation-trap-file db/invocation.trap program.ir.json
//!
//! # Regenerate and compare against the existing traps
//! trapgen --invocation-trap-file db/invocation.trap --check-trap-identical program.ir.json
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use trapgen::config::{ConfigOverrides, ExtractorConfig};
use trapgen::driver::{load_program, Driver};
use trapgen::error::DriverError;

// ============================================================================
// CLI Structure
// ============================================================================

/// Relational fact extractor for typed compiler IR.
#[derive(Parser, Debug)]
#[command(name = "trapgen", version, about = "Relational fact extractor for typed compiler IR")]
struct Cli {
    /// IR document (JSON) describing the compilation.
    input: PathBuf,

    /// Trap file that facts about this invocation are appended to.
    #[arg(long)]
    invocation_trap_file: Option<PathBuf>,

    /// Trap output directory (default: $CODEQL_EXTRACTOR_JAVA_TRAP_DIR).
    #[arg(long)]
    trap_dir: Option<PathBuf>,

    /// Source archive directory (default: $CODEQL_EXTRACTOR_JAVA_SOURCE_ARCHIVE_DIR).
    #[arg(long)]
    source_archive_dir: Option<PathBuf>,

    /// Regenerate existing traps and compare them with the new output.
    #[arg(long)]
    check_trap_identical: bool,

    /// Exit the process as soon as extraction finishes.
    #[arg(long)]
    exit_after_extraction: bool,

    /// Compilation start time in milliseconds since the epoch.
    #[arg(long)]
    compilation_start_ms: Option<u64>,

    /// Diagnostics per call site before rate limiting (0: unlimited).
    #[arg(long)]
    diagnostic_limit: Option<u32>,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit log records as JSON.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            invocation_trap: self.invocation_trap_file.clone(),
            trap_dir: self.trap_dir.clone(),
            source_archive_dir: self.source_archive_dir.clone(),
            check_trap_identical: self.check_trap_identical,
            exit_after_extraction: self.exit_after_extraction,
            compilation_start_ms: self.compilation_start_ms,
            diagnostic_limit: self.diagnostic_limit,
        }
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level, cli.log_json);

    match execute(&cli) {
        Ok(exit_now) => {
            if exit_now {
                std::process::exit(0);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("trapgen: {}", err);
            ExitCode::from(err.exit_code().code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run the extraction. Returns whether the process should exit immediately.
fn execute(cli: &Cli) -> Result<bool, DriverError> {
    let config = ExtractorConfig::resolve(cli.overrides())?;
    let program = load_program(&cli.input)?;
    let summary = Driver::new(&config, &program).run()?;
    tracing::debug!("{} files processed", summary.files.len());
    Ok(config.exit_after_extraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "trapgen",
            "--invocation-trap-file",
            "inv.trap",
            "--check-trap-identical",
            "--compilation-start-ms",
            "1700000000000",
            "ir.json",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.invocation_trap, Some(PathBuf::from("inv.trap")));
        assert!(overrides.check_trap_identical);
        assert!(!overrides.exit_after_extraction);
        assert_eq!(overrides.compilation_start_ms, Some(1_700_000_000_000));
        assert_eq!(cli.input, PathBuf::from("ir.json"));
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["trapgen"]).is_err());
    }
}
