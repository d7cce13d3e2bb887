//! Core of trapgen: turns a typed compiler IR into relational trap facts.
//!
//! The pipeline, leaf to root:
//!
//! - [`label`]: per-store label allocation and key deduplication
//! - [`trap`] and [`schema`]: the fact writer and the typed relation writers
//! - [`logging`]: severities, rate-limited diagnostics
//! - [`ir`]: the input model
//! - [`extract`]: declaration, expression and type extraction
//! - [`external`]: the work queue that extracts classes from dependencies
//!   into their own trap files
//! - [`output`]: where class traps and their sidecar files live on disk

pub mod error;
pub mod extract;
pub mod external;
pub mod ir;
pub mod label;
pub mod logging;
pub mod output;
pub mod schema;
pub mod trap;

pub use error::{ExtractError, ExtractResult};
pub use extract::{Extractor, TypeResult, TypeResults};
pub use external::{DrainSummary, ExternalClassExtractor, ExternalClassQueue};
pub use ir::Program;
pub use label::{Label, LabelManager};
pub use logging::{LogCounter, Severity};
pub use output::TrapOutput;
pub use trap::{equivalent_trap, equivalent_trap_files, FileTrapWriter, TrapWriter};

/// Version string written into generated trap headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
