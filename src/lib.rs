//! trapgen: extract relational trap facts from a typed compiler IR.
//!
//! The extraction engine lives in `trapgen-core`; this crate is the driver
//! around it: configuration, the per-file output lifecycle, and the CLI.

pub mod config;
pub mod driver;
pub mod error;

pub use config::{ConfigOverrides, ExtractorConfig};
pub use driver::{Driver, FileResult, RunSummary, TrapOutcome};
pub use error::{DriverError, DriverResult};
