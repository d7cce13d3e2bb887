//! Diagnostics: severities, per-call-site rate limiting, and trap recording.
//!
//! Warnings and errors go two ways: to `tracing` for the operator, and into
//! the current trap file as a `diagnostics` fact for the database. Each call
//! site may report at most [`DEFAULT_DIAGNOSTIC_LIMIT`] diagnostics; the
//! limit-reaching one says so, later ones are dropped, and
//! [`LogCounter::print_limited_warning_counts`] summarises them at the end.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io::Write;
use std::panic::Location;

use crate::label::Label;
use crate::schema::DIAGNOSTIC_SOURCE;
use crate::trap::TrapWriter;

pub const DEFAULT_DIAGNOSTIC_LIMIT: u32 = 100;

/// Diagnostic severity, with the numeric codes stored in `diagnostics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    WarnLow,
    Warn,
    WarnHigh,
    /// Minor extractor error with little impact on analysis.
    ErrorLow,
    Error,
    ErrorHigh,
    /// Unrecognized or unsupported construct; extraction continued with a
    /// placeholder.
    ErrorSevere,
    ErrorGlobal,
}

impl Severity {
    pub fn code(self) -> i32 {
        match self {
            Severity::Info => 0,
            Severity::WarnLow => 1,
            Severity::Warn => 2,
            Severity::WarnHigh => 3,
            Severity::ErrorLow => 5,
            Severity::Error => 6,
            Severity::ErrorHigh => 7,
            Severity::ErrorSevere => 8,
            Severity::ErrorGlobal => 9,
        }
    }

    pub fn is_error(self) -> bool {
        self >= Severity::ErrorLow
    }
}

/// What the counter decided for one diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Log,
    /// Logged, and this is the last one from the call site.
    LimitReached,
    Suppressed,
}

/// Shared per-run diagnostic counts, keyed by call site.
#[derive(Debug)]
pub struct LogCounter {
    counts: RefCell<BTreeMap<String, u32>>,
    errors: Cell<u32>,
    limit: u32,
}

impl Default for LogCounter {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_LIMIT)
    }
}

impl LogCounter {
    /// A limit of 0 disables rate limiting.
    pub fn new(limit: u32) -> Self {
        LogCounter {
            counts: RefCell::new(BTreeMap::new()),
            errors: Cell::new(0),
            limit,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Error-severity diagnostics reported so far, suppressed ones included.
    pub fn error_count(&self) -> u32 {
        self.errors.get()
    }

    pub fn admit(&self, call_site: &str) -> Admission {
        let mut counts = self.counts.borrow_mut();
        let count = counts.entry(call_site.to_string()).or_insert(0);
        *count += 1;
        match self.limit {
            0 => Admission::Log,
            limit if *count == limit => Admission::LimitReached,
            limit if *count > limit => Admission::Suppressed,
            _ => Admission::Log,
        }
    }

    /// Call sites that hit the limit, with their total counts.
    pub fn limited_counts(&self) -> Vec<(String, u32)> {
        if self.limit == 0 {
            return Vec::new();
        }
        self.counts
            .borrow()
            .iter()
            .filter(|(_, count)| **count >= self.limit)
            .map(|(site, count)| (site.clone(), *count))
            .collect()
    }

    /// Summarise rate-limited call sites as comments in `tw` and in the log.
    pub fn print_limited_warning_counts<W: Write>(&self, tw: &mut TrapWriter<W>) {
        for (site, count) in self.limited_counts() {
            let msg = format!("Total of {} diagnostics from {}.", count, site);
            tw.write_comment(&msg);
            tracing::warn!("{}", msg);
        }
    }
}

/// Render a caller location the way counters key it.
pub fn call_site(location: &Location<'_>) -> String {
    format!("{}:{}", location.file(), location.line())
}

/// Record one diagnostic. `location` is the trap location of the offending
/// element; info messages never reach the trap.
pub fn report<W: Write>(
    counter: &LogCounter,
    tw: &mut TrapWriter<W>,
    caller: &Location<'_>,
    severity: Severity,
    message: &str,
    location: &Label,
) {
    if severity == Severity::Info {
        tracing::info!("{}", message);
        return;
    }
    if severity.is_error() {
        counter.errors.set(counter.errors.get() + 1);
    }
    let site = call_site(caller);
    let suffix = match counter.admit(&site) {
        Admission::Suppressed => return,
        Admission::LimitReached => format!(" Limit reached for diagnostics from {}.", site),
        Admission::Log => String::new(),
    };
    let full = format!("{}{}", message, suffix);
    tw.write_diagnostics(
        &Label::Star,
        DIAGNOSTIC_SOURCE,
        severity.code(),
        "",
        message,
        &full,
        location,
    );
    if severity.is_error() {
        tracing::error!(severity = ?severity, site = %site, "{}", full);
    } else {
        tracing::warn!(severity = ?severity, site = %site, "{}", full);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_codes() {
        assert_eq!(Severity::WarnLow.code(), 1);
        assert_eq!(Severity::ErrorSevere.code(), 8);
        assert!(Severity::ErrorLow.is_error());
        assert!(!Severity::WarnHigh.is_error());
    }

    #[test]
    fn test_counter_limits_per_site() {
        let counter = LogCounter::new(2);
        assert_eq!(counter.admit("a.rs:1"), Admission::Log);
        assert_eq!(counter.admit("a.rs:1"), Admission::LimitReached);
        assert_eq!(counter.admit("a.rs:1"), Admission::Suppressed);
        assert_eq!(counter.admit("b.rs:9"), Admission::Log);
        assert_eq!(counter.limited_counts(), vec![("a.rs:1".to_string(), 3)]);
    }

    #[test]
    fn test_zero_limit_disables() {
        let counter = LogCounter::new(0);
        for _ in 0..10 {
            assert_eq!(counter.admit("x"), Admission::Log);
        }
        assert!(counter.limited_counts().is_empty());
    }

    #[test]
    fn test_report_writes_diagnostics_until_limit() {
        let counter = LogCounter::new(2);
        let mut tw = TrapWriter::new(Vec::new());
        let loc = Label::Int(5);
        let here = Location::caller();
        for _ in 0..4 {
            report(&counter, &mut tw, here, Severity::Warn, "odd \"thing\"", &loc);
        }
        report(&counter, &mut tw, here, Severity::Info, "progress", &loc);
        counter.print_limited_warning_counts(&mut tw);
        let out = String::from_utf8(tw.into_inner().unwrap()).unwrap();
        assert_eq!(out.matches("diagnostics(*,").count(), 2);
        assert!(out.contains("\"odd \"\"thing\"\"\""));
        assert!(out.contains("Limit reached for diagnostics from"));
        assert!(out.contains("// Total of 4 diagnostics from"));
        assert!(!out.contains("progress"));
        assert_eq!(counter.error_count(), 0);

        report(&counter, &mut tw_sink(), here, Severity::ErrorSevere, "bad", &loc);
        assert_eq!(counter.error_count(), 1);
    }

    fn tw_sink() -> TrapWriter<Vec<u8>> {
        TrapWriter::new(Vec::new())
    }
}
