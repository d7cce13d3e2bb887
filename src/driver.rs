//! One extraction pass over a compilation.
//!
//! For every source file of the [`Program`] the driver:
//!
//! 1. copies the source text into the source archive
//! 2. extracts the file into a temporary trap beside `<trap_dir>/<path>.trap`
//! 3. drains the external classes the file referenced into class traps and
//!    records them in the file's `.set` file
//! 4. moves the temporary trap into place, or compares it with the existing
//!    trap when `check_trap_identical` is set
//!
//! Facts about the invocation itself are appended to the invocation trap.
//! A failure in one file is logged and recorded there; only failures on the
//! invocation trap abort the run.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use trapgen_core::ir::FileId;
use trapgen_core::label::Label;
use trapgen_core::output::{relative_to_root, write_trap_header};
use trapgen_core::{
    equivalent_trap_files, DrainSummary, ExternalClassExtractor, Extractor, FileTrapWriter,
    LogCounter, Program, TrapOutput, TrapWriter,
};

use crate::config::ExtractorConfig;
use crate::error::{DriverError, DriverResult};

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to one source file's trap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapOutcome {
    /// A new trap was written.
    Written,
    /// A trap already existed and was left alone.
    Kept,
    /// The regenerated trap matched the existing one and was discarded.
    Identical,
    /// The regenerated trap differs; it was kept at this path.
    Different(PathBuf),
}

/// `compilation_compiling_files_completed` result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileResult {
    Ok = 0,
    RecoverableErrors = 1,
    Failed = 2,
}

#[derive(Debug)]
pub struct FileReport {
    pub path: String,
    pub result: FileResult,
    pub outcome: Option<TrapOutcome>,
    pub external: DrainSummary,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.result == FileResult::Failed)
            .count()
    }
}

// ============================================================================
// Driver
// ============================================================================

pub struct Driver<'a> {
    config: &'a ExtractorConfig,
    program: &'a Program,
    counter: LogCounter,
    started: Instant,
}

impl<'a> Driver<'a> {
    pub fn new(config: &'a ExtractorConfig, program: &'a Program) -> Self {
        Driver {
            config,
            program,
            counter: LogCounter::new(config.diagnostic_limit),
            started: Instant::now(),
        }
    }

    /// Extract every source file, appending invocation facts as it goes.
    pub fn run(&self) -> DriverResult<RunSummary> {
        let invocation_path = &self.config.invocation_trap;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(invocation_path)
            .map_err(|e| DriverError::io(invocation_path, e))?;
        let mut tw = TrapWriter::new(BufWriter::new(file));
        let invocation = invocation_path.to_string_lossy().into_owned();
        write_trap_header(&mut tw, &invocation);

        let compilation = Label::named("compilation");
        tw.write_compilation_started(&compilation);

        let mut summary = RunSummary::default();
        for (index, id) in self.program.file_ids().enumerate() {
            let Some(entry) = self.program.file(id) else {
                continue;
            };
            let file_label = tw.source_file_label(&entry.path);
            tw.write_compilation_compiling_files(&compilation, index, &file_label);

            let errors_before = self.counter.error_count();
            let report = match self.extract_file(id, &invocation) {
                Ok((outcome, external)) => {
                    let result = if self.counter.error_count() > errors_before {
                        FileResult::RecoverableErrors
                    } else {
                        FileResult::Ok
                    };
                    FileReport {
                        path: entry.path.clone(),
                        result,
                        outcome: Some(outcome),
                        external,
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Extraction failed while extracting file {}: {}",
                        entry.path,
                        e
                    );
                    FileReport {
                        path: entry.path.clone(),
                        result: FileResult::Failed,
                        outcome: None,
                        external: DrainSummary::default(),
                    }
                }
            };
            tw.write_compilation_compiling_files_completed(
                &compilation,
                index,
                report.result as i32,
            );
            summary.files.push(report);
        }

        let elapsed = self.elapsed_seconds();
        tw.write_compilation_compiler_times(&compilation, -1.0, elapsed);
        self.counter.print_limited_warning_counts(&mut tw);
        tw.write_compilation_finished(&compilation, -1.0, elapsed);
        tw.into_inner()
            .and_then(|mut out| out.flush())
            .map_err(|e| DriverError::io(invocation_path, e))?;

        tracing::info!(
            "Extracted {} files ({} failed)",
            summary.files.len(),
            summary.failed_files()
        );
        Ok(summary)
    }

    /// Seconds since the compilation started, or since this driver was
    /// created when the start time is unknown.
    fn elapsed_seconds(&self) -> f64 {
        match self.config.compilation_start_ms {
            Some(start_ms) => seconds_since(start_ms, SystemTime::now()),
            None => self.started.elapsed().as_secs_f64(),
        }
    }

    fn extract_file(
        &self,
        id: FileId,
        invocation: &str,
    ) -> DriverResult<(TrapOutcome, DrainSummary)> {
        let entry = self
            .program
            .file(id)
            .ok_or_else(|| DriverError::config(format!("no file {}", id)))?;
        let relative = relative_to_root(&entry.path);
        tracing::info!("Extracting file {}", entry.path);

        self.archive_source(&entry.path, &relative)?;

        let trap_path = with_suffix(&self.config.trap_dir.join(&relative), ".trap");
        if !self.config.check_trap_identical && trap_path.exists() {
            tracing::info!("Not rewriting trap file for {} as it exists", entry.path);
            return Ok((TrapOutcome::Kept, DrainSummary::default()));
        }
        let dir = parent_dir(&trap_path);
        fs::create_dir_all(dir).map_err(|e| DriverError::io(dir, e))?;
        let temp = temp_beside(&trap_path, ".trap.tmp")?;

        let mut external = ExternalClassExtractor::new(
            self.program,
            &self.counter,
            TrapOutput::new(&self.config.trap_dir),
            invocation,
        );
        {
            let mut tw = TrapWriter::new(BufWriter::new(temp.as_file()));
            write_trap_header(&mut tw, invocation);
            let ftw = FileTrapWriter::source(tw, &entry.path, entry.lines.clone());
            let mut extractor =
                Extractor::new(self.program, ftw, &self.counter, external.queue_mut());
            extractor.extract_file_contents(id);
            let (ftw, _) = extractor.finish();
            ftw.into_inner()
                .into_inner()
                .and_then(|mut out| out.flush())
                .map_err(|e| DriverError::io(temp.path(), e))?;
        }

        let drained = external.drain();
        if drained.failed > 0 {
            tracing::warn!(
                "{} external classes referenced from {} could not be extracted",
                drained.failed,
                entry.path
            );
        }
        external.output().write_trap_set(&entry.path)?;

        let outcome = self.finish_trap(temp, &trap_path)?;
        Ok((outcome, drained))
    }

    /// Copy the source text into the source archive. A source that cannot
    /// be read is logged and not archived.
    fn archive_source(&self, source: &str, relative: &Path) -> DriverResult<()> {
        let contents = match fs::read(source) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Cannot read source {} for archiving: {}", source, e);
                return Ok(());
            }
        };
        let target = self.config.source_archive_dir.join(relative);
        let dir = parent_dir(&target);
        fs::create_dir_all(dir).map_err(|e| DriverError::io(dir, e))?;
        let mut temp = temp_beside(&target, ".tmp")?;
        temp.write_all(&contents)
            .map_err(|e| DriverError::io(temp.path(), e))?;
        temp.persist(&target)
            .map_err(|e| DriverError::io(&target, e.error))?;
        Ok(())
    }

    fn finish_trap(&self, temp: NamedTempFile, trap_path: &Path) -> DriverResult<TrapOutcome> {
        if self.config.check_trap_identical && trap_path.exists() {
            let same = equivalent_trap_files(temp.path(), trap_path)
                .map_err(|e| DriverError::io(trap_path, e))?;
            if same {
                return Ok(TrapOutcome::Identical);
            }
            let (_, different) = temp_beside(trap_path, ".trap.different")?
                .keep()
                .map_err(|e| DriverError::io(trap_path, e.error))?;
            temp.persist(&different)
                .map_err(|e| DriverError::io(&different, e.error))?;
            tracing::warn!(
                "TRAP difference: {} vs {}",
                trap_path.display(),
                different.display()
            );
            return Ok(TrapOutcome::Different(different));
        }
        temp.persist(trap_path)
            .map_err(|e| DriverError::io(trap_path, e.error))?;
        Ok(TrapOutcome::Written)
    }
}

/// Seconds from `start_ms` after the epoch until `now`; zero if `now` is
/// earlier or the start is out of range.
fn seconds_since(start_ms: u64, now: SystemTime) -> f64 {
    UNIX_EPOCH
        .checked_add(Duration::from_millis(start_ms))
        .and_then(|start| now.duration_since(start).ok())
        .map_or(0.0, |d| d.as_secs_f64())
}

/// `path` with `suffix` appended to its file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// A temporary file named `<name>.<random><suffix>` in `path`'s directory.
fn temp_beside(path: &Path, suffix: &str) -> DriverResult<NamedTempFile> {
    let dir = parent_dir(path);
    let mut prefix = path.file_name().unwrap_or_default().to_os_string();
    prefix.push(".");
    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|e| DriverError::io(dir, e))
}

/// Open and parse an IR document.
pub fn load_program(path: &Path) -> DriverResult<Program> {
    let file = File::open(path).map_err(|e| DriverError::io(path, e))?;
    Program::from_json_reader(BufReader::new(file)).map_err(|source| DriverError::Input {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("trap/src/Main.kt"), ".trap"),
            PathBuf::from("trap/src/Main.kt.trap")
        );
    }

    #[test]
    fn test_seconds_since_start() {
        let start_ms = 1_700_000_000_000;
        let now = UNIX_EPOCH + Duration::from_millis(start_ms + 2_500);
        assert_eq!(seconds_since(start_ms, now), 2.5);
        assert_eq!(seconds_since(start_ms + 10_000, now), 0.0);
        assert_eq!(seconds_since(u64::MAX, now), 0.0);
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("Main.kt")), Path::new("."));
        assert_eq!(parent_dir(Path::new("a/Main.kt")), Path::new("a"));
    }

    #[test]
    fn test_temp_beside_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let temp = temp_beside(&dir.path().join("Main.kt.trap"), ".trap.different").unwrap();
        let name = temp.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Main.kt.trap."));
        assert!(name.ends_with(".trap.different"));
        assert_eq!(temp.path().parent(), Some(dir.path()));
    }

    #[test]
    fn test_load_program_reports_input_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ir.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_program(&path).unwrap_err();
        assert!(matches!(err, DriverError::Input { .. }));

        let err = load_program(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, DriverError::Io { .. }));
    }
}
