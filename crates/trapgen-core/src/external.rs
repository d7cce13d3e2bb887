//! Extraction of classes from outside the current compilation.
//!
//! Referencing a class that was loaded from a dependency schedules it on an
//! [`ExternalClassQueue`]. Once the source file has been extracted, an
//! [`ExternalClassExtractor`] drains the queue: each class is extracted with
//! its own label store into its own gzip trap, and whatever those classes
//! reference is scheduled in turn, until a pass adds nothing new.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Read};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{ExtractError, ExtractResult};
use crate::extract::Extractor;
use crate::ir::{DeclId, Program};
use crate::logging::LogCounter;
use crate::output::{write_trap_header, ClassPlan, ClassTrap, TrapOutput};
use crate::trap::{FileTrapWriter, TrapWriter};

// ============================================================================
// Queue
// ============================================================================

/// Classes waiting to be extracted. A class is accepted at most once over
/// the queue's lifetime.
#[derive(Debug, Default)]
pub struct ExternalClassQueue {
    seen: HashSet<DeclId>,
    pending: Vec<DeclId>,
}

impl ExternalClassQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `class`; returns false if it was scheduled before.
    pub fn schedule_later(&mut self, class: DeclId) -> bool {
        if !self.seen.insert(class) {
            return false;
        }
        tracing::trace!("Scheduling external class {}", class);
        self.pending.push(class);
        true
    }

    /// Take everything pending, leaving the queue empty for the next pass.
    pub fn take_batch(&mut self) -> Vec<DeclId> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Classes ever scheduled.
    pub fn scheduled_count(&self) -> usize {
        self.seen.len()
    }
}

// ============================================================================
// Drain
// ============================================================================

/// What a drain did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub extracted: usize,
    pub up_to_date: usize,
    pub failed: usize,
    pub batches: usize,
}

/// Drains an [`ExternalClassQueue`] into class traps.
pub struct ExternalClassExtractor<'a> {
    program: &'a Program,
    counter: &'a LogCounter,
    invocation: String,
    output: TrapOutput,
    queue: ExternalClassQueue,
}

impl<'a> ExternalClassExtractor<'a> {
    pub fn new(
        program: &'a Program,
        counter: &'a LogCounter,
        output: TrapOutput,
        invocation: impl Into<String>,
    ) -> Self {
        ExternalClassExtractor {
            program,
            counter,
            invocation: invocation.into(),
            output,
            queue: ExternalClassQueue::new(),
        }
    }

    /// The queue source-file extraction schedules into.
    pub fn queue_mut(&mut self) -> &mut ExternalClassQueue {
        &mut self.queue
    }

    pub fn output(&mut self) -> &mut TrapOutput {
        &mut self.output
    }

    pub fn into_output(self) -> TrapOutput {
        self.output
    }

    /// Extract scheduled classes until none remain. A class that fails is
    /// logged and skipped; its partial trap is discarded.
    pub fn drain(&mut self) -> DrainSummary {
        let mut summary = DrainSummary::default();
        loop {
            let batch = self.queue.take_batch();
            if batch.is_empty() {
                break;
            }
            summary.batches += 1;
            tracing::debug!("Extracting batch of {} external classes", batch.len());
            for class in batch {
                match self.extract_class(class) {
                    Ok(true) => summary.extracted += 1,
                    Ok(false) => summary.up_to_date += 1,
                    Err(e) => {
                        let name = self
                            .program
                            .fq_name(class)
                            .unwrap_or_else(|| class.to_string());
                        tracing::warn!("Failed to extract external class {}: {}", name, e);
                        summary.failed += 1;
                    }
                }
            }
        }
        summary
    }

    /// Returns false when an up-to-date trap already exists.
    fn extract_class(&mut self, class: DeclId) -> ExtractResult<bool> {
        let trap = match self.output.plan_class(self.program, class)? {
            ClassPlan::UpToDate => {
                tracing::debug!("External class {} is up to date", class);
                return Ok(false);
            }
            ClassPlan::Write(trap) => trap,
        };
        let dependencies = self.write_class_trap(&trap)?;
        self.output.commit(self.program, &trap, &dependencies)?;
        tracing::debug!("Wrote {}", trap.trap_path.display());
        Ok(true)
    }

    /// Extract into a temporary file beside the trap and move it into place
    /// once complete. The temporary file is deleted on any error.
    fn write_class_trap(&mut self, trap: &ClassTrap) -> ExtractResult<Vec<DeclId>> {
        let dir = trap
            .trap_path
            .parent()
            .ok_or_else(|| ExtractError::invalid_ir("class trap path has no directory"))?;
        fs::create_dir_all(dir).map_err(|e| ExtractError::io(dir, e))?;
        let temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".trap.gz.tmp")
            .tempfile_in(dir)
            .map_err(|e| ExtractError::io(dir, e))?;

        let encoder = GzEncoder::new(BufWriter::new(temp.as_file()), Compression::default());
        let mut tw = TrapWriter::new(encoder);
        write_trap_header(&mut tw, &self.invocation);
        let ftw = FileTrapWriter::class_file(tw, &trap.binary_path);
        let mut extractor =
            Extractor::new(self.program, ftw, self.counter, &mut self.queue).collecting_dependencies();
        extractor.extract_class_source(trap.class);
        let (ftw, dependencies) = extractor.finish();

        let finish = |e| ExtractError::io(temp.path(), e);
        let encoder = ftw.into_inner().into_inner().map_err(finish)?;
        let buffered = encoder.finish().map_err(finish)?;
        buffered.into_inner().map_err(|e| finish(e.into_error()))?;
        temp.persist(&trap.trap_path)
            .map_err(|e| ExtractError::io(&trap.trap_path, e.error))?;
        Ok(dependencies)
    }
}

/// Read a gzip trap back as text.
pub fn read_class_trap(path: &Path) -> ExtractResult<String> {
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut text = String::new();
    flate2::read::GzDecoder::new(file)
        .read_to_string(&mut text)
        .map_err(|e| ExtractError::io(path, e))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::*;
    use crate::ir::*;
    use tempfile::TempDir;

    #[test]
    fn test_queue_accepts_each_class_once() {
        let mut queue = ExternalClassQueue::new();
        assert!(queue.schedule_later(DeclId(3)));
        assert!(!queue.schedule_later(DeclId(3)));
        assert!(queue.schedule_later(DeclId(4)));
        assert_eq!(queue.take_batch(), vec![DeclId(3), DeclId(4)]);
        assert!(queue.is_empty());
        assert!(!queue.schedule_later(DeclId(4)));
        assert_eq!(queue.scheduled_count(), 2);
    }

    /// Two external classes whose supertypes refer to each other.
    fn cyclic_program() -> (Program, DeclId, DeclId) {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let a = b.external_class("lib", "A");
        let c = b.external_class("lib", "B");
        if let DeclKind::Class(k) = b.decl_mut(a) {
            k.kind = ClassKind::Interface;
            k.super_types.push(IrType::class(c, vec![]));
        }
        if let DeclKind::Class(k) = b.decl_mut(c) {
            k.kind = ClassKind::Interface;
            k.super_types.push(IrType::class(a, vec![]));
        }
        (b.build(), a, c)
    }

    #[test]
    fn test_cyclic_dependencies_drain_once() {
        let dir = TempDir::new().unwrap();
        let (program, a, b) = cyclic_program();
        let counter = LogCounter::default();
        let mut ex =
            ExternalClassExtractor::new(&program, &counter, TrapOutput::new(dir.path()), "inv.trap");
        ex.queue_mut().schedule_later(a);

        let summary = ex.drain();
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.failed, 0);
        assert!(ex.queue_mut().is_empty());
        assert_eq!(ex.queue_mut().scheduled_count(), 2);

        let a_trap = dir.path().join("classes/lib/A.members.trap.gz");
        let b_trap = dir.path().join("classes/lib/B.members.trap.gz");
        let text = read_class_trap(&a_trap).unwrap();
        assert!(text.starts_with("// Generated by trapgen "));
        assert!(text.contains("// Part of invocation inv.trap"));
        assert!(text.contains("interfaces("));
        assert!(text.contains("extendsReftype("));
        assert!(text.contains("=@\"/!unknown-binary-location/lib/A.class;sourcefile\""));
        assert!(read_class_trap(&b_trap).is_ok());

        let deps = fs::read_to_string(dir.path().join("classes/lib/A.members.dep")).unwrap();
        assert_eq!(deps, "classes/lib/B.members.trap.gz\n");

        // A second drain over the same output finds both traps current.
        let mut again =
            ExternalClassExtractor::new(&program, &counter, TrapOutput::new(dir.path()), "inv.trap");
        again.queue_mut().schedule_later(a);
        again.queue_mut().schedule_later(b);
        let summary = again.drain();
        assert_eq!(summary.extracted, 0);
        assert_eq!(summary.up_to_date, 2);
    }

    #[test]
    fn test_external_classes_skip_object_initializer() {
        let dir = TempDir::new().unwrap();
        let (program, a, _) = cyclic_program();
        let counter = LogCounter::default();
        let mut ex =
            ExternalClassExtractor::new(&program, &counter, TrapOutput::new(dir.path()), "inv.trap");
        ex.queue_mut().schedule_later(a);
        ex.drain();
        let text = read_class_trap(&dir.path().join("classes/lib/A.members.trap.gz")).unwrap();
        assert!(!text.contains("<obinit>"));
    }

    #[test]
    fn test_non_class_fails_without_stopping_the_drain() {
        let dir = TempDir::new().unwrap();
        let (program, a, _) = cyclic_program();
        let counter = LogCounter::default();
        let mut ex =
            ExternalClassExtractor::new(&program, &counter, TrapOutput::new(dir.path()), "inv.trap");
        ex.queue_mut().schedule_later(DeclId(9999));
        ex.queue_mut().schedule_later(a);
        let summary = ex.drain();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.extracted, 2);
    }
}
