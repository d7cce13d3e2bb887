//! Extraction of IR into trap facts.
//!
//! An [`Extractor`] walks one unit (a source file, or one external class)
//! and writes facts through its [`FileTrapWriter`]. The work is split by
//! concern:
//!
//! - [`uses`]: projecting types and resolving labels of referenced entities
//! - [`decls`]: declarations, files and the synthesized initializer method
//! - [`exprs`]: statements and expressions
//!
//! Unrecognized constructs never abort the walk: they are reported as
//! diagnostics and replaced by [`Label::placeholder`].

mod decls;
mod exprs;
pub mod primitives;
mod uses;

use std::collections::HashMap;
use std::io::Write;
use std::panic::Location;

use crate::external::ExternalClassQueue;
use crate::ir::{DeclId, LoopId, Program, Span};
use crate::label::{Label, Lookup};
use crate::logging::{self, LogCounter, Severity};
use crate::output::class_binary_path;
use crate::trap::FileTrapWriter;

pub use exprs::Parent;

// ============================================================================
// Type results
// ============================================================================

/// One view of a projected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResult {
    pub label: Label,
    /// Human-readable rendering, e.g. `java.lang.String` or `kotlin.Int?`.
    pub signature: String,
}

impl TypeResult {
    pub fn new(label: Label, signature: impl Into<String>) -> Self {
        TypeResult {
            label,
            signature: signature.into(),
        }
    }
}

/// A type projected onto the host ("java") and rich ("kotlin") type systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResults {
    pub java: TypeResult,
    pub kotlin: TypeResult,
}

impl TypeResults {
    /// Placeholder pair for a type that could not be projected.
    pub fn unknown() -> Self {
        TypeResults {
            java: TypeResult::new(Label::placeholder(), "unknown"),
            kotlin: TypeResult::new(Label::placeholder(), "unknown"),
        }
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Extraction context for one trap file.
pub struct Extractor<'a, W: Write> {
    program: &'a Program,
    tw: FileTrapWriter<W>,
    counter: &'a LogCounter,
    queue: &'a mut ExternalClassQueue,
    /// External classes referenced from this trap, when collecting them.
    dependencies: Option<Vec<DeclId>>,
    /// Labels of the loops currently being extracted.
    loop_labels: HashMap<LoopId, Label>,
    current_function: Option<DeclId>,
    variable_labels: HashMap<DeclId, Label>,
}

impl<'a, W: Write> Extractor<'a, W> {
    pub fn new(
        program: &'a Program,
        tw: FileTrapWriter<W>,
        counter: &'a LogCounter,
        queue: &'a mut ExternalClassQueue,
    ) -> Self {
        Extractor {
            program,
            tw,
            counter,
            queue,
            dependencies: None,
            loop_labels: HashMap::new(),
            current_function: None,
            variable_labels: HashMap::new(),
        }
    }

    /// Record every external class this extractor schedules, for a class
    /// trap's dependency file.
    pub fn collecting_dependencies(mut self) -> Self {
        self.dependencies = Some(Vec::new());
        self
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn trap_writer(&mut self) -> &mut FileTrapWriter<W> {
        &mut self.tw
    }

    /// Number of loops whose bodies are being extracted right now.
    pub fn active_loops(&self) -> usize {
        self.loop_labels.len()
    }

    /// Hand back the writer and the collected dependencies.
    pub fn finish(self) -> (FileTrapWriter<W>, Vec<DeclId>) {
        (self.tw, self.dependencies.unwrap_or_default())
    }

    /// Label for `key`; `init` runs only when the label is created, so the
    /// entity's defining facts are written exactly once per trap.
    pub(crate) fn label_for_with(
        &mut self,
        key: &str,
        init: impl FnOnce(&mut Self, &Label),
    ) -> Label {
        match self.tw.lookup_label(key) {
            Lookup::Existing(label) => label,
            Lookup::Created(label) => {
                init(self, &label);
                label
            }
        }
    }

    /// Run `f` with locations attributed to the file declaring `class`: its
    /// source file, or its binary class file when external.
    pub(crate) fn with_source_file_of_class<T>(
        &mut self,
        class: DeclId,
        populate_file_tables: bool,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let program = self.program;
        let source = if program.is_external(class) {
            None
        } else {
            program.file_of(class).and_then(|id| program.file(id))
        };
        let saved = match source {
            Some(file) => self.tw.retarget(&file.path, Some(file.lines.clone()), true),
            None => {
                let path = class_binary_path(program, class);
                self.tw.retarget(&path, None, populate_file_tables)
            }
        };
        let result = f(self);
        self.tw.restore(saved);
        result
    }

    /// Report a diagnostic with no particular location.
    #[track_caller]
    pub(crate) fn warn(&mut self, severity: Severity, message: &str) {
        let caller = Location::caller();
        let location = self.tw.unknown_location();
        logging::report(self.counter, &mut self.tw, caller, severity, message, &location);
    }

    /// Report a diagnostic located at `span` in the current target file.
    #[track_caller]
    pub(crate) fn warn_at(&mut self, severity: Severity, message: &str, span: Span) {
        let caller = Location::caller();
        let location = self.tw.location(span);
        logging::report(self.counter, &mut self.tw, caller, severity, message, &location);
    }

    fn schedule_external_class(&mut self, class: DeclId) {
        if let Some(dependencies) = &mut self.dependencies {
            if !dependencies.contains(&class) {
                dependencies.push(class);
            }
        }
        self.queue.schedule_later(class);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Small IR builders shared by the extractor tests.

    use crate::ir::*;

    pub struct ProgramBuilder {
        pub files: Vec<FileEntry>,
        pub decls: Vec<Declaration>,
    }

    impl ProgramBuilder {
        pub fn new(path: &str, package: &str, text: &str) -> Self {
            ProgramBuilder {
                files: vec![FileEntry {
                    path: path.to_string(),
                    package: package.to_string(),
                    declarations: vec![],
                    annotations: vec![],
                    lines: LineTable::from_text(text),
                }],
                decls: vec![],
            }
        }

        pub fn add(&mut self, parent: DeclParent, kind: DeclKind) -> DeclId {
            self.add_with(parent, DeclOrigin::Source, Span::new(0, 1), kind)
        }

        pub fn add_with(
            &mut self,
            parent: DeclParent,
            origin: DeclOrigin,
            span: Span,
            kind: DeclKind,
        ) -> DeclId {
            let id = DeclId(self.decls.len() as u32);
            if let DeclParent::File(f) = &parent {
                self.files[f.0 as usize].declarations.push(id);
            }
            if let DeclParent::Decl(p) = &parent {
                if let DeclKind::Class(c) = &mut self.decls[p.0 as usize].kind {
                    if !matches!(kind, DeclKind::TypeParameter(_) | DeclKind::ValueParameter(_)) {
                        c.declarations.push(id);
                    }
                }
            }
            self.decls.push(Declaration {
                parent,
                origin,
                span,
                kind,
            });
            id
        }

        pub fn class(&mut self, parent: DeclParent, name: &str) -> DeclId {
            self.add(parent, DeclKind::Class(class_decl(name)))
        }

        /// External class in package `package`, as loaded from a binary.
        pub fn external_class(&mut self, package: &str, name: &str) -> DeclId {
            self.add_with(
                DeclParent::Package(package.to_string()),
                DeclOrigin::ExternalStub,
                Span::UNDEFINED,
                DeclKind::Class(class_decl(name)),
            )
        }

        /// Builtin `kotlin.<name>` class, declared up front so types can
        /// refer to it before the program is built.
        pub fn builtin(&mut self, name: &str) -> DeclId {
            self.external_class("kotlin", name)
        }

        pub fn decl_mut(&mut self, id: DeclId) -> &mut DeclKind {
            &mut self.decls[id.0 as usize].kind
        }

        pub fn build(self) -> Program {
            Program::new(self.files, self.decls).unwrap()
        }
    }

    pub fn class_decl(name: &str) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            kind: ClassKind::Class,
            modality: Modality::Final,
            is_companion: false,
            type_parameters: vec![],
            super_types: vec![],
            declarations: vec![],
            this_receiver: None,
            binary_path: None,
        }
    }

    pub fn function_decl(name: &str, return_type: IrType) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            is_constructor: false,
            is_primary: false,
            type_parameters: vec![],
            value_parameters: vec![],
            dispatch_receiver: None,
            extension_receiver: None,
            return_type,
            body: None,
        }
    }

    pub fn expr(ty: IrType, kind: ExprKind) -> Expr {
        Expr {
            span: Span::new(0, 1),
            ty,
            kind,
        }
    }
}
