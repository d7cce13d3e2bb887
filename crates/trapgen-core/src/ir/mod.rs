//! The typed IR consumed by the extractor.
//!
//! A [`Program`] is a read-only view of one compilation: the source files
//! being compiled and every declaration reachable from them, including
//! declarations loaded from binary dependencies. Declarations refer to each
//! other by [`DeclId`] (an index into [`Program::declarations`]); there are
//! no owning back pointers.
//!
//! The front end hands a program over either in-process or as a JSON
//! document ([`Program::from_json_str`]).

pub mod decls;
pub mod exprs;
pub mod location;
pub mod types;

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

pub use decls::*;
pub use exprs::*;
pub use location::{LineTable, Span, UNDEFINED_OFFSET};
pub use types::*;

use crate::error::{ExtractError, ExtractResult};

// ============================================================================
// ID Types
// ============================================================================

/// Index of a declaration in [`Program::declarations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl std::fmt::Display for DeclId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Index of a file in [`Program::files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Structural identity of a loop, referenced by `break`/`continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct LoopId(pub u32);

// ============================================================================
// Files
// ============================================================================

/// A file-level annotation such as `@file:JvmName("Utils")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub class: DeclId,
    #[serde(default)]
    pub arguments: Vec<Expr>,
}

/// One source file of the compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub declarations: Vec<DeclId>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub lines: LineTable,
}

impl FileEntry {
    /// File name without directories.
    pub fn name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

// ============================================================================
// Program
// ============================================================================

/// Serialized form of a [`Program`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramDocument {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

/// Classes the extractor needs even when the front end did not mention them.
pub const BUILTIN_CLASSES: &[&str] = &[
    "Any",
    "Nothing",
    "Unit",
    "Byte",
    "Short",
    "Int",
    "Long",
    "UByte",
    "UShort",
    "UInt",
    "ULong",
    "Float",
    "Double",
    "Boolean",
    "Char",
    "String",
    "Array",
    "ByteArray",
    "ShortArray",
    "IntArray",
    "LongArray",
    "FloatArray",
    "DoubleArray",
    "BooleanArray",
    "CharArray",
];

#[derive(Debug, Clone)]
pub struct Program {
    pub files: Vec<FileEntry>,
    pub declarations: Vec<Declaration>,
    classes_by_fq_name: HashMap<String, DeclId>,
}

impl Program {
    /// Build a program, adding external stubs for any missing builtin
    /// classes. Fails on dangling parent or member references.
    pub fn new(files: Vec<FileEntry>, declarations: Vec<Declaration>) -> ExtractResult<Self> {
        let mut program = Program {
            files,
            declarations,
            classes_by_fq_name: HashMap::new(),
        };
        program.validate()?;
        program.reindex();
        program.add_missing_builtins();
        Ok(program)
    }

    pub fn from_document(doc: ProgramDocument) -> ExtractResult<Self> {
        Self::new(doc.files, doc.declarations)
    }

    pub fn from_json_str(json: &str) -> ExtractResult<Self> {
        let doc: ProgramDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> ExtractResult<Self> {
        let doc: ProgramDocument = serde_json::from_reader(reader)?;
        Self::from_document(doc)
    }

    fn validate(&self) -> ExtractResult<()> {
        let n = self.declarations.len() as u32;
        let check = |id: DeclId| {
            if id.0 < n {
                Ok(())
            } else {
                Err(ExtractError::DanglingDecl(id))
            }
        };
        for file in &self.files {
            file.declarations.iter().copied().try_for_each(check)?;
        }
        for decl in &self.declarations {
            match &decl.parent {
                DeclParent::Decl(p) => check(*p)?,
                DeclParent::File(f) if f.0 as usize >= self.files.len() => {
                    return Err(ExtractError::invalid_ir(format!(
                        "reference to missing file {}",
                        f
                    )));
                }
                _ => {}
            }
            if let DeclKind::Class(c) = &decl.kind {
                c.declarations.iter().copied().try_for_each(check)?;
                c.type_parameters.iter().copied().try_for_each(check)?;
            }
        }
        Ok(())
    }

    fn reindex(&mut self) {
        self.classes_by_fq_name.clear();
        for i in 0..self.declarations.len() {
            let id = DeclId(i as u32);
            if self.class(id).is_some() {
                if let Some(name) = self.fq_name(id) {
                    self.classes_by_fq_name.entry(name).or_insert(id);
                }
            }
        }
    }

    fn add_missing_builtins(&mut self) {
        for name in BUILTIN_CLASSES {
            let fq = format!("kotlin.{}", name);
            if self.classes_by_fq_name.contains_key(&fq) {
                continue;
            }
            let id = DeclId(self.declarations.len() as u32);
            self.declarations.push(Declaration {
                parent: DeclParent::Package("kotlin".to_string()),
                origin: DeclOrigin::ExternalStub,
                span: Span::UNDEFINED,
                kind: DeclKind::Class(ClassDecl {
                    name: name.to_string(),
                    kind: ClassKind::Class,
                    modality: Modality::Final,
                    is_companion: false,
                    type_parameters: Vec::new(),
                    super_types: Vec::new(),
                    declarations: Vec::new(),
                    this_receiver: None,
                    binary_path: None,
                }),
            });
            self.classes_by_fq_name.insert(fq, id);
        }
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn decl(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0 as usize)
    }

    pub fn file(&self, id: FileId) -> Option<&FileEntry> {
        self.files.get(id.0 as usize)
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        (0..self.files.len()).map(|i| FileId(i as u32))
    }

    pub fn class(&self, id: DeclId) -> Option<&ClassDecl> {
        match &self.decl(id)?.kind {
            DeclKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn function(&self, id: DeclId) -> Option<&FunctionDecl> {
        match &self.decl(id)?.kind {
            DeclKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn type_parameter(&self, id: DeclId) -> Option<&TypeParameterDecl> {
        match &self.decl(id)?.kind {
            DeclKind::TypeParameter(t) => Some(t),
            _ => None,
        }
    }

    pub fn field(&self, id: DeclId) -> Option<&FieldDecl> {
        match &self.decl(id)?.kind {
            DeclKind::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn class_by_fq_name(&self, fq_name: &str) -> Option<DeclId> {
        self.classes_by_fq_name.get(fq_name).copied()
    }

    /// Builtin `kotlin.<name>` class, always present after [`Program::new`].
    pub fn builtin(&self, name: &str) -> Option<DeclId> {
        self.class_by_fq_name(&format!("kotlin.{}", name))
    }

    pub fn is_external(&self, id: DeclId) -> bool {
        self.decl(id).is_some_and(|d| d.origin.is_external())
    }

    /// Enclosing class, if the declaration is a class member.
    pub fn parent_class(&self, id: DeclId) -> Option<DeclId> {
        match &self.decl(id)?.parent {
            DeclParent::Decl(p) if self.class(*p).is_some() => Some(*p),
            _ => None,
        }
    }

    /// Package of the declaration, walking out through enclosing
    /// declarations.
    pub fn package_of(&self, id: DeclId) -> String {
        let mut current = id;
        // Bounded by the table size so a malformed parent cycle terminates.
        for _ in 0..=self.declarations.len() {
            match self.decl(current).map(|d| &d.parent) {
                Some(DeclParent::Decl(p)) => current = *p,
                Some(DeclParent::File(f)) => {
                    return self.file(*f).map(|f| f.package.clone()).unwrap_or_default();
                }
                Some(DeclParent::Package(p)) => return p.clone(),
                None => break,
            }
        }
        String::new()
    }

    /// Source file containing the declaration, if any.
    pub fn file_of(&self, id: DeclId) -> Option<FileId> {
        let mut current = id;
        for _ in 0..=self.declarations.len() {
            match &self.decl(current)?.parent {
                DeclParent::Decl(p) => current = *p,
                DeclParent::File(f) => return Some(*f),
                DeclParent::Package(_) => return None,
            }
        }
        None
    }

    /// Class names from the outermost enclosing class down to `id`. A class
    /// local to a function starts its own chain.
    fn class_chain(&self, id: DeclId) -> Option<Vec<&str>> {
        let mut names = Vec::new();
        let mut current = id;
        for _ in 0..=self.declarations.len() {
            let decl = self.decl(current)?;
            let DeclKind::Class(c) = &decl.kind else {
                return None;
            };
            names.push(c.name.as_str());
            match &decl.parent {
                DeclParent::Decl(p) if self.class(*p).is_some() => current = *p,
                _ => {
                    names.reverse();
                    return Some(names);
                }
            }
        }
        None
    }

    /// Qualified source name, `pkg.Outer.Inner`.
    pub fn fq_name(&self, id: DeclId) -> Option<String> {
        let chain = self.class_chain(id)?;
        Some(qualify(&self.package_of(id), &chain.join(".")))
    }

    /// Qualified binary name, `pkg.Outer$Inner`.
    pub fn binary_name(&self, id: DeclId) -> Option<String> {
        let chain = self.class_chain(id)?;
        Some(qualify(&self.package_of(id), &chain.join("$")))
    }
}

/// Prefix `name` with `pkg.` unless the package is the root.
pub fn qualify(pkg: &str, name: &str) -> String {
    if pkg.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", pkg, name)
    }
}
