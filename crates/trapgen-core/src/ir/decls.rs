//! IR declarations.
//!
//! Declarations live in one flat table ([`super::Program::declarations`]) and
//! refer to each other by [`DeclId`]: children list their members, members
//! name their parent.

use serde::{Deserialize, Serialize};

use super::exprs::{Expr, Statement};
use super::location::Span;
use super::types::IrType;
use super::{DeclId, FileId};

/// Where a declaration is nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclParent {
    /// Top level of a source file.
    File(FileId),
    /// Member of a class, or local to a function.
    Decl(DeclId),
    /// Top level of a package known only from binaries.
    Package(String),
}

/// Where a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeclOrigin {
    #[default]
    Source,
    /// Loaded from a compiled dependency.
    ExternalStub,
    /// Loaded from a compiled Java dependency.
    ExternalJavaStub,
}

impl DeclOrigin {
    pub fn is_external(self) -> bool {
        matches!(self, DeclOrigin::ExternalStub | DeclOrigin::ExternalJavaStub)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub parent: DeclParent,
    #[serde(default)]
    pub origin: DeclOrigin,
    #[serde(default)]
    pub span: Span,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Class(ClassDecl),
    Function(FunctionDecl),
    Property(PropertyDecl),
    Field(FieldDecl),
    EnumEntry(EnumEntryDecl),
    TypeAlias(TypeAliasDecl),
    AnonymousInitializer(AnonymousInitializerDecl),
    TypeParameter(TypeParameterDecl),
    ValueParameter(ValueParameterDecl),
    Variable(VariableDecl),
}

impl DeclKind {
    /// Short kind name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            DeclKind::Class(_) => "class",
            DeclKind::Function(_) => "function",
            DeclKind::Property(_) => "property",
            DeclKind::Field(_) => "field",
            DeclKind::EnumEntry(_) => "enum entry",
            DeclKind::TypeAlias(_) => "type alias",
            DeclKind::AnonymousInitializer(_) => "anonymous initializer",
            DeclKind::TypeParameter(_) => "type parameter",
            DeclKind::ValueParameter(_) => "value parameter",
            DeclKind::Variable(_) => "variable",
        }
    }

    /// Declared name, for kinds that have one.
    pub fn name(&self) -> Option<&str> {
        match self {
            DeclKind::Class(c) => Some(&c.name),
            DeclKind::Function(f) => Some(&f.name),
            DeclKind::Property(p) => Some(&p.name),
            DeclKind::Field(f) => Some(&f.name),
            DeclKind::EnumEntry(e) => Some(&e.name),
            DeclKind::TypeAlias(t) => Some(&t.name),
            DeclKind::TypeParameter(t) => Some(&t.name),
            DeclKind::ValueParameter(v) => Some(&v.name),
            DeclKind::Variable(v) => Some(&v.name),
            DeclKind::AnonymousInitializer(_) => None,
        }
    }
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    EnumClass,
    EnumEntry,
    AnnotationClass,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Final,
    Sealed,
    Open,
    Abstract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub modality: Modality,
    #[serde(default)]
    pub is_companion: bool,
    #[serde(default)]
    pub type_parameters: Vec<DeclId>,
    #[serde(default)]
    pub super_types: Vec<IrType>,
    #[serde(default)]
    pub declarations: Vec<DeclId>,
    /// The implicit `this` parameter of the class body.
    #[serde(default)]
    pub this_receiver: Option<DeclId>,
    /// Path of the `.class` file for external classes.
    #[serde(default)]
    pub binary_path: Option<String>,
}

impl ClassDecl {
    /// `object` declarations other than companions.
    pub fn is_non_companion_object(&self) -> bool {
        self.kind == ClassKind::Object && !self.is_companion
    }
}

// ============================================================================
// Callables and members
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub span: Span,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub type_parameters: Vec<DeclId>,
    #[serde(default)]
    pub value_parameters: Vec<DeclId>,
    #[serde(default)]
    pub dispatch_receiver: Option<DeclId>,
    #[serde(default)]
    pub extension_receiver: Option<DeclId>,
    pub return_type: IrType,
    #[serde(default)]
    pub body: Option<Body>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    #[serde(default)]
    pub is_var: bool,
    #[serde(default)]
    pub modality: Modality,
    #[serde(default)]
    pub getter: Option<DeclId>,
    #[serde(default)]
    pub setter: Option<DeclId>,
    #[serde(default)]
    pub backing_field: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: IrType,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntryDecl {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: String,
    #[serde(default)]
    pub type_parameters: Vec<DeclId>,
    pub expanded_type: IrType,
}

/// An `init { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousInitializerDecl {
    #[serde(default)]
    pub is_static: bool,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParameterDecl {
    pub name: String,
    pub index: usize,
    #[serde(default)]
    pub super_types: Vec<IrType>,
}

/// A value parameter. Receivers (`this`) have index -1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueParameterDecl {
    pub name: String,
    pub index: i32,
    pub ty: IrType,
}

/// A local variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub ty: IrType,
    #[serde(default)]
    pub initializer: Option<Expr>,
}
