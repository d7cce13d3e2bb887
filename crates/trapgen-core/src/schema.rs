//! The fixed relational schema.
//!
//! Each relation gets one typed writer method on [`TrapWriter`], generated by
//! [`relations!`]. Statements and expressions share the `stmts`/`exprs`
//! relations and are distinguished by a kind code ([`StmtTag`],
//! [`ExprTag`]); the rich type of an expression goes to `exprsKotlinType`.

use std::io::Write;

use crate::label::Label;
use crate::trap::{TrapArg, TrapWriter};

/// Generates `pub fn write_<relation>(&mut self, ...)` for each relation.
macro_rules! relations {
    ($( $(#[$meta:meta])* $method:ident => $relation:literal ( $($arg:ident : $ty:ty),* $(,)? ); )*) => {
        impl<W: Write> TrapWriter<W> {
            $(
                $(#[$meta])*
                pub fn $method(&mut self, $($arg: $ty),*) {
                    self.write_fact($relation, &[$(&$arg),*]);
                }
            )*
        }
    };
}

macro_rules! kind_codes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal => $text:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code,)*
                }
            }

            /// Schema name of the kind, e.g. `whilestmt`.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)*
                }
            }
        }

        impl TrapArg for $name {
            fn fmt_arg(&self, out: &mut String) {
                self.code().fmt_arg(out)
            }
        }
    };
}

kind_codes! {
    /// Kind column of `stmts`.
    StmtTag {
        Block = 0 => "block",
        If = 1 => "ifstmt",
        For = 2 => "forstmt",
        EnhancedFor = 3 => "enhancedforstmt",
        While = 4 => "whilestmt",
        Do = 5 => "dostmt",
        Try = 6 => "trystmt",
        Switch = 7 => "switchstmt",
        Synchronized = 8 => "synchronizedstmt",
        Return = 9 => "returnstmt",
        Throw = 10 => "throwstmt",
        Break = 11 => "breakstmt",
        Continue = 12 => "continuestmt",
        Empty = 13 => "emptystmt",
        ExprStmt = 14 => "exprstmt",
        Labeled = 15 => "labeledstmt",
        Assert = 16 => "assertstmt",
        LocalVariableDecl = 17 => "localvariabledeclstmt",
        LocalTypeDecl = 18 => "localtypedeclstmt",
        ConstructorInvocation = 19 => "constructorinvocationstmt",
        SuperConstructorInvocation = 20 => "superconstructorinvocationstmt",
        Case = 21 => "case",
        CatchClause = 22 => "catchclause",
    }
}

kind_codes! {
    /// Kind column of `exprs`.
    ExprTag {
        Assign = 4 => "assignexpr",
        BooleanLiteral = 16 => "booleanliteral",
        IntegerLiteral = 17 => "integerliteral",
        LongLiteral = 18 => "longliteral",
        FloatLiteral = 19 => "floatingpointliteral",
        DoubleLiteral = 20 => "doubleliteral",
        CharacterLiteral = 21 => "characterliteral",
        StringLiteral = 22 => "stringliteral",
        NullLiteral = 23 => "nullliteral",
        Div = 25 => "divexpr",
        Rem = 26 => "remexpr",
        Add = 27 => "addexpr",
        Sub = 28 => "subexpr",
        Lt = 37 => "ltexpr",
        Gt = 38 => "gtexpr",
        Le = 39 => "leexpr",
        Ge = 40 => "geexpr",
        Eq = 41 => "eqexpr",
        Ne = 42 => "neexpr",
        Cast = 51 => "castexpr",
        New = 52 => "newexpr",
        InstanceOf = 55 => "instanceofexpr",
        LocalVariableDecl = 56 => "localvariabledeclexpr",
        ThisAccess = 58 => "thisaccess",
        VarAccess = 60 => "varaccess",
        MethodAccess = 61 => "methodaccess",
        TypeAccess = 62 => "unannotatedtypeaccess",
        When = 75 => "whenexpr",
        GetClass = 76 => "getclassexpr",
        NotInstanceOf = 81 => "notinstanceofexpr",
        StmtExpr = 82 => "stmtexpr",
        StringTemplate = 83 => "stringtemplateexpr",
        Vararg = 87 => "varargexpr",
    }
}

/// `wildcards` kind column.
pub const WILDCARD_EXTENDS: i32 = 1;
pub const WILDCARD_SUPER: i32 = 2;

/// `diagnostics.generatedBy` value.
pub const DIAGNOSTIC_SOURCE: &str = "trapgen extractor";

relations! {
    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------
    write_compilation_started => "compilation_started"(id: &Label);
    write_compilation_compiler_times => "compilation_compiler_times"(id: &Label, cpu_seconds: f64, elapsed_seconds: f64);
    write_compilation_compiling_files => "compilation_compiling_files"(id: &Label, num: usize, file: &Label);
    write_compilation_compiling_files_completed => "compilation_compiling_files_completed"(id: &Label, num: usize, result: i32);
    write_compilation_finished => "compilation_finished"(id: &Label, cpu_seconds: f64, elapsed_seconds: f64);
    write_diagnostics => "diagnostics"(id: &Label, generated_by: &str, severity: i32, tag: &str, message: &str, full_message: &str, location: &Label);

    // ------------------------------------------------------------------
    // Files and locations
    // ------------------------------------------------------------------
    write_files => "files"(id: &Label, name: &str, stem: &str, extension: &str, from_source: i32);
    write_folders => "folders"(id: &Label, name: &str);
    write_containerparent => "containerparent"(parent: &Label, child: &Label);
    write_locations_default => "locations_default"(id: &Label, file: &Label, start_line: u32, start_column: u32, end_line: u32, end_column: u32);
    write_has_location => "hasLocation"(entity: &Label, location: &Label);
    write_cupackage => "cupackage"(file: &Label, package: &Label);

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------
    write_packages => "packages"(id: &Label, name: &str);
    write_classes => "classes"(id: &Label, name: &str, package: &Label, source: &Label);
    write_interfaces => "interfaces"(id: &Label, name: &str, package: &Label, source: &Label);
    write_is_enum_type => "isEnumType"(class: &Label);
    write_primitives => "primitives"(id: &Label, name: &str);
    write_kt_nullable_types => "kt_nullable_types"(id: &Label, class: &Label);
    write_kt_notnull_types => "kt_notnull_types"(id: &Label, class: &Label);
    write_arrays => "arrays"(id: &Label, name: &str, element: &Label, dimensions: i32, component: &Label);
    write_wildcards => "wildcards"(id: &Label, name: &str, kind: i32);
    write_type_bounds => "typeBounds"(id: &Label, bound: &Label, pos: i32, parent: &Label);
    write_type_args => "typeArgs"(arg: &Label, pos: usize, parent: &Label);
    write_is_parameterized => "isParameterized"(id: &Label);
    write_erasure => "erasure"(instance: &Label, source: &Label);
    write_extends_reftype => "extendsReftype"(sub: &Label, sup: &Label);
    write_encl_in_reftype => "enclInReftype"(inner: &Label, outer: &Label);
    write_type_vars => "typeVars"(id: &Label, name: &str, pos: usize, kind: i32, parent: &Label);
    write_kt_type_alias => "kt_type_alias"(id: &Label, name: &str, kt_type: &Label);

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------
    write_modifiers => "modifiers"(id: &Label, name: &str);
    write_has_modifier => "hasModifier"(entity: &Label, modifier: &Label);
    write_fields => "fields"(id: &Label, name: &str, ty: &Label, kt_type: &Label, parent: &Label, source: &Label);
    write_methods => "methods"(id: &Label, name: &str, signature: &str, ty: &Label, kt_type: &Label, parent: &Label, source: &Label);
    write_constrs => "constrs"(id: &Label, name: &str, signature: &str, ty: &Label, kt_type: &Label, parent: &Label, source: &Label);
    write_kt_extension_functions => "ktExtensionFunctions"(id: &Label, ty: &Label, kt_type: &Label);
    write_params => "params"(id: &Label, ty: &Label, kt_type: &Label, pos: i32, parent: &Label, source: &Label);
    write_param_name => "paramName"(id: &Label, name: &str);
    write_class_companion_object => "class_companion_object"(class: &Label, instance: &Label, companion: &Label);
    write_class_object => "class_object"(class: &Label, instance: &Label);
    write_kt_properties => "ktProperties"(id: &Label, name: &str);
    write_kt_property_getters => "ktPropertyGetters"(property: &Label, getter: &Label);
    write_kt_property_setters => "ktPropertySetters"(property: &Label, setter: &Label);
    write_kt_property_backing_fields => "ktPropertyBackingFields"(property: &Label, field: &Label);

    // ------------------------------------------------------------------
    // Code
    // ------------------------------------------------------------------
    write_stmts => "stmts"(id: &Label, kind: StmtTag, parent: &Label, idx: i32, callable: &Label);
    write_exprs => "exprs"(id: &Label, kind: ExprTag, ty: &Label, parent: &Label, idx: i32);
    write_exprs_kotlin_type => "exprsKotlinType"(id: &Label, kt_type: &Label);
    write_callable_enclosing_expr => "callableEnclosingExpr"(expr: &Label, callable: &Label);
    write_callable_binding => "callableBinding"(caller: &Label, callee: &Label);
    write_variable_binding => "variableBinding"(access: &Label, variable: &Label);
    write_localvars => "localvars"(id: &Label, name: &str, ty: &Label, kt_type: &Label, parent: &Label);
    write_namestrings => "namestrings"(name: &str, value: &str, parent: &Label);
    write_kt_break_continue_targets => "ktBreakContinueTargets"(stmt: &Label, target: &Label);
    write_when_if => "when_if"(id: &Label);
    write_when_branch => "when_branch"(id: &Label, parent: &Label, idx: i32);
    write_when_branch_else => "when_branch_else"(id: &Label);
}

impl<W: Write> TrapWriter<W> {
    /// Write an expression row together with its rich type.
    pub fn write_expr(
        &mut self,
        id: &Label,
        kind: ExprTag,
        ty: &Label,
        kt_type: &Label,
        parent: &Label,
        idx: i32,
    ) {
        self.write_exprs(id, kind, ty, parent, idx);
        self.write_exprs_kotlin_type(id, kt_type);
    }
}
