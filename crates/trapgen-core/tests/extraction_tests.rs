//! End-to-end extraction of small programs through the public API.

use trapgen_core::ir::*;
use trapgen_core::{
    equivalent_trap, ExternalClassExtractor, Extractor, FileTrapWriter, LogCounter, Program,
    TrapOutput, TrapWriter,
};

/// Extract source file 0 of `program` and return the trap text.
fn extract_source(program: &Program) -> String {
    let counter = LogCounter::default();
    let dir = tempfile::TempDir::new().unwrap();
    let mut external =
        ExternalClassExtractor::new(program, &counter, TrapOutput::new(dir.path()), "inv.trap");
    let file = &program.files[0];
    let tw = FileTrapWriter::source(TrapWriter::new(Vec::new()), &file.path, file.lines.clone());
    let mut ex = Extractor::new(program, tw, &counter, external.queue_mut());
    ex.extract_file_contents(FileId(0));
    let (tw, _) = ex.finish();
    let out = String::from_utf8(tw.into_inner().into_inner().unwrap()).unwrap();
    external.drain();
    out
}

/// Kind column of a `stmts`/`exprs` row.
fn kind(row: &str) -> i32 {
    row.split(',').nth(1).unwrap().parse().unwrap()
}

fn id(row: &str) -> &str {
    &row[row.find('(').unwrap() + 1..row.find(',').unwrap()]
}

/// Rows of `relation` whose parent column (third for `stmts`, fourth for
/// `exprs`) is `parent`.
fn children<'o>(out: &'o str, relation: &str, parent: &str) -> Vec<&'o str> {
    let column = if relation == "exprs" { 3 } else { 2 };
    let prefix = format!("{}(", relation);
    out.lines()
        .filter(|l| l.starts_with(&prefix) && l.split(',').nth(column) == Some(parent))
        .collect()
}

fn decl(parent: DeclParent, kind: DeclKind) -> Declaration {
    Declaration {
        parent,
        origin: DeclOrigin::Source,
        span: Span::new(0, 1),
        kind,
    }
}

fn builtin(name: &str) -> Declaration {
    Declaration {
        parent: DeclParent::Package("kotlin".into()),
        origin: DeclOrigin::ExternalStub,
        span: Span::UNDEFINED,
        kind: DeclKind::Class(class(name)),
    }
}

fn class(name: &str) -> ClassDecl {
    ClassDecl {
        name: name.into(),
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

fn e(ty: &IrType, kind: ExprKind) -> Expr {
    Expr {
        span: Span::new(0, 1),
        ty: ty.clone(),
        kind,
    }
}

// ============================================================================
// Object initializer
// ============================================================================

/// ```kotlin
/// class C {
///     var x = 3
///     init { f("init2") }
/// }
/// fun f(s: String) {}
/// ```
fn initializer_program() -> Program {
    let unit = DeclId(0);
    let int = DeclId(1);
    let string = DeclId(2);
    let c = DeclId(3);
    let x = DeclId(4);
    let x_field = DeclId(5);
    let init = DeclId(6);
    let f = DeclId(7);
    let s = DeclId(8);
    let unit_ty = IrType::class(unit, vec![]);
    let int_ty = IrType::class(int, vec![]);
    let string_ty = IrType::class(string, vec![]);

    let mut c_decl = class("C");
    c_decl.declarations = vec![x, init];
    let decls = vec![
        builtin("Unit"),
        builtin("Int"),
        builtin("String"),
        decl(DeclParent::File(FileId(0)), DeclKind::Class(c_decl)),
        decl(
            DeclParent::Decl(c),
            DeclKind::Property(PropertyDecl {
                name: "x".into(),
                is_var: true,
                modality: Modality::Final,
                getter: None,
                setter: None,
                backing_field: Some(x_field),
            }),
        ),
        decl(
            DeclParent::Decl(c),
            DeclKind::Field(FieldDecl {
                name: "x".into(),
                ty: int_ty.clone(),
                is_static: false,
                initializer: Some(e(&int_ty, ExprKind::Const(ConstValue::Int(3)))),
            }),
        ),
        decl(
            DeclParent::Decl(c),
            DeclKind::AnonymousInitializer(AnonymousInitializerDecl {
                is_static: false,
                statements: vec![Statement::Expr(e(
                    &unit_ty,
                    ExprKind::Call(Call {
                        callee: f,
                        dispatch_receiver: None,
                        type_arguments: vec![],
                        value_arguments: vec![Some(e(
                            &string_ty,
                            ExprKind::Const(ConstValue::String("init2".into())),
                        ))],
                        origin: None,
                    }),
                ))],
            }),
        ),
        decl(
            DeclParent::File(FileId(0)),
            DeclKind::Function(FunctionDecl {
                name: "f".into(),
                is_constructor: false,
                is_primary: false,
                type_parameters: vec![],
                value_parameters: vec![s],
                dispatch_receiver: None,
                extension_receiver: None,
                return_type: unit_ty,
                body: None,
            }),
        ),
        decl(
            DeclParent::Decl(f),
            DeclKind::ValueParameter(ValueParameterDecl {
                name: "s".into(),
                index: 0,
                ty: string_ty,
            }),
        ),
    ];
    let file = FileEntry {
        path: "src/p/C.kt".into(),
        package: "p".into(),
        declarations: vec![c, f],
        annotations: vec![],
        lines: LineTable::from_text("class C {\n    var x = 3\n    init { f(\"init2\") }\n}\n"),
    };
    Program::new(vec![file], decls).unwrap()
}

#[test]
fn test_object_initializer_assigns_then_calls() {
    let program = initializer_program();
    let out = extract_source(&program);

    let obinit_row = out
        .lines()
        .find(|l| l.starts_with("methods(") && l.contains("\"<obinit>\""))
        .unwrap();
    let obinit = id(obinit_row);
    let block = children(&out, "stmts", obinit);
    assert_eq!(block.len(), 1);
    let block = id(block[0]);

    let statements = children(&out, "stmts", block);
    assert_eq!(statements.len(), 2);
    assert!(statements.iter().all(|s| kind(s) == 14));
    assert!(statements[0].contains(&format!(",{},0,", block)));
    assert!(statements[1].contains(&format!(",{},1,", block)));

    // x = 3
    let assign = children(&out, "exprs", id(statements[0]));
    assert_eq!(assign.len(), 1);
    assert_eq!(kind(assign[0]), 4);
    let operands = children(&out, "exprs", id(assign[0]));
    assert_eq!(operands.len(), 2);
    assert_eq!(kind(operands[0]), 60);
    assert_eq!(kind(operands[1]), 17);
    assert!(out.contains(&format!("variableBinding({},", id(operands[0]))));

    // f("init2")
    let call = children(&out, "exprs", id(statements[1]));
    assert_eq!(call.len(), 1);
    assert_eq!(kind(call[0]), 61);
    let f_row = out
        .lines()
        .find(|l| l.starts_with("methods(") && l.contains(",\"f\",\"f(String)\","))
        .unwrap();
    assert!(out.contains(&format!("callableBinding({},{})", id(call[0]), id(f_row))));
    assert!(out.contains("namestrings(\"init2\",\"init2\","));
}

// ============================================================================
// JSON documents
// ============================================================================

const MAIN_DOCUMENT: &str = r#"{
    "files": [{
        "path": "src/Main.kt",
        "package": "app",
        "declarations": [1],
        "lines": [0, 26]
    }],
    "declarations": [
        {"parent": {"package": "kotlin"}, "origin": "external_stub",
         "kind": {"class": {"name": "Unit"}}},
        {"parent": {"file": 0}, "span": {"start": 0, "end": 25},
         "kind": {"function": {
            "name": "main",
            "return_type": {"simple": {"classifier": {"class": 0}}},
            "body": {"span": {"start": 11, "end": 25}, "statements": []}
         }}}
    ]
}"#;

#[test]
fn test_json_document_extraction() {
    let program = Program::from_json_str(MAIN_DOCUMENT).unwrap();
    let out = extract_source(&program);
    assert!(out.contains("=@\"package;app\""));
    assert!(out.contains("=@\"class;app.MainKt\""));
    assert!(out.contains(",\"main\",\"main()\","));
    assert!(out.contains("=@\"type;void\""));
    assert!(out.contains("files("));
    assert!(!out.contains("diagnostics("));
}

#[test]
fn test_extraction_is_deterministic() {
    let first = extract_source(&Program::from_json_str(MAIN_DOCUMENT).unwrap());
    let second = extract_source(&Program::from_json_str(MAIN_DOCUMENT).unwrap());
    assert_eq!(first, second);
    assert!(equivalent_trap(first.as_bytes(), second.as_bytes()).unwrap());

    let first = extract_source(&initializer_program());
    let second = extract_source(&initializer_program());
    assert!(equivalent_trap(first.as_bytes(), second.as_bytes()).unwrap());
}
