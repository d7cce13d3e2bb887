//! IR statements and expressions.

use serde::{Deserialize, Serialize};

use super::location::Span;
use super::types::IrType;
use super::{DeclId, LoopId};

/// An element of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Expr(Expr),
    /// Declaration of a local variable.
    Variable(DeclId),
    /// A local class or function.
    Declaration(DeclId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub span: Span,
    pub ty: IrType,
    pub kind: ExprKind,
}

/// Syntactic form a call or `when` was lowered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementOrigin {
    #[serde(rename = "PLUS")]
    Plus,
    #[serde(rename = "MINUS")]
    Minus,
    #[serde(rename = "DIV")]
    Div,
    #[serde(rename = "PERC")]
    Perc,
    #[serde(rename = "EQEQ")]
    EqEq,
    #[serde(rename = "EXCLEQ")]
    ExclEq,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "LTEQ")]
    LtEq,
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "GTEQ")]
    GtEq,
    #[serde(rename = "IF")]
    If,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeOperator {
    Cast,
    ImplicitCast,
    ImplicitNotnull,
    ImplicitCoercionToUnit,
    Instanceof,
    NotInstanceof,
    #[serde(other)]
    Other,
}

/// A call to a function or constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: DeclId,
    #[serde(default)]
    pub dispatch_receiver: Option<Box<Expr>>,
    #[serde(default)]
    pub type_arguments: Vec<IrType>,
    /// One slot per parameter; `None` where a default is used.
    #[serde(default)]
    pub value_arguments: Vec<Option<Expr>>,
    #[serde(default)]
    pub origin: Option<StatementOrigin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jump {
    #[serde(rename = "loop")]
    pub loop_id: LoopId,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub id: LoopId,
    #[serde(default)]
    pub label: Option<String>,
    pub condition: Box<Expr>,
    #[serde(default)]
    pub body: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catch {
    /// The caught exception variable.
    pub parameter: DeclId,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub span: Span,
    pub condition: Expr,
    pub result: Expr,
    #[serde(default)]
    pub is_else: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarargElement {
    Expr(Expr),
    /// `*array`
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Int(i32),
    Short(i16),
    Byte(i8),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Char(char),
    String(String),
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// `this(...)` or `super(...)` inside a constructor.
    DelegatingConstructorCall(Call),
    ConstructorCall(Call),
    EnumConstructorCall(Call),
    Call(Call),
    /// Runs the field initializers and `init` blocks of `class`.
    InstanceInitializerCall {
        class: DeclId,
    },
    Throw {
        value: Box<Expr>,
    },
    Break(Jump),
    Continue(Jump),
    Return {
        value: Box<Expr>,
    },
    Try {
        result: Box<Expr>,
        #[serde(default)]
        catches: Vec<Catch>,
        #[serde(default)]
        finally: Option<Box<Expr>>,
    },
    Block {
        statements: Vec<Statement>,
    },
    While(Loop),
    DoWhile(Loop),
    StringConcatenation {
        arguments: Vec<Expr>,
    },
    Const(ConstValue),
    GetValue {
        symbol: DeclId,
    },
    GetField {
        field: DeclId,
    },
    GetEnumValue {
        entry: DeclId,
    },
    SetValue {
        symbol: DeclId,
        value: Box<Expr>,
    },
    SetField {
        field: DeclId,
        value: Box<Expr>,
    },
    When {
        #[serde(default)]
        origin: Option<StatementOrigin>,
        branches: Vec<Branch>,
    },
    GetClass {
        argument: Box<Expr>,
    },
    TypeOperator {
        operator: TypeOperator,
        operand: IrType,
        argument: Box<Expr>,
    },
    Vararg {
        elements: Vec<VarargElement>,
    },
    /// Reference to the singleton instance of an `object` or companion.
    GetObjectValue {
        class: DeclId,
    },
    /// Any node the front end could not express in this model.
    Unsupported {
        description: String,
    },
}

impl ExprKind {
    /// Short node name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            ExprKind::DelegatingConstructorCall(_) => "delegating constructor call",
            ExprKind::ConstructorCall(_) => "constructor call",
            ExprKind::EnumConstructorCall(_) => "enum constructor call",
            ExprKind::Call(_) => "call",
            ExprKind::InstanceInitializerCall { .. } => "instance initializer call",
            ExprKind::Throw { .. } => "throw",
            ExprKind::Break(_) => "break",
            ExprKind::Continue(_) => "continue",
            ExprKind::Return { .. } => "return",
            ExprKind::Try { .. } => "try",
            ExprKind::Block { .. } => "block",
            ExprKind::While(_) => "while",
            ExprKind::DoWhile(_) => "do-while",
            ExprKind::StringConcatenation { .. } => "string concatenation",
            ExprKind::Const(_) => "constant",
            ExprKind::GetValue { .. } => "get value",
            ExprKind::GetField { .. } => "get field",
            ExprKind::GetEnumValue { .. } => "get enum value",
            ExprKind::SetValue { .. } => "set value",
            ExprKind::SetField { .. } => "set field",
            ExprKind::When { .. } => "when",
            ExprKind::GetClass { .. } => "get class",
            ExprKind::TypeOperator { .. } => "type operator",
            ExprKind::Vararg { .. } => "vararg",
            ExprKind::GetObjectValue { .. } => "get object value",
            ExprKind::Unsupported { .. } => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_names() {
        let o: StatementOrigin = serde_json::from_str("\"EXCLEQ\"").unwrap();
        assert_eq!(o, StatementOrigin::ExclEq);
        let o: StatementOrigin = serde_json::from_str("\"GET_PROPERTY\"").unwrap();
        assert_eq!(o, StatementOrigin::Other);
        let op: TypeOperator = serde_json::from_str("\"IMPLICIT_COERCION_TO_UNIT\"").unwrap();
        assert_eq!(op, TypeOperator::ImplicitCoercionToUnit);
        let op: TypeOperator = serde_json::from_str("\"SAFE_CAST\"").unwrap();
        assert_eq!(op, TypeOperator::Other);
    }

    #[test]
    fn test_expr_json_shape() {
        let json = r#"{
            "span": {"start": 0, "end": 9},
            "ty": {"simple": {"classifier": {"class": 1}}},
            "kind": {"call": {"callee": 5, "origin": "PLUS",
                "value_arguments": [{"ty": {"simple": {"classifier": {"class": 1}}}, "kind": {"const": {"int": 2}}}, null]}}
        }"#;
        let e: Expr = serde_json::from_str(json).unwrap();
        let ExprKind::Call(call) = &e.kind else {
            panic!("expected call, got {:?}", e.kind);
        };
        assert_eq!(call.callee, DeclId(5));
        assert_eq!(call.origin, Some(StatementOrigin::Plus));
        assert_eq!(call.value_arguments.len(), 2);
        assert!(call.value_arguments[1].is_none());
        assert!(matches!(
            call.value_arguments[0].as_ref().map(|a| &a.kind),
            Some(ExprKind::Const(ConstValue::Int(2)))
        ));
    }
}
