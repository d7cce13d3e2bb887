//! Statement and expression extraction.
//!
//! The IR does not separate statements from expressions, but the schema
//! does: every node is attached either to a statement slot or to an
//! expression slot of its parent ([`Parent`]). A node of the wrong kind for
//! its slot is wrapped, an expression in an `exprstmt` and a statement in a
//! `stmtexpr`.

use std::io::Write;

use super::Extractor;
use crate::ir::{
    Body, Call, ConstValue, DeclId, DeclKind, DeclParent, Expr, ExprKind, IrType, Jump, Loop,
    Span, Statement, StatementOrigin, TypeOperator, VarargElement,
};
use crate::label::Label;
use crate::logging::Severity;
use crate::schema::{ExprTag, StmtTag};

/// The slot an extracted node is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    Stmt { parent: Label, idx: i32 },
    Expr { parent: Label, idx: i32 },
}

fn binary_tag(origin: StatementOrigin) -> Option<ExprTag> {
    match origin {
        StatementOrigin::Plus => Some(ExprTag::Add),
        StatementOrigin::Minus => Some(ExprTag::Sub),
        StatementOrigin::Div => Some(ExprTag::Div),
        StatementOrigin::Perc => Some(ExprTag::Rem),
        StatementOrigin::EqEq => Some(ExprTag::Eq),
        StatementOrigin::ExclEq => Some(ExprTag::Ne),
        StatementOrigin::Lt => Some(ExprTag::Lt),
        StatementOrigin::LtEq => Some(ExprTag::Le),
        StatementOrigin::Gt => Some(ExprTag::Gt),
        StatementOrigin::GtEq => Some(ExprTag::Ge),
        StatementOrigin::If | StatementOrigin::Other => None,
    }
}

impl<'a, W: Write> Extractor<'a, W> {
    // ========================================================================
    // Slots
    // ========================================================================

    /// Expression slot for `e`, wrapping it in an `exprstmt` if `parent` is
    /// a statement slot.
    fn as_expr(&mut self, e: &Expr, callable: &Label, parent: Parent) -> (Label, i32) {
        match parent {
            Parent::Expr { parent, idx } => (parent, idx),
            Parent::Stmt { parent, idx } => {
                let stmt = self.write_stmt_node(StmtTag::ExprStmt, e.span, &parent, idx, callable);
                (stmt, 0)
            }
        }
    }

    /// Statement slot for `e`, wrapping it in a `stmtexpr` if `parent` is an
    /// expression slot.
    fn as_stmt(&mut self, e: &Expr, callable: &Label, parent: Parent) -> (Label, i32) {
        match parent {
            Parent::Stmt { parent, idx } => (parent, idx),
            Parent::Expr { parent, idx } => {
                let id = self.write_expr_node(ExprTag::StmtExpr, e, &parent, idx, callable);
                (id, 0)
            }
        }
    }

    fn write_expr_node(
        &mut self,
        tag: ExprTag,
        e: &Expr,
        parent: &Label,
        idx: i32,
        callable: &Label,
    ) -> Label {
        self.write_typed_expr_node(tag, &e.ty, Some(e.span), parent, idx, callable)
    }

    fn write_typed_expr_node(
        &mut self,
        tag: ExprTag,
        ty: &IrType,
        span: Option<Span>,
        parent: &Label,
        idx: i32,
        callable: &Label,
    ) -> Label {
        let id = self.tw.fresh_label();
        let ty = self.use_type(ty);
        self.tw
            .write_expr(&id, tag, &ty.java.label, &ty.kotlin.label, parent, idx);
        if let Some(span) = span {
            self.tw.write_span_location(&id, span);
        }
        self.tw.write_callable_enclosing_expr(&id, callable);
        id
    }

    fn write_stmt_node(
        &mut self,
        tag: StmtTag,
        span: Span,
        parent: &Label,
        idx: i32,
        callable: &Label,
    ) -> Label {
        let id = self.tw.fresh_label();
        self.tw.write_stmts(&id, tag, parent, idx, callable);
        self.tw.write_span_location(&id, span);
        id
    }

    /// `unannotatedtypeaccess` naming `ty`.
    fn extract_type_access(
        &mut self,
        ty: &IrType,
        span: Option<Span>,
        parent: &Label,
        idx: i32,
        callable: &Label,
    ) -> Label {
        self.write_typed_expr_node(ExprTag::TypeAccess, ty, span, parent, idx, callable)
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    pub fn extract_expression_stmt(&mut self, e: &Expr, callable: &Label, parent: &Label, idx: i32) {
        let parent = Parent::Stmt {
            parent: parent.clone(),
            idx,
        };
        self.extract_expression(e, callable, parent);
    }

    pub fn extract_expression_expr(&mut self, e: &Expr, callable: &Label, parent: &Label, idx: i32) {
        let parent = Parent::Expr {
            parent: parent.clone(),
            idx,
        };
        self.extract_expression(e, callable, parent);
    }

    /// Function body as a block in slot 0 of the callable.
    pub(crate) fn extract_body(&mut self, body: &Body, callable: &Label) {
        let block = self.write_stmt_node(StmtTag::Block, body.span, callable, 0, callable);
        for (i, statement) in body.statements.iter().enumerate() {
            self.extract_statement(statement, callable, &block, i as i32);
        }
    }

    pub fn extract_statement(
        &mut self,
        statement: &Statement,
        callable: &Label,
        parent: &Label,
        idx: i32,
    ) {
        match statement {
            Statement::Expr(e) => self.extract_expression_stmt(e, callable, parent, idx),
            Statement::Variable(v) => self.extract_variable(*v, callable, parent, idx),
            Statement::Declaration(d) => {
                let program = self.program;
                let Some(decl) = program.decl(*d) else {
                    self.warn(Severity::ErrorSevere, &format!("No such declaration {}", d));
                    return;
                };
                if let DeclKind::Class(_) = decl.kind {
                    self.write_stmt_node(StmtTag::LocalTypeDecl, decl.span, parent, idx, callable);
                    self.extract_class_source(*d);
                } else {
                    self.warn_at(
                        Severity::ErrorSevere,
                        &format!("Unrecognised statement: local {}", decl.kind.describe()),
                        decl.span,
                    );
                }
            }
        }
    }

    fn extract_variable(&mut self, variable: DeclId, callable: &Label, parent: &Label, idx: i32) {
        let span = self
            .program
            .decl(variable)
            .map(|d| d.span)
            .unwrap_or(Span::UNDEFINED);
        let stmt = self.write_stmt_node(StmtTag::LocalVariableDecl, span, parent, idx, callable);
        self.extract_variable_expr(variable, callable, &stmt, 1);
    }

    /// `localvariabledeclexpr` declaring `variable`, with its initializer in
    /// slot 0.
    fn extract_variable_expr(
        &mut self,
        variable: DeclId,
        callable: &Label,
        parent: &Label,
        idx: i32,
    ) {
        let program = self.program;
        let (Some(decl), Some(DeclKind::Variable(v))) =
            (program.decl(variable), program.decl(variable).map(|d| &d.kind))
        else {
            self.warn(
                Severity::ErrorSevere,
                &format!("{} is not a local variable", variable),
            );
            return;
        };
        let var_id = self.use_variable(variable);
        let expr_id = self.tw.fresh_label();
        let ty = self.use_type(&v.ty);
        let loc = self.tw.location(decl.span);
        self.tw
            .write_localvars(&var_id, &v.name, &ty.java.label, &ty.kotlin.label, &expr_id);
        self.tw.write_has_location(&var_id, &loc);
        self.tw.write_expr(
            &expr_id,
            ExprTag::LocalVariableDecl,
            &ty.java.label,
            &ty.kotlin.label,
            parent,
            idx,
        );
        self.tw.write_has_location(&expr_id, &loc);
        self.tw.write_callable_enclosing_expr(&expr_id, callable);
        if let Some(initializer) = &v.initializer {
            self.extract_expression_expr(initializer, callable, &expr_id, 0);
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn extract_expression(&mut self, e: &Expr, callable: &Label, parent: Parent) {
        match &e.kind {
            ExprKind::Call(call) => self.extract_call(e, call, callable, parent),
            ExprKind::ConstructorCall(call) | ExprKind::EnumConstructorCall(call) => {
                self.extract_constructor_call(e, call, callable, parent)
            }
            ExprKind::DelegatingConstructorCall(call) => {
                self.extract_delegating_constructor_call(e, call, callable, parent)
            }
            ExprKind::InstanceInitializerCall { class } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(ExprTag::MethodAccess, e, &p, i, callable);
                let unit = self.builtin_type("Unit");
                let key = self.function_label_key(&DeclParent::Decl(*class), "<obinit>", &[], &unit);
                let obinit = self.tw.label_for(&key);
                self.tw.write_callable_binding(&id, &obinit);
            }
            ExprKind::Throw { value } => {
                let (p, i) = self.as_stmt(e, callable, parent);
                let stmt = self.write_stmt_node(StmtTag::Throw, e.span, &p, i, callable);
                self.extract_expression_expr(value, callable, &stmt, 0);
            }
            ExprKind::Return { value } => {
                let (p, i) = self.as_stmt(e, callable, parent);
                let stmt = self.write_stmt_node(StmtTag::Return, e.span, &p, i, callable);
                self.extract_expression_expr(value, callable, &stmt, 0);
            }
            ExprKind::Break(jump) => self.extract_jump(StmtTag::Break, e, jump, callable, parent),
            ExprKind::Continue(jump) => {
                self.extract_jump(StmtTag::Continue, e, jump, callable, parent)
            }
            ExprKind::Try {
                result,
                catches,
                finally,
            } => {
                let (p, i) = self.as_stmt(e, callable, parent);
                let stmt = self.write_stmt_node(StmtTag::Try, e.span, &p, i, callable);
                self.extract_expression_stmt(result, callable, &stmt, -1);
                for (idx, catch) in catches.iter().enumerate() {
                    let clause = self.write_stmt_node(
                        StmtTag::CatchClause,
                        catch.result.span,
                        &stmt,
                        idx as i32,
                        callable,
                    );
                    self.extract_variable_expr(catch.parameter, callable, &clause, 0);
                    self.extract_expression_stmt(&catch.result, callable, &clause, 1);
                }
                if let Some(finally) = finally {
                    self.extract_expression_stmt(finally, callable, &stmt, -2);
                }
            }
            ExprKind::Block { statements } => {
                let (p, i) = self.as_stmt(e, callable, parent);
                let block = self.write_stmt_node(StmtTag::Block, e.span, &p, i, callable);
                for (idx, statement) in statements.iter().enumerate() {
                    self.extract_statement(statement, callable, &block, idx as i32);
                }
            }
            ExprKind::While(lp) => self.extract_loop(StmtTag::While, e, lp, callable, parent),
            ExprKind::DoWhile(lp) => self.extract_loop(StmtTag::Do, e, lp, callable, parent),
            ExprKind::StringConcatenation { arguments } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(ExprTag::StringTemplate, e, &p, i, callable);
                for (idx, arg) in arguments.iter().enumerate() {
                    self.extract_expression_expr(arg, callable, &id, idx as i32);
                }
            }
            ExprKind::Const(value) => {
                let (p, i) = self.as_expr(e, callable, parent);
                self.extract_constant(e, value, callable, &p, i);
            }
            ExprKind::GetValue { symbol } => {
                let (p, i) = self.as_expr(e, callable, parent);
                self.extract_get_value(e, *symbol, callable, &p, i);
            }
            ExprKind::GetField { field } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(ExprTag::VarAccess, e, &p, i, callable);
                let field_label = self.use_field(*field);
                self.tw.write_variable_binding(&id, &field_label);
            }
            ExprKind::GetEnumValue { entry } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(ExprTag::VarAccess, e, &p, i, callable);
                let entry_label = self.use_enum_entry(*entry);
                self.tw.write_variable_binding(&id, &entry_label);
            }
            ExprKind::SetValue { symbol, value } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let target = self.use_value_declaration(*symbol);
                self.extract_assignment(e, *symbol, &target, value, callable, &p, i);
            }
            ExprKind::SetField { field, value } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let target = self.use_field(*field);
                self.extract_assignment(e, *field, &target, value, callable, &p, i);
            }
            ExprKind::When { origin, branches } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(ExprTag::When, e, &p, i, callable);
                if *origin == Some(StatementOrigin::If) {
                    self.tw.write_when_if(&id);
                }
                for (idx, branch) in branches.iter().enumerate() {
                    let branch_id = self.tw.fresh_label();
                    self.tw.write_when_branch(&branch_id, &id, idx as i32);
                    self.tw.write_span_location(&branch_id, branch.span);
                    self.extract_expression_expr(&branch.condition, callable, &branch_id, 0);
                    self.extract_expression_stmt(&branch.result, callable, &branch_id, 1);
                    if branch.is_else {
                        self.tw.write_when_branch_else(&branch_id);
                    }
                }
            }
            ExprKind::GetClass { argument } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(ExprTag::GetClass, e, &p, i, callable);
                self.extract_expression_expr(argument, callable, &id, 0);
            }
            ExprKind::TypeOperator {
                operator,
                operand,
                argument,
            } => self.extract_type_operator(e, *operator, operand, argument, callable, parent),
            ExprKind::Vararg { elements } => {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(ExprTag::Vararg, e, &p, i, callable);
                for (idx, element) in elements.iter().enumerate() {
                    match element {
                        VarargElement::Expr(x) => {
                            self.extract_expression_expr(x, callable, &id, idx as i32)
                        }
                        VarargElement::Spread(x) => self.warn_at(
                            Severity::ErrorSevere,
                            "Unrecognised vararg element: spread",
                            x.span,
                        ),
                    }
                }
            }
            ExprKind::GetObjectValue { class } => {
                let (p, i) = self.as_expr(e, callable, parent);
                self.extract_get_object_value(e, *class, callable, &p, i);
            }
            ExprKind::Unsupported { description } => self.warn_at(
                Severity::ErrorSevere,
                &format!("Unrecognised expression: {}", description),
                e.span,
            ),
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn extract_call(&mut self, e: &Expr, call: &Call, callable: &Label, parent: Parent) {
        // Operator calls with two operands become the corresponding binary
        // expression.
        let operands: Vec<&Expr> = call
            .dispatch_receiver
            .as_deref()
            .into_iter()
            .chain(call.value_arguments.iter().flatten())
            .collect();
        if let Some(tag) = call.origin.and_then(binary_tag) {
            if operands.len() == 2 {
                let (p, i) = self.as_expr(e, callable, parent);
                let id = self.write_expr_node(tag, e, &p, i, callable);
                for (idx, operand) in operands.into_iter().enumerate() {
                    self.extract_expression_expr(operand, callable, &id, idx as i32);
                }
                return;
            }
        }

        let (p, i) = self.as_expr(e, callable, parent);
        let id = self.write_expr_node(ExprTag::MethodAccess, e, &p, i, callable);
        let target = self.use_function(call.callee);
        self.tw.write_callable_binding(&id, &target);

        for (idx, type_argument) in call.type_arguments.iter().enumerate() {
            let ty_id = self.tw.fresh_label();
            let ty = self.use_reference_type(type_argument);
            self.tw.write_expr(
                &ty_id,
                ExprTag::TypeAccess,
                &ty.java.label,
                &ty.kotlin.label,
                &id,
                -2 - idx as i32,
            );
            self.tw.write_callable_enclosing_expr(&ty_id, callable);
        }
        if let Some(receiver) = &call.dispatch_receiver {
            self.extract_expression_expr(receiver, callable, &id, -1);
        }
        self.extract_value_arguments(call, callable, &id);
    }

    fn extract_value_arguments(&mut self, call: &Call, callable: &Label, id: &Label) {
        for (idx, arg) in call.value_arguments.iter().enumerate() {
            if let Some(arg) = arg {
                self.extract_expression_expr(arg, callable, id, idx as i32);
            }
        }
    }

    fn extract_constructor_call(&mut self, e: &Expr, call: &Call, callable: &Label, parent: Parent) {
        let (p, i) = self.as_expr(e, callable, parent);
        let id = self.write_expr_node(ExprTag::New, e, &p, i, callable);
        let target = self.use_function(call.callee);
        self.tw.write_callable_binding(&id, &target);
        self.extract_value_arguments(call, callable, &id);
        if let Some(receiver) = &call.dispatch_receiver {
            self.extract_expression_expr(receiver, callable, &id, -2);
        }
        if !call.type_arguments.is_empty() {
            let access = self.extract_type_access(&e.ty, Some(e.span), &id, -3, callable);
            for (idx, type_argument) in call.type_arguments.iter().enumerate() {
                let ty = self.use_reference_type(type_argument);
                let ty_id = self.tw.fresh_label();
                self.tw.write_expr(
                    &ty_id,
                    ExprTag::TypeAccess,
                    &ty.java.label,
                    &ty.kotlin.label,
                    &access,
                    idx as i32,
                );
                self.tw.write_callable_enclosing_expr(&ty_id, callable);
            }
        }
    }

    /// `this(...)` or `super(...)`, decided by whether the callee is a
    /// constructor of the enclosing function's own class.
    fn extract_delegating_constructor_call(
        &mut self,
        e: &Expr,
        call: &Call,
        callable: &Label,
        parent: Parent,
    ) {
        let Some(current) = self.current_function else {
            self.warn_at(
                Severity::ErrorSevere,
                "Delegating constructor call outside a function",
                e.span,
            );
            return;
        };
        let program = self.program;
        let (p, i) = self.as_stmt(e, callable, parent);
        let own_class = program.parent_class(current);
        let tag = if own_class.is_some() && program.parent_class(call.callee) == own_class {
            StmtTag::ConstructorInvocation
        } else {
            StmtTag::SuperConstructorInvocation
        };
        let stmt = self.write_stmt_node(tag, e.span, &p, i, callable);
        let target = self.use_function(call.callee);
        self.tw.write_callable_binding(&stmt, &target);
        self.extract_value_arguments(call, callable, &stmt);
        if let Some(receiver) = &call.dispatch_receiver {
            self.extract_expression_expr(receiver, callable, &stmt, -1);
        }
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn extract_jump(&mut self, tag: StmtTag, e: &Expr, jump: &Jump, callable: &Label, parent: Parent) {
        let (p, i) = self.as_stmt(e, callable, parent);
        let stmt = self.write_stmt_node(tag, e.span, &p, i, callable);
        if let Some(label) = &jump.label {
            self.tw.write_namestrings(label, "", &stmt);
        }
        match self.loop_labels.get(&jump.loop_id).cloned() {
            Some(target) => self.tw.write_kt_break_continue_targets(&stmt, &target),
            None => self.warn_at(
                Severity::ErrorSevere,
                &format!("Missing {} target", tag.name()),
                e.span,
            ),
        }
    }

    fn extract_loop(&mut self, tag: StmtTag, e: &Expr, lp: &Loop, callable: &Label, parent: Parent) {
        let (mut p, mut i) = self.as_stmt(e, callable, parent);
        if let Some(label) = &lp.label {
            let labeled = self.write_stmt_node(StmtTag::Labeled, e.span, &p, i, callable);
            self.tw.write_namestrings(label, "", &labeled);
            p = labeled;
            i = 0;
        }
        let stmt = self.write_stmt_node(tag, e.span, &p, i, callable);
        self.loop_labels.insert(lp.id, stmt.clone());
        self.extract_expression_expr(&lp.condition, callable, &stmt, 0);
        if let Some(body) = &lp.body {
            self.extract_expression_stmt(body, callable, &stmt, 1);
        }
        self.loop_labels.remove(&lp.id);
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn extract_constant(
        &mut self,
        e: &Expr,
        value: &ConstValue,
        callable: &Label,
        parent: &Label,
        idx: i32,
    ) {
        let (tag, text) = match value {
            ConstValue::Int(v) => (ExprTag::IntegerLiteral, Some(v.to_string())),
            ConstValue::Short(v) => (ExprTag::IntegerLiteral, Some(v.to_string())),
            ConstValue::Byte(v) => (ExprTag::IntegerLiteral, Some(v.to_string())),
            ConstValue::Long(v) => (ExprTag::LongLiteral, Some(v.to_string())),
            ConstValue::Float(v) => (ExprTag::FloatLiteral, Some(format!("{:?}", v))),
            ConstValue::Double(v) => (ExprTag::DoubleLiteral, Some(format!("{:?}", v))),
            ConstValue::Boolean(v) => (ExprTag::BooleanLiteral, Some(v.to_string())),
            ConstValue::Char(v) => (ExprTag::CharacterLiteral, Some(v.to_string())),
            ConstValue::String(v) => (ExprTag::StringLiteral, Some(v.clone())),
            ConstValue::Null => (ExprTag::NullLiteral, None),
        };
        let id = self.write_expr_node(tag, e, parent, idx, callable);
        if let Some(text) = text {
            self.tw.write_namestrings(&text, &text, &id);
        }
    }

    fn extract_get_value(
        &mut self,
        e: &Expr,
        symbol: DeclId,
        callable: &Label,
        parent: &Label,
        idx: i32,
    ) {
        let program = self.program;
        let receiver = program.decl(symbol).and_then(|d| match &d.kind {
            DeclKind::ValueParameter(vp) if vp.index == -1 => Some(d),
            _ => None,
        });
        let Some(receiver) = receiver else {
            let id = self.write_expr_node(ExprTag::VarAccess, e, parent, idx, callable);
            let target = self.use_value_declaration(symbol);
            self.tw.write_variable_binding(&id, &target);
            return;
        };

        let id = self.write_expr_node(ExprTag::ThisAccess, e, parent, idx, callable);
        let DeclParent::Decl(owner) = receiver.parent else {
            return;
        };
        if let Some(class) = program.class(owner) {
            if class.this_receiver == Some(symbol) {
                self.extract_type_access(&e.ty, Some(e.span), &id, 0, callable);
            } else {
                self.warn_at(
                    Severity::ErrorSevere,
                    "Unexpected this receiver of a class",
                    e.span,
                );
            }
        } else if let Some(function) = program.function(owner) {
            if function.dispatch_receiver == Some(symbol) && function.extension_receiver.is_some() {
                self.warn_at(Severity::ErrorSevere, "Function-qualifier for this", e.span);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_assignment(
        &mut self,
        e: &Expr,
        target_decl: DeclId,
        target: &Label,
        value: &Expr,
        callable: &Label,
        parent: &Label,
        idx: i32,
    ) {
        let id = self.write_expr_node(ExprTag::Assign, e, parent, idx, callable);
        let target_type = self.value_declaration_type(target_decl);
        let lhs = self.write_typed_expr_node(
            ExprTag::VarAccess,
            &target_type,
            Some(e.span),
            &id,
            0,
            callable,
        );
        self.tw.write_variable_binding(&lhs, target);
        self.extract_expression_expr(value, callable, &id, 1);
    }

    fn extract_type_operator(
        &mut self,
        e: &Expr,
        operator: TypeOperator,
        operand: &IrType,
        argument: &Expr,
        callable: &Label,
        parent: Parent,
    ) {
        let tag = match operator {
            TypeOperator::Cast
            | TypeOperator::ImplicitCast
            | TypeOperator::ImplicitNotnull
            | TypeOperator::ImplicitCoercionToUnit => ExprTag::Cast,
            TypeOperator::Instanceof => ExprTag::InstanceOf,
            TypeOperator::NotInstanceof => ExprTag::NotInstanceOf,
            TypeOperator::Other => {
                self.warn_at(
                    Severity::ErrorSevere,
                    "Unrecognised type operator",
                    e.span,
                );
                return;
            }
        };
        let (p, i) = self.as_expr(e, callable, parent);
        let id = self.write_expr_node(tag, e, &p, i, callable);
        let (type_idx, argument_idx) = if tag == ExprTag::Cast { (0, 1) } else { (1, 0) };
        self.extract_type_access(operand, Some(e.span), &id, type_idx, callable);
        self.extract_expression_expr(argument, callable, &id, argument_idx);
    }

    fn extract_get_object_value(
        &mut self,
        e: &Expr,
        class: DeclId,
        callable: &Label,
        parent: &Label,
        idx: i32,
    ) {
        let id = self.write_expr_node(ExprTag::VarAccess, e, parent, idx, callable);
        let Some(c) = self.program.class(class) else {
            self.warn_at(
                Severity::ErrorSevere,
                &format!("Object value of non-class {}", class),
                e.span,
            );
            return;
        };
        let instance = if c.is_companion {
            self.use_companion_object_class_instance(class)
                .map(|(label, _)| label)
        } else {
            Some(self.use_object_class_instance(class).0)
        };
        if let Some(instance) = instance {
            self.tw.write_variable_binding(&id, &instance);
        }
    }
}
