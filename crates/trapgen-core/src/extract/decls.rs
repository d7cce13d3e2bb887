//! Declaration extraction: files, classes, callables, properties.

use std::io::Write;

use super::Extractor;
use crate::ir::{
    qualify, ClassKind, ConstValue, DeclId, DeclKind, DeclParent, ExprKind, FileEntry, FileId,
    Modality, TypeArgument,
};
use crate::label::Label;
use crate::logging::Severity;
use crate::schema::{ExprTag, StmtTag};

const JVM_NAME_ANNOTATION: &str = "kotlin.jvm.JvmName";

/// Name of the class holding a file's top-level members: `Utils.kt`
/// becomes `UtilsKt`.
pub fn default_file_class_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".kt").unwrap_or(file_name);
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => format!("{}{}Kt", first.to_uppercase(), chars.as_str()),
        None => "Kt".to_string(),
    }
}

impl<'a, W: Write> Extractor<'a, W> {
    // ========================================================================
    // Files
    // ========================================================================

    /// Extract a source file: its package, its file class and every
    /// top-level declaration.
    pub fn extract_file_contents(&mut self, file: FileId) {
        let program = self.program;
        let Some(entry) = program.file(file) else {
            self.warn(Severity::ErrorGlobal, &format!("No such file {}", file));
            return;
        };
        let loc = self.tw.whole_file_location();
        let pkg = self.use_package(&entry.package);
        let file_label = self.tw.file_label();
        self.tw.write_has_location(&file_label, &loc);
        self.tw.write_cupackage(&file_label, &pkg);

        if entry.declarations.is_empty() {
            return;
        }
        let file_class = self.extract_file_class(file, entry);
        for decl in &entry.declarations {
            self.extract_declaration(*decl, &file_class);
        }
    }

    /// Label of the synthetic class that owns a file's top-level functions
    /// and properties.
    pub(crate) fn use_file_class(&mut self, file: FileId) -> Label {
        let program = self.program;
        let Some(entry) = program.file(file) else {
            return Label::placeholder();
        };
        let name = self.file_class_name(entry);
        self.tw
            .label_for(&format!("class;{}", qualify(&entry.package, &name)))
    }

    fn file_class_name(&self, entry: &FileEntry) -> String {
        self.jvm_name_annotation(entry)
            .unwrap_or_else(|| default_file_class_name(entry.name()))
    }

    fn extract_file_class(&mut self, file: FileId, entry: &FileEntry) -> Label {
        let id = self.use_file_class(file);
        let name = self.file_class_name(entry);
        let loc = self.tw.whole_file_location();
        let pkg = self.use_package(&entry.package);
        self.tw.write_classes(&id, &name, &pkg, &id);
        self.tw.write_has_location(&id, &loc);
        id
    }

    fn jvm_name_annotation(&self, entry: &FileEntry) -> Option<String> {
        entry
            .annotations
            .iter()
            .find(|a| self.program.fq_name(a.class).as_deref() == Some(JVM_NAME_ANNOTATION))
            .and_then(|a| match a.arguments.first().map(|e| &e.kind) {
                Some(ExprKind::Const(ConstValue::String(name))) => Some(name.clone()),
                _ => None,
            })
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    pub fn extract_declaration(&mut self, decl: DeclId, parent_id: &Label) {
        let program = self.program;
        let Some(d) = program.decl(decl) else {
            self.warn(Severity::ErrorSevere, &format!("No such declaration {}", decl));
            return;
        };
        match &d.kind {
            DeclKind::Class(_) => {
                self.extract_class_source(decl);
            }
            DeclKind::Function(_) => {
                self.extract_function(decl, parent_id);
            }
            // Init blocks are part of the class's <obinit>.
            DeclKind::AnonymousInitializer(_) => {}
            DeclKind::Property(_) => self.extract_property(decl, parent_id),
            DeclKind::EnumEntry(_) => self.extract_enum_entry(decl, parent_id),
            DeclKind::TypeAlias(_) => self.extract_type_alias(decl),
            DeclKind::Field(_) => {
                self.extract_field(decl, parent_id);
            }
            other => self.warn_at(
                Severity::ErrorSevere,
                &format!("Unrecognised declaration: {}", other.describe()),
                d.span,
            ),
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn write_class_or_interface(
        &mut self,
        kind: ClassKind,
        id: &Label,
        name: &str,
        pkg: &Label,
        source: &Label,
    ) {
        if kind == ClassKind::Interface {
            self.tw.write_interfaces(id, name, pkg, source);
        } else {
            self.tw.write_classes(id, name, pkg, source);
        }
        if kind == ClassKind::EnumClass {
            self.tw.write_is_enum_type(id);
        }
    }

    /// Facts for one generic instance of `class`, labelled `id`.
    pub(crate) fn extract_class_instance(
        &mut self,
        class: DeclId,
        arguments: &[TypeArgument],
        id: &Label,
    ) {
        let program = self.program;
        let (Some(decl), Some(c)) = (program.decl(class), program.class(class)) else {
            return;
        };
        let pkg = self.use_package(&program.package_of(class));
        let name = self.class_short_name(class, arguments);
        let source = self.use_class_source(class);
        self.write_class_or_interface(c.kind, id, &name, &pkg, &source);

        for (idx, arg) in arguments.iter().enumerate() {
            let arg_label = self.type_argument_label(arg);
            self.tw.write_type_args(&arg_label, idx, id);
        }
        self.tw.write_is_parameterized(id);
        self.tw.write_erasure(id, &source);
        self.extract_class_modifiers(class, id);
        self.extract_class_supertypes(class, id);
        self.tw.write_span_location(id, decl.span);
    }

    /// Extract a class declaration with all its members.
    pub fn extract_class_source(&mut self, class: DeclId) -> Label {
        let program = self.program;
        let (Some(decl), Some(c)) = (program.decl(class), program.class(class)) else {
            self.warn(Severity::ErrorSevere, &format!("{} is not a class", class));
            return Label::placeholder();
        };
        let id = self.use_class_source(class);
        let pkg = self.use_package(&program.package_of(class));
        self.write_class_or_interface(c.kind, &id, &c.name, &pkg, &id);
        let loc = self.tw.location(decl.span);
        self.tw.write_has_location(&id, &loc);

        if let Some(parent) = program.parent_class(class) {
            let (parent_label, _) = self.use_class_instance(parent, &[]);
            self.tw.write_encl_in_reftype(&id, &parent_label);
            if c.is_companion {
                if let Some((instance, name)) = self.use_companion_object_class_instance(class) {
                    let ty = self.use_simple_type_class(class, &[], false);
                    self.tw.write_fields(
                        &instance,
                        &name,
                        &ty.java.label,
                        &ty.kotlin.label,
                        &parent_label,
                        &instance,
                    );
                    self.tw.write_has_location(&instance, &loc);
                    self.add_modifiers(&instance, &["public", "static", "final"]);
                    self.tw.write_class_companion_object(&parent_label, &instance, &id);
                }
            }
        }

        for param in &c.type_parameters {
            self.extract_type_parameter(*param);
        }
        for member in &c.declarations {
            self.extract_declaration(*member, &id);
        }
        self.extract_object_initializer_function(class, &id);

        if c.is_non_companion_object() {
            let (instance, name) = self.use_object_class_instance(class);
            let ty = self.use_simple_type_class(class, &[], false);
            self.tw
                .write_fields(&instance, &name, &ty.java.label, &ty.kotlin.label, &id, &instance);
            self.tw.write_has_location(&instance, &loc);
            self.add_modifiers(&instance, &["public", "static", "final"]);
            self.tw.write_class_object(&id, &instance);
        }

        self.extract_class_modifiers(class, &id);
        self.extract_class_supertypes(class, &id);
        id
    }

    pub(crate) fn extract_type_parameter(&mut self, param: DeclId) -> Label {
        let program = self.program;
        let (Some(decl), Some(tp)) = (program.decl(param), program.type_parameter(param)) else {
            return Label::placeholder();
        };
        let id = self.type_parameter_label(param);
        let parent = match decl.parent {
            DeclParent::Decl(p) if program.function(p).is_some() => self.use_function(p),
            DeclParent::Decl(p) if program.class(p).is_some() => self.use_class_source(p),
            _ => {
                self.warn_at(
                    Severity::ErrorSevere,
                    &format!("Unexpected parent of type parameter {}", tp.name),
                    decl.span,
                );
                Label::placeholder()
            }
        };
        self.tw.write_type_vars(&id, &tp.name, tp.index, 0, &parent);
        self.tw.write_span_location(&id, decl.span);
        id
    }

    /// Synthesize `<obinit>`: one block running, in declaration order, the
    /// instance field initializers and the instance `init` blocks.
    fn extract_object_initializer_function(&mut self, class: DeclId, parent_id: &Label) {
        let program = self.program;
        if program.is_external(class) {
            return;
        }
        let (Some(decl), Some(c)) = (program.decl(class), program.class(class)) else {
            return;
        };
        let unit = self.builtin_type("Unit");
        let key = self.function_label_key(&DeclParent::Decl(class), "<obinit>", &[], &unit);
        let obinit = self.tw.label_for(&key);
        let return_type = self.use_type(&unit);
        let loc = self.tw.location(decl.span);
        self.tw.write_methods(
            &obinit,
            "<obinit>",
            "<obinit>()",
            &return_type.java.label,
            &return_type.kotlin.label,
            parent_id,
            &obinit,
        );
        self.tw.write_has_location(&obinit, &loc);

        let block = self.tw.fresh_label();
        self.tw
            .write_stmts(&block, StmtTag::Block, &obinit, 0, &obinit);
        self.tw.write_has_location(&block, &loc);

        let mut idx = 0;
        for member in &c.declarations {
            let Some(member_decl) = program.decl(*member) else {
                continue;
            };
            match &member_decl.kind {
                DeclKind::Property(p) => {
                    let Some(field_id) = p.backing_field else {
                        continue;
                    };
                    let Some(field) = program.field(field_id) else {
                        continue;
                    };
                    let Some(initializer) = &field.initializer else {
                        continue;
                    };
                    if field.is_static {
                        continue;
                    }
                    let prop_loc = self.tw.location(member_decl.span);
                    let stmt = self.tw.fresh_label();
                    self.tw
                        .write_stmts(&stmt, StmtTag::ExprStmt, &block, idx, &obinit);
                    idx += 1;
                    self.tw.write_has_location(&stmt, &prop_loc);

                    let assign = self.tw.fresh_label();
                    let assign_type = self.use_type(&initializer.ty);
                    self.tw.write_expr(
                        &assign,
                        ExprTag::Assign,
                        &assign_type.java.label,
                        &assign_type.kotlin.label,
                        &stmt,
                        0,
                    );
                    self.tw.write_has_location(&assign, &prop_loc);
                    self.tw.write_callable_enclosing_expr(&assign, &obinit);

                    let lhs = self.tw.fresh_label();
                    let lhs_type = self.use_type(&field.ty);
                    self.tw.write_expr(
                        &lhs,
                        ExprTag::VarAccess,
                        &lhs_type.java.label,
                        &lhs_type.kotlin.label,
                        &assign,
                        0,
                    );
                    self.tw.write_has_location(&lhs, &prop_loc);
                    self.tw.write_callable_enclosing_expr(&lhs, &obinit);
                    let field_label = self.use_field(field_id);
                    self.tw.write_variable_binding(&lhs, &field_label);

                    self.extract_expression_expr(initializer, &obinit, &assign, 1);
                }
                DeclKind::AnonymousInitializer(init) if !init.is_static => {
                    for statement in &init.statements {
                        self.extract_statement(statement, &obinit, &block, idx);
                        idx += 1;
                    }
                }
                _ => {}
            }
        }
    }

    // ========================================================================
    // Callables
    // ========================================================================

    /// `name(int,String)` over the erased parameter types.
    fn function_signature(&self, name: &str, value_parameters: &[DeclId]) -> String {
        let params: Vec<String> = value_parameters
            .iter()
            .map(|p| {
                let ty = self.erase(&self.value_declaration_type(*p));
                self.short_name(&ty, true)
            })
            .collect();
        format!("{}({})", name, params.join(","))
    }

    pub fn extract_function(&mut self, function: DeclId, parent_id: &Label) -> Label {
        let program = self.program;
        let (Some(decl), Some(f)) = (program.decl(function), program.function(function)) else {
            self.warn(Severity::ErrorSevere, &format!("{} is not a function", function));
            return Label::placeholder();
        };
        let previous = self.current_function.replace(function);

        for param in &f.type_parameters {
            self.extract_type_parameter(*param);
        }
        let loc = self.tw.location(decl.span);
        let id = if f.is_constructor {
            let erased = self.erase(&f.return_type);
            let return_type = self.use_type(&erased);
            let id = self.use_function(function);
            let name = f
                .return_type
                .class_id()
                .and_then(|c| program.class(c))
                .map(|c| c.name.as_str())
                .unwrap_or(f.name.as_str());
            let signature = self.function_signature(name, &f.value_parameters);
            self.tw.write_constrs(
                &id,
                name,
                &signature,
                &return_type.java.label,
                &return_type.kotlin.label,
                parent_id,
                &id,
            );
            id
        } else {
            let return_type = self.use_type(&f.return_type);
            let id = self.use_function(function);
            let signature = self.function_signature(&f.name, &f.value_parameters);
            self.tw.write_methods(
                &id,
                &f.name,
                &signature,
                &return_type.java.label,
                &return_type.kotlin.label,
                parent_id,
                &id,
            );
            if let Some(receiver) = f.extension_receiver {
                let receiver_type = self.value_declaration_type(receiver);
                let receiver_type = self.use_type(&receiver_type);
                self.tw.write_kt_extension_functions(
                    &id,
                    &receiver_type.java.label,
                    &receiver_type.kotlin.label,
                );
            }
            id
        };
        self.tw.write_has_location(&id, &loc);

        if let Some(body) = &f.body {
            self.extract_body(body, &id);
        }
        for (i, param) in f.value_parameters.iter().enumerate() {
            self.extract_value_parameter(*param, &id, i as i32);
        }

        self.current_function = previous;
        id
    }

    fn extract_value_parameter(&mut self, param: DeclId, parent: &Label, idx: i32) -> Label {
        let program = self.program;
        let (Some(decl), Some(DeclKind::ValueParameter(vp))) =
            (program.decl(param), program.decl(param).map(|d| &d.kind))
        else {
            self.warn(Severity::ErrorSevere, &format!("{} is not a value parameter", param));
            return Label::placeholder();
        };
        let id = self.use_value_parameter(param);
        let ty = self.use_type(&vp.ty);
        let loc = self.tw.location(decl.span);
        self.tw
            .write_params(&id, &ty.java.label, &ty.kotlin.label, idx, parent, &id);
        self.tw.write_has_location(&id, &loc);
        self.tw.write_param_name(&id, &vp.name);
        id
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub fn extract_field(&mut self, field: DeclId, parent_id: &Label) -> Label {
        let program = self.program;
        let (Some(decl), Some(f)) = (program.decl(field), program.field(field)) else {
            self.warn(Severity::ErrorSevere, &format!("{} is not a field", field));
            return Label::placeholder();
        };
        let id = self.use_field(field);
        let ty = self.use_type(&f.ty);
        self.tw
            .write_fields(&id, &f.name, &ty.java.label, &ty.kotlin.label, parent_id, &id);
        self.tw.write_span_location(&id, decl.span);
        id
    }

    pub fn extract_property(&mut self, property: DeclId, parent_id: &Label) {
        let program = self.program;
        let (Some(decl), Some(DeclKind::Property(p))) =
            (program.decl(property), program.decl(property).map(|d| &d.kind))
        else {
            return;
        };
        let external = program.is_external(property);
        let id = self.use_property(property);
        let loc = self.tw.location(decl.span);
        self.tw.write_kt_properties(&id, &p.name);
        self.tw.write_has_location(&id, &loc);

        match p.getter {
            Some(getter) => {
                let getter_id = self.extract_function(getter, parent_id);
                self.tw.write_kt_property_getters(&id, &getter_id);
            }
            None => {
                if p.modality != Modality::Final || !external {
                    self.warn_at(
                        Severity::ErrorSevere,
                        &format!("Property {} without a getter", p.name),
                        decl.span,
                    );
                }
            }
        }

        match p.setter {
            Some(setter) => {
                if !p.is_var {
                    self.warn_at(
                        Severity::ErrorSevere,
                        &format!("Read-only property {} with a setter", p.name),
                        decl.span,
                    );
                }
                let setter_id = self.extract_function(setter, parent_id);
                self.tw.write_kt_property_setters(&id, &setter_id);
            }
            None => {
                if p.is_var && !external {
                    self.warn_at(
                        Severity::ErrorSevere,
                        &format!("Mutable property {} without a setter", p.name),
                        decl.span,
                    );
                }
            }
        }

        if let Some(field) = p.backing_field {
            let field_id = self.extract_field(field, parent_id);
            self.tw.write_kt_property_backing_fields(&id, &field_id);
        }
    }

    pub fn extract_enum_entry(&mut self, entry: DeclId, parent_id: &Label) {
        let program = self.program;
        let Some(decl) = program.decl(entry) else {
            return;
        };
        let enum_class = match decl.parent {
            DeclParent::Decl(p) => program.class(p).map(|c| (p, c)),
            _ => None,
        };
        let Some((class, c)) = enum_class else {
            self.warn_at(
                Severity::ErrorSevere,
                "Enum entry with unexpected parent",
                decl.span,
            );
            return;
        };
        if !c.type_parameters.is_empty() {
            self.warn_at(
                Severity::ErrorSevere,
                "Enum entry parent class has type parameters",
                decl.span,
            );
        }
        let id = self.use_enum_entry(entry);
        let ty = self.use_simple_type_class(class, &[], false);
        let name = decl.kind.name().unwrap_or_default();
        self.tw
            .write_fields(&id, name, &ty.java.label, &ty.kotlin.label, parent_id, &id);
        self.tw.write_span_location(&id, decl.span);
    }

    pub fn extract_type_alias(&mut self, alias: DeclId) {
        let program = self.program;
        let (Some(decl), Some(DeclKind::TypeAlias(ta))) =
            (program.decl(alias), program.decl(alias).map(|d| &d.kind))
        else {
            return;
        };
        if !ta.type_parameters.is_empty() {
            self.warn_at(
                Severity::ErrorSevere,
                &format!("Type parameters of type alias {} ignored", ta.name),
                decl.span,
            );
        }
        let id = self.use_type_alias(alias);
        let ty = self.use_type(&ta.expanded_type);
        self.tw.write_kt_type_alias(&id, &ta.name, &ty.kotlin.label);
        self.tw.write_span_location(&id, decl.span);
    }
}
