//! Type projection and label resolution for referenced entities.
//!
//! Everything here is "use" side: given a type or a declaration, find (or
//! create) its label, writing the defining facts the first time the label
//! is seen in the current trap. Referencing a class from a dependency
//! schedules it for extraction into its own trap.

use std::io::Write;

use super::primitives::{self, PrimitiveInfo, BOXED_ARRAY};
use super::{Extractor, TypeResult, TypeResults};
use crate::ir::{
    qualify, Classifier, DeclId, DeclKind, DeclParent, IrType, SimpleType, TypeArgument, Variance,
};
use crate::label::Label;
use crate::logging::Severity;
use crate::schema::{WILDCARD_EXTENDS, WILDCARD_SUPER};

/// Which array shape a class type has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayKind {
    /// `kotlin.Array<T>`
    Boxed,
    /// `kotlin.IntArray` and friends; holds the element class name.
    Primitive(&'static str),
}

impl<'a, W: Write> Extractor<'a, W> {
    // ========================================================================
    // Packages, modifiers, synthetic classes
    // ========================================================================

    pub fn use_package(&mut self, name: &str) -> Label {
        self.label_for_with(&format!("package;{}", name), |ex, id| {
            ex.tw.write_packages(id, name)
        })
    }

    pub fn use_modifier(&mut self, name: &str) -> Label {
        self.label_for_with(&format!("modifier;{}", name), |ex, id| {
            ex.tw.write_modifiers(id, name)
        })
    }

    pub(crate) fn add_modifiers(&mut self, entity: &Label, modifiers: &[&str]) {
        for m in modifiers {
            let modifier = self.use_modifier(m);
            self.tw.write_has_modifier(entity, &modifier);
        }
    }

    /// A class known only by name, with no declaration behind it.
    fn make_class(&mut self, package: &str, name: &str) -> Label {
        let pkg = self.use_package(package);
        let key = format!("class;{}", qualify(package, name));
        self.label_for_with(&key, |ex, id| ex.tw.write_classes(id, name, &pkg, id))
    }

    pub(crate) fn builtin_type(&self, name: &str) -> IrType {
        match self.program.builtin(name) {
            Some(id) => IrType::class(id, Vec::new()),
            None => IrType::Error {
                description: format!("missing builtin kotlin.{}", name),
            },
        }
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Project `ty`, using host primitives where possible.
    pub fn use_type(&mut self, ty: &IrType) -> TypeResults {
        self.use_type_as(ty, true)
    }

    /// Project `ty` in a position where host primitives are not allowed,
    /// such as a type argument.
    pub fn use_reference_type(&mut self, ty: &IrType) -> TypeResults {
        self.use_type_as(ty, false)
    }

    fn use_type_as(&mut self, ty: &IrType, can_return_primitive: bool) -> TypeResults {
        match ty {
            IrType::Simple(s) => self.use_simple_type(s, can_return_primitive),
            IrType::Error { description } => {
                self.warn(
                    Severity::ErrorSevere,
                    &format!("Unrecognised type: {}", description),
                );
                TypeResults::unknown()
            }
        }
    }

    fn use_simple_type(&mut self, s: &SimpleType, can_return_primitive: bool) -> TypeResults {
        if s.abbreviation.is_some() {
            let rendered = self.simple_short_name(s, can_return_primitive);
            self.warn(
                Severity::ErrorSevere,
                &format!("Type alias ignored for {}", rendered),
            );
        }
        match s.classifier {
            Classifier::Class(class) => {
                let Some(fq_name) = self.program.fq_name(class) else {
                    self.warn(
                        Severity::ErrorSevere,
                        &format!("Type refers to {} which is not a class", class),
                    );
                    return TypeResults::unknown();
                };
                if let Some(info) = primitives::primitive_info(&fq_name) {
                    return self.use_primitive_type(s, class, info, can_return_primitive);
                }
                let array_kind = self.array_kind(s);
                let is_array = match array_kind {
                    Some(ArrayKind::Primitive(_)) => true,
                    Some(ArrayKind::Boxed) => !s.arguments.is_empty(),
                    None => false,
                };
                if is_array {
                    let component = self.array_element_type(s);
                    let mut element = component.clone();
                    let mut dimensions = 1;
                    let mut is_primitive_array = matches!(array_kind, Some(ArrayKind::Primitive(_)));
                    while let Some(inner) = element.as_simple() {
                        let Some(kind) = self.array_kind(inner) else {
                            break;
                        };
                        dimensions += 1;
                        if matches!(kind, ArrayKind::Primitive(_)) {
                            is_primitive_array = true;
                        }
                        let next = self.array_element_type(inner);
                        element = next;
                    }
                    return self.use_array_type(
                        s,
                        &component,
                        &element,
                        dimensions,
                        is_primitive_array,
                    );
                }
                self.use_simple_type_class(class, &s.arguments, s.nullable)
            }
            Classifier::TypeParameter(param) => self.use_type_parameter_type(param, s.nullable),
        }
    }

    fn use_primitive_type(
        &mut self,
        s: &SimpleType,
        class: DeclId,
        info: &PrimitiveInfo,
        can_return_primitive: bool,
    ) -> TypeResults {
        let java = match info.primitive_name {
            Some(prim) if can_return_primitive && !s.nullable => {
                let label = self.label_for_with(&format!("type;{}", prim), |ex, id| {
                    ex.tw.write_primitives(id, prim)
                });
                TypeResult::new(label, prim)
            }
            _ => {
                let label = self.make_class(info.java_package, info.java_class);
                TypeResult::new(label, qualify(info.java_package, info.java_class))
            }
        };
        let (kotlin_class, _) = self.use_class_instance(class, &[]);
        let kotlin_name = qualify(info.kotlin_package, info.kotlin_class);
        let kotlin = self.kotlin_type(&kotlin_name, &kotlin_class, s.nullable);
        TypeResults { java, kotlin }
    }

    /// Rich nullable/not-null type over `class`.
    fn kotlin_type(&mut self, name: &str, class: &Label, nullable: bool) -> TypeResult {
        if nullable {
            let key = format!("kt_type;nullable;{}", name);
            let label =
                self.label_for_with(&key, |ex, id| ex.tw.write_kt_nullable_types(id, class));
            TypeResult::new(label, format!("{}?", name))
        } else {
            let key = format!("kt_type;notnull;{}", name);
            let label = self.label_for_with(&key, |ex, id| ex.tw.write_kt_notnull_types(id, class));
            TypeResult::new(label, name)
        }
    }

    fn use_type_parameter_type(&mut self, param: DeclId, nullable: bool) -> TypeResults {
        let name = self
            .program
            .type_parameter(param)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| param.to_string());
        let java = TypeResult::new(self.use_type_parameter(param), name.clone());
        let type_param_class = self.make_class("kotlin", "TypeParam");
        let kotlin = self.kotlin_type("type_param", &type_param_class, nullable);
        let signature = if nullable { format!("{}?", name) } else { name };
        TypeResults {
            java,
            kotlin: TypeResult::new(kotlin.label, signature),
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// The host class standing in for `class`, if the program declares one.
    fn java_equivalent_class(&self, class: DeclId) -> Option<DeclId> {
        let fq_name = self.program.fq_name(class)?;
        let java_name = primitives::java_equivalent(&fq_name)?;
        self.program.class_by_fq_name(java_name)
    }

    /// `pkg.Outer$Inner;{#arg}...`
    fn unquoted_class_label(&mut self, class: DeclId, arguments: &[TypeArgument]) -> String {
        let mut label = self
            .program
            .binary_name(class)
            .unwrap_or_else(|| class.to_string());
        for arg in arguments {
            let arg_label = self.type_argument_label(arg);
            label.push_str(&format!(";{{{}}}", arg_label));
        }
        label
    }

    fn class_label_key(&mut self, class: DeclId, arguments: &[TypeArgument]) -> String {
        format!("class;{}", self.unquoted_class_label(class, arguments))
    }

    /// Label of `class` instantiated with `arguments`, after mapping to the
    /// host-equivalent class. Returns the label and the class it denotes.
    pub fn use_class_instance(
        &mut self,
        class: DeclId,
        arguments: &[TypeArgument],
    ) -> (Label, DeclId) {
        let substitute = self.java_equivalent_class(class);
        let extract_class = substitute.unwrap_or(class);
        let key = self.class_label_key(extract_class, arguments);
        let label = self.label_for_with(&key, |ex, id| {
            if !arguments.is_empty() {
                let id = id.clone();
                ex.with_source_file_of_class(extract_class, false, |ex| {
                    ex.extract_class_instance(extract_class, arguments, &id)
                });
            }
            ex.extract_class_later_if_external(class);
            if let Some(substitute) = substitute {
                ex.extract_class_later_if_external(substitute);
            }
        });
        (label, extract_class)
    }

    /// Label of the generic declaration of `class`, without arguments.
    pub fn use_class_source(&mut self, class: DeclId) -> Label {
        let key = self.class_label_key(class, &[]);
        self.tw.label_for(&key)
    }

    pub fn use_simple_type_class(
        &mut self,
        class: DeclId,
        arguments: &[TypeArgument],
        nullable: bool,
    ) -> TypeResults {
        let (java_label, java_class) = self.use_class_instance(class, arguments);
        let java_signature = self
            .program
            .fq_name(java_class)
            .unwrap_or_else(|| java_class.to_string());
        let kotlin_name = self.unquoted_class_label(class, arguments);
        let kotlin = self.kotlin_type(&kotlin_name, &java_label, nullable);
        TypeResults {
            java: TypeResult::new(java_label, java_signature),
            kotlin,
        }
    }

    pub(crate) fn extract_class_later_if_external(&mut self, class: DeclId) {
        if self.program.is_external(class) {
            self.schedule_external_class(class);
        }
    }

    /// Schedule the class that owns external member `decl`.
    pub(crate) fn extract_external_enclosing_class_later(&mut self, decl: DeclId) {
        let program = self.program;
        match program.decl(decl).map(|d| &d.parent) {
            Some(DeclParent::Decl(p)) if program.class(*p).is_some() => {
                self.schedule_external_class(*p)
            }
            Some(DeclParent::Decl(p)) if program.function(*p).is_some() => {
                self.extract_external_enclosing_class_later(*p)
            }
            // Top-level declarations from binaries have no class to extract.
            Some(DeclParent::Package(_)) => {}
            _ => self.warn(
                Severity::ErrorSevere,
                &format!("Unrecognised parent of external declaration {}", decl),
            ),
        }
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    fn array_kind(&self, s: &SimpleType) -> Option<ArrayKind> {
        let Classifier::Class(class) = s.classifier else {
            return None;
        };
        let fq_name = self.program.fq_name(class)?;
        if fq_name == BOXED_ARRAY {
            return Some(ArrayKind::Boxed);
        }
        primitives::primitive_array_element(&fq_name).map(ArrayKind::Primitive)
    }

    /// Element type of an array type. `Array<*>` has element `Any?`.
    fn array_element_type(&self, s: &SimpleType) -> IrType {
        match self.array_kind(s) {
            Some(ArrayKind::Primitive(element)) => self.builtin_type(element),
            _ => match s.arguments.first() {
                Some(TypeArgument::Projection { ty, .. }) => ty.clone(),
                _ => self.builtin_type("Any").make_nullable(),
            },
        }
    }

    fn is_primitive_type(&self, ty: &IrType) -> bool {
        match ty {
            IrType::Simple(s) if !s.nullable => match s.classifier {
                Classifier::Class(c) => self
                    .program
                    .fq_name(c)
                    .is_some_and(|name| primitives::is_primitive_class(&name)),
                Classifier::TypeParameter(_) => false,
            },
            _ => false,
        }
    }

    /// The array type with every level made invariant and nullable, as
    /// returned by `clone()`: `Array<out Array<in E>>` becomes
    /// `Array<Array<E?>?>`.
    fn invariant_nullable_array_type(&self, s: &SimpleType) -> SimpleType {
        if matches!(self.array_kind(s), Some(ArrayKind::Primitive(_))) {
            return s.clone();
        }
        let component = self.array_element_type(s);
        let broadened = match component.as_simple() {
            Some(inner) if self.array_kind(inner).is_some() => {
                IrType::Simple(SimpleType {
                    nullable: true,
                    ..self.invariant_nullable_array_type(inner)
                })
            }
            _ => component.make_nullable(),
        };
        let unchanged = broadened == component
            && matches!(
                s.arguments.first(),
                Some(TypeArgument::Projection {
                    variance: Variance::Invariant,
                    ..
                })
            );
        if unchanged {
            return s.clone();
        }
        SimpleType {
            classifier: s.classifier,
            nullable: true,
            arguments: vec![TypeArgument::invariant(broadened)],
            abbreviation: None,
        }
    }

    fn use_array_type(
        &mut self,
        array: &SimpleType,
        component: &IrType,
        element: &IrType,
        dimensions: i32,
        is_primitive_array: bool,
    ) -> TypeResults {
        let nullable_if_not_primitive = |ex: &Self, t: &IrType| {
            if ex.is_primitive_type(t) && !is_primitive_array {
                t.make_nullable()
            } else {
                t.clone()
            }
        };
        let component = nullable_if_not_primitive(&*self, component);
        let element = nullable_if_not_primitive(&*self, element);
        let component_label = self.use_type(&component).java.label;
        let element_label = self.use_type(&element).java.label;

        let short_name = self.simple_short_name(array, true);
        let key = format!("array;{};{{{}}}", dimensions, element_label);
        let id = self.label_for_with(&key, |ex, id| {
            ex.tw
                .write_arrays(id, &short_name, &element_label, dimensions, &component_label);
            if let Classifier::Class(array_class) = array.classifier {
                ex.extract_class_supertypes(array_class, id);
            }

            let length = ex.tw.label_for(&format!("field;{{{}}};length", id));
            let int = ex.builtin_type("Int");
            let int = ex.use_type(&int);
            ex.tw
                .write_fields(&length, "length", &int.java.label, &int.kotlin.label, id, &length);

            let clone_type = IrType::Simple(ex.invariant_nullable_array_type(array)).make_nullable();
            let clone_return = ex.use_type(&clone_type).kotlin.label;
            let clone = ex.tw.label_for(&format!("callable;{{{}}}.clone(){{{}}}", id, id));
            ex.tw
                .write_methods(&clone, "clone", "clone()", id, &clone_return, id, &clone);
        });

        let kotlin = match array.classifier {
            Classifier::Class(array_class) => {
                self.use_simple_type_class(array_class, &array.arguments, array.nullable)
                    .kotlin
            }
            Classifier::TypeParameter(_) => TypeResult::new(Label::placeholder(), "unknown"),
        };
        TypeResults {
            java: TypeResult::new(id, short_name),
            kotlin,
        }
    }

    // ========================================================================
    // Type arguments
    // ========================================================================

    /// Label of one type argument: the bound itself when invariant,
    /// otherwise a wildcard over it.
    pub(crate) fn type_argument_label(&mut self, arg: &TypeArgument) -> Label {
        match arg {
            TypeArgument::Star => {
                let any = self.builtin_type("Any");
                let bound = self.use_reference_type(&any).java.label;
                self.bounded_wildcard(WILDCARD_EXTENDS, "wildcard;".to_string(), arg, &bound)
            }
            TypeArgument::Projection { variance, ty } => {
                let bound = self.use_reference_type(ty).java.label;
                match variance {
                    Variance::Invariant => bound,
                    Variance::Out => {
                        let key = format!("wildcard;extends{{{}}}", bound);
                        self.bounded_wildcard(WILDCARD_EXTENDS, key, arg, &bound)
                    }
                    Variance::In => {
                        let key = format!("wildcard;super{{{}}}", bound);
                        self.bounded_wildcard(WILDCARD_SUPER, key, arg, &bound)
                    }
                }
            }
        }
    }

    fn bounded_wildcard(
        &mut self,
        kind: i32,
        key: String,
        arg: &TypeArgument,
        bound: &Label,
    ) -> Label {
        let name = self.type_argument_short_name(arg);
        self.label_for_with(&key, |ex, wildcard| {
            ex.tw.write_wildcards(wildcard, &name, kind);
            let loc = ex.tw.unknown_location();
            ex.tw.write_has_location(wildcard, &loc);
            let bound_key = format!("bound;0;{{{}}}", wildcard);
            ex.label_for_with(&bound_key, |ex, b| {
                ex.tw.write_type_bounds(b, bound, 0, wildcard)
            });
        })
    }

    // ========================================================================
    // Short names
    // ========================================================================

    /// Host-style display name: `int`, `Integer[]`, `List<? extends String>`.
    pub fn short_name(&self, ty: &IrType, can_return_primitive: bool) -> String {
        match ty {
            IrType::Simple(s) => self.simple_short_name(s, can_return_primitive),
            IrType::Error { .. } => "???".to_string(),
        }
    }

    fn simple_short_name(&self, s: &SimpleType, can_return_primitive: bool) -> String {
        let program = self.program;
        match s.classifier {
            Classifier::Class(class) => {
                let Some(fq_name) = program.fq_name(class) else {
                    return "???".to_string();
                };
                if let Some(info) = primitives::primitive_info(&fq_name) {
                    if let Some(prim) = info.primitive_name {
                        return if s.nullable || !can_return_primitive {
                            info.java_class.to_string()
                        } else {
                            prim.to_string()
                        };
                    }
                }
                if let Some(kind) = self.array_kind(s) {
                    let element = self.array_element_type(s);
                    let java_element = match kind {
                        ArrayKind::Primitive(_) => element,
                        ArrayKind::Boxed => element.make_nullable(),
                    };
                    return format!("{}[]", self.short_name(&java_element, true));
                }
                let shown = self.java_equivalent_class(class).unwrap_or(class);
                self.class_short_name(shown, &s.arguments)
            }
            Classifier::TypeParameter(param) => program
                .type_parameter(param)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "???".to_string()),
        }
    }

    pub(crate) fn class_short_name(&self, class: DeclId, arguments: &[TypeArgument]) -> String {
        let name = self
            .program
            .class(class)
            .map(|c| c.name.as_str())
            .unwrap_or("???");
        format!("{}{}", name, self.type_arguments_short_name(arguments))
    }

    fn type_arguments_short_name(&self, arguments: &[TypeArgument]) -> String {
        if arguments.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = arguments
            .iter()
            .map(|a| self.type_argument_short_name(a))
            .collect();
        format!("<{}>", parts.join(","))
    }

    fn type_argument_short_name(&self, arg: &TypeArgument) -> String {
        match arg {
            TypeArgument::Star => "?".to_string(),
            TypeArgument::Projection { variance, ty } => {
                let prefix = match variance {
                    Variance::Invariant => "",
                    Variance::Out => "? extends ",
                    Variance::In => "? super ",
                };
                format!("{}{}", prefix, self.short_name(ty, false))
            }
        }
    }

    // ========================================================================
    // Erasure
    // ========================================================================

    /// Type parameters become their first upper bound, arrays erase their
    /// element, classes drop their arguments. Nullability is kept.
    pub fn erase(&self, ty: &IrType) -> IrType {
        self.erase_at(ty, 0)
    }

    fn erase_at(&self, ty: &IrType, depth: usize) -> IrType {
        let IrType::Simple(s) = ty else {
            return ty.clone();
        };
        // A bound chain longer than the declaration table must be cyclic.
        if depth > self.program.declarations.len() {
            return self.builtin_type("Any").make_nullable();
        }
        match s.classifier {
            Classifier::TypeParameter(param) => {
                match self
                    .program
                    .type_parameter(param)
                    .and_then(|t| t.super_types.first())
                {
                    Some(bound) => self.erase_at(bound, depth + 1),
                    None => self.builtin_type("Any").make_nullable(),
                }
            }
            Classifier::Class(_) => {
                let arguments = if self.array_kind(s) == Some(ArrayKind::Boxed) {
                    let element = self.array_element_type(s);
                    vec![TypeArgument::invariant(self.erase_at(&element, depth + 1))]
                } else {
                    Vec::new()
                };
                IrType::Simple(SimpleType {
                    classifier: s.classifier,
                    nullable: s.nullable,
                    arguments,
                    abbreviation: None,
                })
            }
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Label of the entity a declaration is nested in.
    pub fn use_declaration_parent(&mut self, parent: &DeclParent) -> Label {
        let program = self.program;
        match parent {
            DeclParent::File(file) => self.use_file_class(*file),
            DeclParent::Package(package) => self.use_package(package),
            DeclParent::Decl(decl) => match program.decl(*decl).map(|d| &d.kind) {
                Some(DeclKind::Class(_)) => self.use_class_source(*decl),
                Some(DeclKind::Function(_)) => self.use_function(*decl),
                other => {
                    let what = other.map(|k| k.describe()).unwrap_or("missing declaration");
                    self.warn(
                        Severity::ErrorSevere,
                        &format!("Unrecognised declaration parent: {}", what),
                    );
                    Label::placeholder()
                }
            },
        }
    }

    /// Key of a callable: `callable;{parent}.name({param}, ...){return}`
    /// over erased host types.
    pub(crate) fn function_label_key(
        &mut self,
        parent: &DeclParent,
        name: &str,
        parameter_types: &[IrType],
        return_type: &IrType,
    ) -> String {
        let mut params = Vec::with_capacity(parameter_types.len());
        for ty in parameter_types {
            let erased = self.erase(ty);
            params.push(format!("{{{}}}", self.use_type(&erased).java.label));
        }
        let erased_return = self.erase(return_type);
        let return_label = self.use_type(&erased_return).java.label;
        let parent_label = self.use_declaration_parent(parent);
        format!(
            "callable;{{{}}}.{}({}){{{}}}",
            parent_label,
            name,
            params.join(", "),
            return_label
        )
    }

    pub fn use_function(&mut self, function: DeclId) -> Label {
        let program = self.program;
        let (Some(decl), Some(f)) = (program.decl(function), program.function(function)) else {
            self.warn(
                Severity::ErrorSevere,
                &format!("Call target {} is not a function", function),
            );
            return Label::placeholder();
        };
        let parameter_types: Vec<IrType> = f
            .value_parameters
            .iter()
            .map(|p| self.value_declaration_type(*p))
            .collect();
        let key = self.function_label_key(&decl.parent, &f.name, &parameter_types, &f.return_type);
        let label = self.tw.label_for(&key);
        if program.is_external(function) {
            self.extract_external_enclosing_class_later(function);
        }
        label
    }

    fn type_parameter_label_key(&mut self, param: DeclId) -> Option<String> {
        let program = self.program;
        let decl = program.decl(param)?;
        let tp = program.type_parameter(param)?;
        let parent = self.use_declaration_parent(&decl.parent);
        Some(format!("typevar;{{{}}};{}", parent, tp.name))
    }

    /// Label of a type parameter, which its declaration should already have
    /// defined.
    pub fn use_type_parameter(&mut self, param: DeclId) -> Label {
        let Some(key) = self.type_parameter_label_key(param) else {
            self.warn(
                Severity::ErrorSevere,
                &format!("{} is not a type parameter", param),
            );
            return Label::placeholder();
        };
        match self.tw.existing_label_for(&key) {
            Some(label) => label,
            None => {
                self.warn(
                    Severity::ErrorSevere,
                    &format!("Missing type parameter label {}", key),
                );
                self.tw.label_for(&key)
            }
        }
    }

    pub(crate) fn type_parameter_label(&mut self, param: DeclId) -> Label {
        match self.type_parameter_label_key(param) {
            Some(key) => self.tw.label_for(&key),
            None => Label::placeholder(),
        }
    }

    /// `<prefix>;{parent};name` for a named member.
    fn member_label(&mut self, prefix: &str, decl: DeclId) -> Label {
        let program = self.program;
        let Some(d) = program.decl(decl) else {
            return Label::placeholder();
        };
        let name = d.kind.name().unwrap_or_default();
        let parent = self.use_declaration_parent(&d.parent);
        self.tw
            .label_for(&format!("{};{{{}}};{}", prefix, parent, name))
    }

    pub fn use_field(&mut self, field: DeclId) -> Label {
        self.member_label("field", field)
    }

    pub fn use_property(&mut self, property: DeclId) -> Label {
        self.member_label("property", property)
    }

    pub fn use_enum_entry(&mut self, entry: DeclId) -> Label {
        self.member_label("field", entry)
    }

    pub fn use_type_alias(&mut self, alias: DeclId) -> Label {
        self.member_label("type_alias", alias)
    }

    pub fn use_value_parameter(&mut self, param: DeclId) -> Label {
        let program = self.program;
        let (Some(decl), Some(DeclKind::ValueParameter(vp))) =
            (program.decl(param), program.decl(param).map(|d| &d.kind))
        else {
            self.warn(
                Severity::ErrorSevere,
                &format!("{} is not a value parameter", param),
            );
            return Label::placeholder();
        };
        if vp.index < 0 {
            self.warn_at(
                Severity::ErrorSevere,
                &format!("Unexpected negative index for parameter {}", vp.name),
                decl.span,
            );
        }
        let parent = self.use_declaration_parent(&decl.parent);
        self.tw
            .label_for(&format!("params;{{{}}};{}", parent, vp.index))
    }

    /// Local variables get a fresh label the first time they are seen in
    /// this trap.
    pub fn use_variable(&mut self, variable: DeclId) -> Label {
        if let Some(label) = self.variable_labels.get(&variable) {
            return label.clone();
        }
        let label = self.tw.fresh_label();
        self.variable_labels.insert(variable, label.clone());
        label
    }

    /// Label of a parameter or local variable.
    pub fn use_value_declaration(&mut self, decl: DeclId) -> Label {
        match self.program.decl(decl).map(|d| &d.kind) {
            Some(DeclKind::ValueParameter(_)) => self.use_value_parameter(decl),
            Some(DeclKind::Variable(_)) => self.use_variable(decl),
            other => {
                let what = other.map(|k| k.describe()).unwrap_or("missing declaration");
                self.warn(
                    Severity::ErrorSevere,
                    &format!("Unrecognised value declaration: {}", what),
                );
                Label::placeholder()
            }
        }
    }

    /// Declared type of a parameter, variable or field.
    pub(crate) fn value_declaration_type(&self, decl: DeclId) -> IrType {
        match self.program.decl(decl).map(|d| &d.kind) {
            Some(DeclKind::ValueParameter(p)) => p.ty.clone(),
            Some(DeclKind::Variable(v)) => v.ty.clone(),
            Some(DeclKind::Field(f)) => f.ty.clone(),
            _ => IrType::Error {
                description: format!("{} has no declared type", decl),
            },
        }
    }

    /// Instance field holding a companion object, in its outer class.
    pub(crate) fn use_companion_object_class_instance(
        &mut self,
        class: DeclId,
    ) -> Option<(Label, String)> {
        let program = self.program;
        let c = program.class(class)?;
        let parent = program.parent_class(class);
        match parent {
            Some(parent) if c.is_companion => {
                let (parent_label, _) = self.use_class_instance(parent, &[]);
                let key = format!("field;{{{}}};{}", parent_label, c.name);
                Some((self.tw.label_for(&key), c.name.clone()))
            }
            _ => {
                self.warn(
                    Severity::ErrorSevere,
                    &format!("Using companion instance for non-companion class {}", c.name),
                );
                None
            }
        }
    }

    /// The `INSTANCE` field of an `object`.
    pub(crate) fn use_object_class_instance(&mut self, class: DeclId) -> (Label, String) {
        let program = self.program;
        if !program.class(class).is_some_and(|c| c.is_non_companion_object()) {
            self.warn(
                Severity::ErrorSevere,
                &format!("Using instance for non-object class {}", class),
            );
        }
        let (class_label, _) = self.use_class_instance(class, &[]);
        let key = format!("field;{{{}}};INSTANCE", class_label);
        (self.tw.label_for(&key), "INSTANCE".to_string())
    }

    // ========================================================================
    // Class facts shared by source and instance extraction
    // ========================================================================

    pub(crate) fn extract_class_modifiers(&mut self, class: DeclId, id: &Label) {
        if self
            .program
            .class(class)
            .is_some_and(|c| c.modality == crate::ir::Modality::Abstract)
        {
            self.add_modifiers(id, &["abstract"]);
        }
    }

    pub(crate) fn extract_class_supertypes(&mut self, class: DeclId, id: &Label) {
        let program = self.program;
        let Some(c) = program.class(class) else {
            return;
        };
        for super_type in &c.super_types {
            match super_type {
                IrType::Simple(SimpleType {
                    classifier: Classifier::Class(super_class),
                    arguments,
                    ..
                }) => {
                    let (super_label, _) = self.use_class_instance(*super_class, arguments);
                    self.tw.write_extends_reftype(id, &super_label);
                }
                other => {
                    let rendered = self.short_name(other, false);
                    self.warn(
                        Severity::ErrorSevere,
                        &format!("Unexpected supertype {} of {}", rendered, c.name),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::external::ExternalClassQueue;
    use crate::ir::*;
    use crate::logging::LogCounter;
    use crate::trap::{FileTrapWriter, TrapWriter};

    fn with_extractor<T>(
        program: &Program,
        f: impl FnOnce(&mut Extractor<'_, Vec<u8>>) -> T,
    ) -> (T, String, ExternalClassQueue) {
        let counter = LogCounter::default();
        let mut queue = ExternalClassQueue::new();
        let file = &program.files[0];
        let tw = FileTrapWriter::source(TrapWriter::new(Vec::new()), &file.path, file.lines.clone());
        let mut ex = Extractor::new(program, tw, &counter, &mut queue);
        let result = f(&mut ex);
        let (tw, _) = ex.finish();
        let out = String::from_utf8(tw.into_inner().into_inner().unwrap()).unwrap();
        (result, out, queue)
    }

    fn label_line<'o>(out: &'o str, key: &str) -> Option<&'o str> {
        let needle = format!("=@\"{}\"", key);
        out.lines().find(|l| l.ends_with(&needle))
    }

    // ========================================================================
    // Primitives and classes
    // ========================================================================

    #[test]
    fn test_primitive_and_boxed_projection() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let int = b.builtin("Int");
        let program = b.build();
        let int_ty = IrType::class(int, vec![]);
        let ((plain, nullable, boxed), out, queue) = with_extractor(&program, |ex| {
            (
                ex.use_type(&int_ty),
                ex.use_type(&int_ty.make_nullable()),
                ex.use_reference_type(&int_ty),
            )
        });
        assert_eq!(plain.java.signature, "int");
        assert_eq!(plain.kotlin.signature, "kotlin.Int");
        assert_eq!(nullable.java.signature, "java.lang.Integer");
        assert_eq!(nullable.kotlin.signature, "kotlin.Int?");
        assert_eq!(boxed.java.label, nullable.java.label);
        assert_ne!(plain.kotlin.label, nullable.kotlin.label);
        assert!(out.contains("primitives("));
        assert!(label_line(&out, "type;int").is_some());
        assert!(label_line(&out, "class;java.lang.Integer").is_some());
        assert!(label_line(&out, "kt_type;notnull;kotlin.Int").is_some());
        assert!(label_line(&out, "kt_type;nullable;kotlin.Int").is_some());
        // kotlin.Int is external: referencing it schedules it once.
        assert_eq!(queue.scheduled_count(), 1);
    }

    #[test]
    fn test_java_equivalent_class_used_when_declared() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let string = b.builtin("String");
        b.external_class("java.lang", "String");
        let program = b.build();
        let ty = IrType::class(string, vec![]);
        let (types, out, queue) = with_extractor(&program, |ex| ex.use_type(&ty));
        assert_eq!(types.java.signature, "java.lang.String");
        assert_eq!(types.kotlin.signature, "kotlin.String");
        assert!(label_line(&out, "class;java.lang.String").is_some());
        assert!(label_line(&out, "class;kotlin.String").is_none());
        // Both the rich class and its host equivalent are scheduled.
        assert_eq!(queue.scheduled_count(), 2);
    }

    #[test]
    fn test_generic_instances_are_distinct() {
        let mut b = ProgramBuilder::new("A.kt", "p", "class Box<T>");
        let int = b.builtin("Int");
        let string = b.builtin("String");
        let file = FileId(0);
        let boxc = b.class(DeclParent::File(file), "Box");
        let t = b.add(
            DeclParent::Decl(boxc),
            DeclKind::TypeParameter(TypeParameterDecl {
                name: "T".into(),
                index: 0,
                super_types: vec![],
            }),
        );
        if let DeclKind::Class(c) = b.decl_mut(boxc) {
            c.type_parameters.push(t);
        }
        let program = b.build();
        let box_int = IrType::class(boxc, vec![TypeArgument::invariant(IrType::class(int, vec![]))]);
        let box_str =
            IrType::class(boxc, vec![TypeArgument::invariant(IrType::class(string, vec![]))]);
        let ((a, s, source), out, _) = with_extractor(&program, |ex| {
            let a = ex.use_type(&box_int);
            let s = ex.use_type(&box_str);
            let source = ex.use_class_source(boxc);
            (a, s, source)
        });
        assert_ne!(a.java.label, s.java.label);
        assert_ne!(a.java.label, source);
        assert_eq!(a.java.signature, "p.Box");
        assert_eq!(
            out.matches(&format!("erasure({},{})", a.java.label, source)).count(),
            1
        );
        assert_eq!(
            out.matches(&format!("erasure({},{})", s.java.label, source)).count(),
            1
        );
        assert_eq!(out.matches(&format!("isParameterized({})", a.java.label)).count(), 1);
        assert!(out.contains(&format!("classes({},\"Box<Integer>\",", a.java.label)));
    }

    #[test]
    fn test_wildcards() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let list = b.external_class("kotlin.collections", "List");
        let string = b.builtin("String");
        let program = b.build();
        let out_string = IrType::class(
            list,
            vec![TypeArgument::Projection {
                variance: Variance::Out,
                ty: IrType::class(string, vec![]),
            }],
        );
        let star = IrType::class(list, vec![TypeArgument::Star]);
        let ((name, star_name), out, _) = with_extractor(&program, |ex| {
            ex.use_type(&out_string);
            ex.use_type(&star);
            (ex.short_name(&out_string, true), ex.short_name(&star, true))
        });
        assert_eq!(name, "List<? extends String>");
        assert_eq!(star_name, "List<?>");
        let extends = out
            .lines()
            .find(|l| l.contains("=@\"wildcard;extends{"))
            .unwrap();
        let wildcard = extends.split('=').next().unwrap();
        assert!(out.contains(&format!("wildcards({},\"? extends String\",1)", wildcard)));
        assert!(out.contains(&format!(",0,{})", wildcard)));
        assert!(label_line(&out, "wildcard;").is_some());
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    #[test]
    fn test_nested_type_parameter_array() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let array = b.builtin("Array");
        let unit = b.builtin("Unit");
        let f = b.add(
            DeclParent::File(FileId(0)),
            DeclKind::Function(function_decl("f", IrType::class(unit, vec![]))),
        );
        let t = b.add(
            DeclParent::Decl(f),
            DeclKind::TypeParameter(TypeParameterDecl {
                name: "T".into(),
                index: 0,
                super_types: vec![],
            }),
        );
        let program = b.build();
        let t_ty = IrType::type_parameter(t);
        let inner = IrType::class(array, vec![TypeArgument::invariant(t_ty.clone())]);
        let outer = IrType::class(array, vec![TypeArgument::invariant(inner)]);
        let ((arr, t_label), out, _) = with_extractor(&program, |ex| {
            let t_label = ex.type_parameter_label(t);
            (ex.use_type(&outer), t_label)
        });
        assert_eq!(arr.java.signature, "T[][]");
        let arrays: Vec<&str> = out.lines().filter(|l| l.starts_with("arrays(")).collect();
        assert_eq!(arrays.len(), 2);
        let expected = format!("arrays({},\"T[][]\",{},2,", arr.java.label, t_label);
        assert!(arrays.iter().any(|l| l.starts_with(&expected)));
        assert!(out.contains(",\"length\","));
        assert!(out.contains(",\"clone\",\"clone()\","));
    }

    #[test]
    fn test_primitive_array() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let int_array = b.builtin("IntArray");
        let program = b.build();
        let ty = IrType::class(int_array, vec![]);
        let (types, out, _) = with_extractor(&program, |ex| ex.use_type(&ty));
        assert_eq!(types.java.signature, "int[]");
        let int_label = label_line(&out, "type;int").unwrap().split('=').next().unwrap();
        assert!(out.contains(&format!("\"int[]\",{},1,{})", int_label, int_label)));
    }

    #[test]
    fn test_invariant_nullable_array_type() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let array = b.builtin("Array");
        let string = b.builtin("String");
        let program = b.build();
        let e = IrType::class(string, vec![]);
        let inner = IrType::class(
            array,
            vec![TypeArgument::Projection {
                variance: Variance::In,
                ty: e.clone(),
            }],
        );
        let outer = SimpleType {
            classifier: Classifier::Class(array),
            nullable: false,
            arguments: vec![TypeArgument::Projection {
                variance: Variance::Out,
                ty: inner,
            }],
            abbreviation: None,
        };
        let (result, _, _) = with_extractor(&program, |ex| ex.invariant_nullable_array_type(&outer));
        let expected_inner = IrType::Simple(SimpleType {
            classifier: Classifier::Class(array),
            nullable: true,
            arguments: vec![TypeArgument::invariant(e.make_nullable())],
            abbreviation: None,
        });
        assert_eq!(result.arguments, vec![TypeArgument::invariant(expected_inner)]);
        assert!(result.nullable);
    }

    // ========================================================================
    // Erasure and callables
    // ========================================================================

    #[test]
    fn test_erase() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let list = b.external_class("kotlin.collections", "List");
        let number = b.builtin("Number");
        let t = b.add(
            DeclParent::Package("p".into()),
            DeclKind::TypeParameter(TypeParameterDecl {
                name: "T".into(),
                index: 0,
                super_types: vec![IrType::class(number, vec![]).make_nullable()],
            }),
        );
        let program = b.build();
        let (erased, _, _) = with_extractor(&program, |ex| {
            let generic = IrType::class(list, vec![TypeArgument::Star]).make_nullable();
            (
                ex.erase(&generic),
                ex.erase(&IrType::type_parameter(t)),
            )
        });
        assert_eq!(erased.0, IrType::class(list, vec![]).make_nullable());
        assert_eq!(erased.1, IrType::class(number, vec![]).make_nullable());
    }

    #[test]
    fn test_function_label_is_stable() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let int = b.builtin("Int");
        let unit = b.builtin("Unit");
        let c = b.class(DeclParent::File(FileId(0)), "C");
        let f = b.add(
            DeclParent::Decl(c),
            DeclKind::Function(function_decl("f", IrType::class(unit, vec![]))),
        );
        let x = b.add(
            DeclParent::Decl(f),
            DeclKind::ValueParameter(ValueParameterDecl {
                name: "x".into(),
                index: 0,
                ty: IrType::class(int, vec![]),
            }),
        );
        if let DeclKind::Function(func) = b.decl_mut(f) {
            func.value_parameters.push(x);
        }
        let program = b.build();
        let ((first, second), out, _) =
            with_extractor(&program, |ex| (ex.use_function(f), ex.use_function(f)));
        assert_eq!(first, second);
        let line = out
            .lines()
            .find(|l| l.starts_with(&format!("{}=@\"callable;", first)))
            .unwrap();
        assert!(line.contains(".f({#"));
        assert_eq!(out.matches("=@\"callable;").count(), 1);
    }

    #[test]
    fn test_missing_type_parameter_label_is_reported() {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let t = b.add(
            DeclParent::Package("p".into()),
            DeclKind::TypeParameter(TypeParameterDecl {
                name: "T".into(),
                index: 0,
                super_types: vec![],
            }),
        );
        let program = b.build();
        let (types, out, _) = with_extractor(&program, |ex| ex.use_type(&IrType::type_parameter(t)));
        assert_eq!(types.java.signature, "T");
        assert!(out.contains("Missing type parameter label"));
        assert!(label_line(&out, "kt_type;notnull;type_param").is_some());
    }

    #[test]
    fn test_error_type_is_placeholder() {
        let program = ProgramBuilder::new("A.kt", "p", "").build();
        let (types, out, _) = with_extractor(&program, |ex| {
            ex.use_type(&IrType::Error {
                description: "broken".into(),
            })
        });
        assert_eq!(types, TypeResults::unknown());
        assert!(out.contains("diagnostics(*,\"trapgen extractor\",8,\"\",\"Unrecognised type: broken\""));
    }
}
