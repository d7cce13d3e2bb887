//! Fixed mapping tables for builtin classes.

/// How a builtin class projects onto host primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveInfo {
    /// Host primitive name, if the class has one.
    pub primitive_name: Option<&'static str>,
    /// Boxed host class used when the type is nullable or primitives are
    /// not allowed.
    pub java_package: &'static str,
    pub java_class: &'static str,
    /// Rich class the nullable/not-null type entries are keyed on.
    pub kotlin_package: &'static str,
    pub kotlin_class: &'static str,
}

const fn info(
    primitive_name: Option<&'static str>,
    java_package: &'static str,
    java_class: &'static str,
    kotlin_class: &'static str,
) -> PrimitiveInfo {
    PrimitiveInfo {
        primitive_name,
        java_package,
        java_class,
        kotlin_package: "kotlin",
        kotlin_class,
    }
}

const PRIMITIVES: &[(&str, PrimitiveInfo)] = &[
    ("kotlin.Byte", info(Some("byte"), "java.lang", "Byte", "Byte")),
    ("kotlin.Short", info(Some("short"), "java.lang", "Short", "Short")),
    ("kotlin.Int", info(Some("int"), "java.lang", "Integer", "Int")),
    ("kotlin.Long", info(Some("long"), "java.lang", "Long", "Long")),
    ("kotlin.UByte", info(Some("byte"), "kotlin", "UByte", "UByte")),
    ("kotlin.UShort", info(Some("short"), "kotlin", "UShort", "UShort")),
    ("kotlin.UInt", info(Some("int"), "kotlin", "UInt", "UInt")),
    ("kotlin.ULong", info(Some("long"), "kotlin", "ULong", "ULong")),
    ("kotlin.Double", info(Some("double"), "java.lang", "Double", "Double")),
    ("kotlin.Float", info(Some("float"), "java.lang", "Float", "Float")),
    ("kotlin.Boolean", info(Some("boolean"), "java.lang", "Boolean", "Boolean")),
    ("kotlin.Char", info(Some("char"), "java.lang", "Character", "Char")),
    ("kotlin.Unit", info(Some("void"), "java.lang", "Void", "Nothing")),
    ("kotlin.Nothing", info(None, "java.lang", "Void", "Nothing")),
];

/// Primitive projection for the class named `fq_name`.
pub fn primitive_info(fq_name: &str) -> Option<&'static PrimitiveInfo> {
    PRIMITIVES
        .iter()
        .find(|(name, _)| *name == fq_name)
        .map(|(_, info)| info)
}

/// Classes `is_primitive_type` holds for when not nullable.
const PRIMITIVE_TYPES: &[&str] = &[
    "kotlin.Boolean",
    "kotlin.Char",
    "kotlin.Byte",
    "kotlin.Short",
    "kotlin.Int",
    "kotlin.Long",
    "kotlin.Float",
    "kotlin.Double",
];

pub fn is_primitive_class(fq_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&fq_name)
}

/// Element class of each primitive array class.
const PRIMITIVE_ARRAYS: &[(&str, &str)] = &[
    ("kotlin.BooleanArray", "Boolean"),
    ("kotlin.CharArray", "Char"),
    ("kotlin.ByteArray", "Byte"),
    ("kotlin.ShortArray", "Short"),
    ("kotlin.IntArray", "Int"),
    ("kotlin.LongArray", "Long"),
    ("kotlin.FloatArray", "Float"),
    ("kotlin.DoubleArray", "Double"),
];

/// Builtin element class name (`Int` for `kotlin.IntArray`).
pub fn primitive_array_element(fq_name: &str) -> Option<&'static str> {
    PRIMITIVE_ARRAYS
        .iter()
        .find(|(name, _)| *name == fq_name)
        .map(|(_, elem)| *elem)
}

pub const BOXED_ARRAY: &str = "kotlin.Array";

/// Rich classes with a distinct host class, by qualified name.
const JAVA_EQUIVALENTS: &[(&str, &str)] = &[
    ("kotlin.Any", "java.lang.Object"),
    ("kotlin.String", "java.lang.String"),
    ("kotlin.CharSequence", "java.lang.CharSequence"),
    ("kotlin.Throwable", "java.lang.Throwable"),
    ("kotlin.Cloneable", "java.lang.Cloneable"),
    ("kotlin.Number", "java.lang.Number"),
    ("kotlin.Comparable", "java.lang.Comparable"),
    ("kotlin.Enum", "java.lang.Enum"),
    ("kotlin.Annotation", "java.lang.annotation.Annotation"),
    ("kotlin.Deprecated", "java.lang.Deprecated"),
    ("kotlin.Byte", "java.lang.Byte"),
    ("kotlin.Short", "java.lang.Short"),
    ("kotlin.Int", "java.lang.Integer"),
    ("kotlin.Long", "java.lang.Long"),
    ("kotlin.Float", "java.lang.Float"),
    ("kotlin.Double", "java.lang.Double"),
    ("kotlin.Boolean", "java.lang.Boolean"),
    ("kotlin.Char", "java.lang.Character"),
    ("kotlin.collections.Iterable", "java.lang.Iterable"),
    ("kotlin.collections.MutableIterable", "java.lang.Iterable"),
    ("kotlin.collections.Iterator", "java.util.Iterator"),
    ("kotlin.collections.MutableIterator", "java.util.Iterator"),
    ("kotlin.collections.Collection", "java.util.Collection"),
    ("kotlin.collections.MutableCollection", "java.util.Collection"),
    ("kotlin.collections.List", "java.util.List"),
    ("kotlin.collections.MutableList", "java.util.List"),
    ("kotlin.collections.Set", "java.util.Set"),
    ("kotlin.collections.MutableSet", "java.util.Set"),
    ("kotlin.collections.ListIterator", "java.util.ListIterator"),
    ("kotlin.collections.MutableListIterator", "java.util.ListIterator"),
    ("kotlin.collections.Map", "java.util.Map"),
    ("kotlin.collections.MutableMap", "java.util.Map"),
    ("kotlin.collections.Map.Entry", "java.util.Map.Entry"),
    ("kotlin.collections.MutableMap.MutableEntry", "java.util.Map.Entry"),
];

/// Host class name for a rich class, e.g. `java.util.List` for
/// `kotlin.collections.MutableList`.
pub fn java_equivalent(fq_name: &str) -> Option<&'static str> {
    JAVA_EQUIVALENTS
        .iter()
        .find(|(kotlin, _)| *kotlin == fq_name)
        .map(|(_, java)| *java)
}
