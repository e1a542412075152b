//! Built-in PHP types
//!
//! The exception hierarchy and the core interfaces user code commonly
//! implements. They have no source file; interface methods carry signatures
//! but no docblock, so they permit no exceptions.

use crate::ast::TypeKind;
use crate::common::class_index::{ClassInfo, MethodInfo, ParamInfo, Visibility};
use crate::common::import::NameContext;
use crate::common::type_sig::TypeSig;
use once_cell::sync::Lazy;

struct Builtin {
    name: &'static str,
    kind: TypeKind,
    parent: Option<&'static str>,
    interfaces: &'static [&'static str],
    /// (method, [(param, type)], return type)
    methods: &'static [(&'static str, &'static [(&'static str, &'static str)], &'static str)],
}

const fn interface(
    name: &'static str,
    extends: &'static [&'static str],
    methods: &'static [(&'static str, &'static [(&'static str, &'static str)], &'static str)],
) -> Builtin {
    Builtin { name, kind: TypeKind::Interface, parent: None, interfaces: extends, methods }
}

const fn class(name: &'static str, parent: Option<&'static str>, interfaces: &'static [&'static str]) -> Builtin {
    Builtin { name, kind: TypeKind::Class, parent, interfaces, methods: &[] }
}

const BUILTINS: &[Builtin] = &[
    interface("Stringable", &[], &[("__toString", &[], "string")]),
    interface("Traversable", &[], &[]),
    interface("Iterator", &["Traversable"], &[
        ("current", &[], "mixed"),
        ("key", &[], "mixed"),
        ("next", &[], "void"),
        ("rewind", &[], "void"),
        ("valid", &[], "bool"),
    ]),
    interface("IteratorAggregate", &["Traversable"], &[("getIterator", &[], "Traversable")]),
    interface("ArrayAccess", &[], &[
        ("offsetExists", &[("offset", "mixed")], "bool"),
        ("offsetGet", &[("offset", "mixed")], "mixed"),
        ("offsetSet", &[("offset", "mixed"), ("value", "mixed")], "void"),
        ("offsetUnset", &[("offset", "mixed")], "void"),
    ]),
    interface("Countable", &[], &[("count", &[], "int")]),
    interface("JsonSerializable", &[], &[("jsonSerialize", &[], "mixed")]),
    interface("UnitEnum", &[], &[]),
    interface("BackedEnum", &["UnitEnum"], &[]),
    interface("Throwable", &["Stringable"], &[]),
    class("Closure", None, &[]),
    class("stdClass", None, &[]),
    class("Generator", None, &["Iterator"]),
    class("ArrayIterator", None, &["Iterator", "ArrayAccess", "Countable"]),
    class("Exception", None, &["Throwable"]),
    class("Error", None, &["Throwable"]),
    class("ErrorException", Some("Exception"), &[]),
    class("TypeError", Some("Error"), &[]),
    class("ArgumentCountError", Some("TypeError"), &[]),
    class("ValueError", Some("Error"), &[]),
    class("ArithmeticError", Some("Error"), &[]),
    class("DivisionByZeroError", Some("ArithmeticError"), &[]),
    class("AssertionError", Some("Error"), &[]),
    class("UnhandledMatchError", Some("Error"), &[]),
    class("CompileError", Some("Error"), &[]),
    class("ParseError", Some("CompileError"), &[]),
    class("JsonException", Some("Exception"), &[]),
    class("LogicException", Some("Exception"), &[]),
    class("BadFunctionCallException", Some("LogicException"), &[]),
    class("BadMethodCallException", Some("BadFunctionCallException"), &[]),
    class("DomainException", Some("LogicException"), &[]),
    class("InvalidArgumentException", Some("LogicException"), &[]),
    class("LengthException", Some("LogicException"), &[]),
    class("OutOfRangeException", Some("LogicException"), &[]),
    class("RuntimeException", Some("Exception"), &[]),
    class("OutOfBoundsException", Some("RuntimeException"), &[]),
    class("OverflowException", Some("RuntimeException"), &[]),
    class("RangeException", Some("RuntimeException"), &[]),
    class("UnderflowException", Some("RuntimeException"), &[]),
    class("UnexpectedValueException", Some("RuntimeException"), &[]),
];

/// Built-in declarations, in registration order
pub static BUILTIN_CLASSES: Lazy<Vec<ClassInfo>> = Lazy::new(|| BUILTINS.iter().map(to_class_info).collect());

fn to_class_info(builtin: &Builtin) -> ClassInfo {
    let methods = builtin
        .methods
        .iter()
        .map(|(name, params, returns)| MethodInfo {
            name: name.to_string(),
            declaring_class: builtin.name.to_string(),
            source_owner: builtin.name.to_string(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: builtin.kind == TypeKind::Interface,
            doc: None,
            return_type: Some(TypeSig::parse(returns)),
            params: params
                .iter()
                .map(|(param, ty)| ParamInfo { name: param.to_string(), type_sig: Some(TypeSig::parse(ty)) })
                .collect(),
            lines: None,
            file: None,
        })
        .collect();

    ClassInfo {
        name: builtin.name.to_string(),
        kind: builtin.kind,
        parent: builtin.parent.map(str::to_string),
        interfaces: builtin.interfaces.iter().map(|s| s.to_string()).collect(),
        traits: Vec::new(),
        is_abstract: builtin.kind == TypeKind::Interface,
        file: None,
        context: NameContext::global(),
        methods,
    }
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.iter().any(|b| b.name.eq_ignore_ascii_case(name))
}
