//! Normalized type signatures
//!
//! A declared type is kept in disjunctive normal form: a union of
//! intersections of atoms. Scalar and pseudo types are lower-cased atoms,
//! class atoms are fully qualified names. An absent declaration is `mixed`
//! and is represented by `Option::None` at call sites.

use crate::ast::TypeHint;
use crate::common::class_index::ClassIndex;
use std::fmt;

const SCALAR_TYPES: &[&str] = &[
    "array", "bool", "callable", "false", "float", "int", "iterable", "mixed",
    "never", "null", "object", "string", "true", "void",
];

fn is_scalar(atom: &str) -> bool {
    SCALAR_TYPES.contains(&atom)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSig {
    alternatives: Vec<Vec<String>>,
}

impl TypeSig {
    /// Build from a resolved hint; `self`/`static` bind to `self_class`
    pub fn from_hint(hint: &TypeHint, self_class: &str, parent: Option<&str>) -> Self {
        let mut alternatives = Vec::new();
        collect_alternatives(hint, self_class, parent, &mut alternatives);
        let mut sig = TypeSig { alternatives: Vec::new() };
        for conjunction in alternatives {
            sig.push_alternative(conjunction);
        }
        sig
    }

    /// Parse a written type such as `?int`, `A|B` or `(A&B)|null`; names are
    /// taken as already qualified
    pub fn parse(text: &str) -> Self {
        let mut sig = TypeSig { alternatives: Vec::new() };
        let text = text.trim();
        let (nullable, text) = match text.strip_prefix('?') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        for member in text.split('|') {
            let conjunction = member
                .trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .split('&')
                .map(|atom| normalize_atom(atom.trim()))
                .filter(|atom| !atom.is_empty())
                .collect::<Vec<_>>();
            if !conjunction.is_empty() {
                sig.push_alternative(conjunction);
            }
        }
        if nullable {
            sig.push_alternative(vec!["null".to_string()]);
        }
        sig
    }

    fn push_alternative(&mut self, conjunction: Vec<String>) {
        let duplicate = self.alternatives.iter().any(|existing| {
            existing.len() == conjunction.len()
                && existing.iter().zip(&conjunction).all(|(a, b)| a.eq_ignore_ascii_case(b))
        });
        if !duplicate {
            self.alternatives.push(conjunction);
        }
    }

    pub fn alternatives(&self) -> &[Vec<String>] {
        &self.alternatives
    }

    /// Class-like atoms mentioned anywhere in the signature
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for atom in self.alternatives.iter().flatten() {
            if !is_scalar(atom) && !names.iter().any(|n| n.eq_ignore_ascii_case(atom)) {
                names.push(atom);
            }
        }
        names
    }

    /// Replace a class atom, used when trait methods are copied into a class
    pub fn rebind(&self, from: &str, to: &str) -> Self {
        let alternatives = self
            .alternatives
            .iter()
            .map(|conjunction| {
                conjunction
                    .iter()
                    .map(|atom| if atom.eq_ignore_ascii_case(from) { to.to_string() } else { atom.clone() })
                    .collect()
            })
            .collect();
        TypeSig { alternatives }
    }

    /// Union subtyping: every alternative must fit some alternative of `other`
    pub fn is_subtype_of(&self, other: &TypeSig, index: &ClassIndex) -> bool {
        if other.is_mixed() {
            return true;
        }
        self.alternatives.iter().all(|sub| {
            other.alternatives.iter().any(|sup| conjunction_subtype(sub, sup, index))
        })
    }

    fn is_mixed(&self) -> bool {
        self.alternatives.iter().any(|c| c.len() == 1 && c[0] == "mixed")
    }
}

/// Subtyping with absent declarations treated as `mixed`
pub fn is_subtype(sub: Option<&TypeSig>, sup: Option<&TypeSig>, index: &ClassIndex) -> bool {
    match (sub, sup) {
        (_, None) => true,
        (None, Some(sup)) => sup.is_mixed(),
        (Some(sub), Some(sup)) => sub.is_subtype_of(sup, index),
    }
}

/// Render an optional signature, `mixed` when absent
pub fn describe(sig: Option<&TypeSig>) -> String {
    sig.map_or_else(|| "mixed".to_string(), |s| s.to_string())
}

fn normalize_atom(atom: &str) -> String {
    let atom = atom.trim_start_matches('\\');
    let lower = atom.to_ascii_lowercase();
    if is_scalar(&lower) {
        lower
    } else {
        atom.to_string()
    }
}

fn collect_alternatives(hint: &TypeHint, self_class: &str, parent: Option<&str>, out: &mut Vec<Vec<String>>) {
    match hint {
        TypeHint::Named(_) | TypeHint::Intersection(_) => {
            out.push(conjunction_atoms(hint, self_class, parent));
        }
        TypeHint::Nullable(inner) => {
            collect_alternatives(inner, self_class, parent, out);
            out.push(vec!["null".to_string()]);
        }
        TypeHint::Union(members) => {
            for member in members {
                collect_alternatives(member, self_class, parent, out);
            }
        }
    }
}

fn conjunction_atoms(hint: &TypeHint, self_class: &str, parent: Option<&str>) -> Vec<String> {
    hint.names()
        .into_iter()
        .map(|name| {
            let written = name.fq();
            if written.eq_ignore_ascii_case("self") || written.eq_ignore_ascii_case("static") {
                self_class.to_string()
            } else if written.eq_ignore_ascii_case("parent") {
                parent.unwrap_or(self_class).to_string()
            } else {
                normalize_atom(written)
            }
        })
        .collect()
}

/// `sub` (an intersection) fits `sup` when every conjunct of `sup` is met by some conjunct of `sub`
fn conjunction_subtype(sub: &[String], sup: &[String], index: &ClassIndex) -> bool {
    sup.iter().all(|wanted| sub.iter().any(|have| atom_subtype(have, wanted, index)))
}

fn atom_subtype(sub: &str, sup: &str, index: &ClassIndex) -> bool {
    if sub.eq_ignore_ascii_case(sup) || sup == "mixed" || sub == "never" {
        return true;
    }
    match sup {
        "bool" => sub == "true" || sub == "false",
        "iterable" => sub == "array" || (!is_scalar(sub) && index.is_subtype(sub, "Traversable")),
        "object" => !is_scalar(sub),
        "callable" => !is_scalar(sub) && index.is_subtype(sub, "Closure"),
        _ if is_scalar(sub) || is_scalar(sup) => false,
        _ => index.is_subtype(sub, sup),
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .alternatives
            .iter()
            .map(|conjunction| {
                if conjunction.len() > 1 && self.alternatives.len() > 1 {
                    format!("({})", conjunction.join("&"))
                } else {
                    conjunction.join("&")
                }
            })
            .collect();
        write!(f, "{}", parts.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ast_cache::{AstCache, MemorySourceLoader};

    fn index() -> ClassIndex {
        let loader = MemorySourceLoader::new().with_file(
            "types.php",
            r#"<?php
interface Shape {}
class Square implements Shape {}
class Box implements IteratorAggregate { function getIterator(): Traversable {} }
"#,
        );
        let paths = loader.paths();
        let cache = AstCache::new(loader);
        ClassIndex::build(&paths, &cache)
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(TypeSig::parse("?int").to_string(), "int|null");
        assert_eq!(TypeSig::parse("\\Foo|String").to_string(), "Foo|string");
        assert_eq!(TypeSig::parse("(A&B)|null").to_string(), "(A&B)|null");
        assert_eq!(TypeSig::parse("int|int").alternatives().len(), 1);
    }

    #[test]
    fn test_scalar_and_pseudo_rules() {
        let index = index();
        let sub = |a: &str, b: &str| TypeSig::parse(a).is_subtype_of(&TypeSig::parse(b), &index);

        assert!(sub("int", "int|string"));
        assert!(!sub("int|string", "int"));
        assert!(sub("true", "bool"));
        assert!(sub("never", "Square"));
        assert!(sub("null", "?int"));
        assert!(sub("array", "iterable"));
        assert!(sub("Box", "iterable"));
        assert!(sub("Square", "object"));
        assert!(!sub("int", "object"));
        assert!(sub("Closure", "callable"));
        assert!(!sub("void", "int"));
        assert!(sub("string", "mixed"));
        assert!(!sub("mixed", "string"));
    }

    #[test]
    fn test_class_and_intersection_rules() {
        let index = index();
        let sub = |a: &str, b: &str| TypeSig::parse(a).is_subtype_of(&TypeSig::parse(b), &index);

        assert!(sub("Square", "Shape"));
        assert!(sub("square", "SHAPE"));
        assert!(!sub("Shape", "Square"));
        assert!(sub("Square&Countable", "Shape"));
        assert!(!sub("Square", "Shape&Countable"));
        assert!(sub("Square&Countable", "Shape&Countable"));
        assert!(sub("Unknown\\Thing", "unknown\\thing"));
    }

    #[test]
    fn test_absent_types_are_mixed() {
        let index = index();
        let int = TypeSig::parse("int");
        assert!(is_subtype(Some(&int), None, &index));
        assert!(!is_subtype(None, Some(&int), &index));
        assert!(is_subtype(None, Some(&TypeSig::parse("mixed")), &index));
        assert_eq!(describe(None), "mixed");
    }

    #[test]
    fn test_from_hint_binds_self_and_nullable() {
        let ast = crate::parser::parse_php("<?php class A { function f(): ?static {} function g(): self|Foo {} }")
            .expect("Failed to parse");
        let decl = ast.types().next().expect("type");
        let f = TypeSig::from_hint(decl.methods[0].return_type.as_ref().expect("hint"), "App\\A", None);
        assert_eq!(f.to_string(), "App\\A|null");
        let g = TypeSig::from_hint(decl.methods[1].return_type.as_ref().expect("hint"), "App\\A", None);
        assert_eq!(g.class_names(), vec!["App\\A", "Foo"]);
        assert_eq!(g.rebind("App\\A", "App\\B").to_string(), "App\\B|Foo");
    }
}
