//! Contract comparison
//!
//! For each contract of a class (every implemented interface, then the
//! parent class) and each contract method the class genuinely overrides,
//! the override's declared and actual exceptions must be permitted by the
//! contract's `@throws`, its return type must be covariant and its parameter
//! types contravariant.

use super::docblock::declared_throws;
use super::throws::ThrowsResolver;
use super::violation::Violation;
use super::{AuditContext, ClassChecker, LoadError, LoadResult};
use crate::common::class_index::{ClassIndex, ClassInfo, MethodInfo, Visibility};
use crate::common::import::NameContext;
use crate::common::type_sig::{describe, is_subtype};
use std::collections::BTreeSet;

/// Checks every class against the contracts it claims to satisfy
#[derive(Debug, Default, Clone, Copy)]
pub struct ContractComparator;

impl ClassChecker for ContractComparator {
    fn name(&self) -> &'static str {
        "contracts"
    }

    fn check(&self, class: &ClassInfo, ctx: &AuditContext<'_>) -> LoadResult<Vec<Violation>> {
        compare_class_to_contracts(&class.name, ctx)
    }
}

/// Violations of `class_name` against all of its contracts, in contract
/// order and then emission order within each contract
pub fn compare_class_to_contracts(class_name: &str, ctx: &AuditContext<'_>) -> LoadResult<Vec<Violation>> {
    let index = ctx.index;
    let subject = index
        .get(class_name)
        .ok_or_else(|| LoadError::ClassNotFound(class_name.to_string()))?;

    let mut contracts = index.interfaces(&subject.name);
    if let Some(parent) = &subject.parent {
        contracts.push(parent.clone());
    }
    let contracts = contracts
        .iter()
        .map(|name| {
            index.get(name).ok_or_else(|| LoadError::UnresolvedContract {
                class: subject.name.clone(),
                contract: name.clone(),
            })
        })
        .collect::<LoadResult<Vec<&ClassInfo>>>()?;

    let mut resolver = ThrowsResolver::new(index, ctx.cache, ctx.config);
    let mut violations = Vec::new();
    for contract in contracts {
        for contract_method in index.methods(&contract.name) {
            if !is_comparable(contract_method) {
                continue;
            }
            let overriding = match index.method(&subject.name, &contract_method.name) {
                Some(m) if !m.declaring_class.eq_ignore_ascii_case(&contract_method.declaring_class) => m,
                _ => continue,
            };
            log::debug!(
                "comparing {}::{}() against {}",
                subject.name,
                overriding.name,
                contract.name
            );
            compare_method(subject, overriding, contract, contract_method, &mut resolver, index, &mut violations);
        }
    }
    Ok(violations)
}

/// Private methods are not part of a contract; constructors only when abstract
fn is_comparable(method: &MethodInfo) -> bool {
    if method.visibility == Visibility::Private {
        return false;
    }
    !method.name.eq_ignore_ascii_case("__construct") || method.is_abstract
}

fn compare_method(
    subject: &ClassInfo,
    overriding: &MethodInfo,
    contract: &ClassInfo,
    contract_method: &MethodInfo,
    resolver: &mut ThrowsResolver<'_>,
    index: &ClassIndex,
    out: &mut Vec<Violation>,
) {
    let class = subject.name.as_str();
    let method = overriding.name.as_str();
    let permitted = method_declared_throws(contract_method, index);

    for exception in method_declared_throws(overriding, index) {
        if !is_permitted(&exception, &permitted, index) {
            out.push(Violation::annotation_throws(class, method, &contract.name, &exception));
        }
    }
    for exception in resolver.method_throws(class, method) {
        if !is_permitted(&exception, &permitted, index) {
            out.push(Violation::code_throws(class, method, &contract.name, &exception));
        }
    }

    let (found, expected) = (overriding.return_type.as_ref(), contract_method.return_type.as_ref());
    if !is_subtype(found, expected, index) {
        out.push(Violation::return_type(class, method, &contract.name, &describe(found), &describe(expected)));
    }

    // Checked again here even though PHP refuses to load such a class; the
    // symbol table is built without that guarantee.
    for (param, contract_param) in overriding.params.iter().zip(&contract_method.params) {
        let (found, expected) = (param.type_sig.as_ref(), contract_param.type_sig.as_ref());
        if !is_subtype(expected, found, index) {
            out.push(Violation::parameter_type(
                class,
                method,
                &contract.name,
                &param.name,
                &describe(found),
                &describe(expected),
            ));
        }
    }
}

/// `@throws` of a method, resolved in the namespace of the declaration holding its body
fn method_declared_throws(method: &MethodInfo, index: &ClassIndex) -> BTreeSet<String> {
    let global = NameContext::global();
    let context = index.get(&method.source_owner).map_or(&global, |owner| &owner.context);
    declared_throws(method.doc.as_deref(), context, index)
        .into_iter()
        .map(|name| index.get(&name).map_or(name, |c| c.name.clone()))
        .collect()
}

fn is_permitted(exception: &str, permitted: &BTreeSet<String>, index: &ClassIndex) -> bool {
    permitted.iter().any(|allowed| index.is_subtype(exception, allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ast_cache::{AstCache, MemorySourceLoader};
    use crate::config::Config;
    use crate::review::ViolationKind;

    fn check(source: &str, class: &str) -> LoadResult<Vec<Violation>> {
        let loader = MemorySourceLoader::new().with_file("src.php", source);
        let paths = loader.paths();
        let cache = AstCache::new(loader);
        let index = ClassIndex::build(&paths, &cache);
        let config = Config::default();
        let ctx = AuditContext { index: &index, cache: &cache, config: &config };
        compare_class_to_contracts(class, &ctx)
    }

    #[test]
    fn test_inherited_methods_are_not_overrides() {
        let source = r#"<?php
interface Shape { public function area(): float; }
class Square implements Shape {
    /** @throws DomainException */
    public function area(): float { return 1.0; }
}
class Tile extends Square {}
"#;
        let square = check(source, "Square").expect("Square loads");
        assert_eq!(square.len(), 1);
        assert_eq!(square[0].kind, ViolationKind::AnnotationThrows);

        // Tile inherits Square's area(), which still breaks Shape but not Square
        let tile = check(source, "Tile").expect("Tile loads");
        assert_eq!(tile.len(), 1);
        assert_eq!(tile[0].contract_name, "Shape");
    }

    #[test]
    fn test_private_methods_and_constructors_are_skipped() {
        let source = r#"<?php
class Base {
    public function __construct(int $x) {}
    private function secret(int $x): int { return $x; }
}
class Child extends Base {
    public function __construct(string $x) { throw new RuntimeException(); }
    private function secret(string $x): string { return $x; }
}
"#;
        assert!(check(source, "Child").expect("Child loads").is_empty());
    }

    #[test]
    fn test_missing_subject_and_contract() {
        assert_eq!(
            check("<?php class A {}", "B").unwrap_err(),
            LoadError::ClassNotFound("B".to_string())
        );
        assert_eq!(
            check("<?php class A implements Missing {}", "A").unwrap_err(),
            LoadError::UnresolvedContract { class: "A".to_string(), contract: "Missing".to_string() }
        );
    }
}
