//! Contract review passes
//!
//! A review run walks every concrete or abstract class and enum in the
//! index and hands it to each [`ClassChecker`]. Checkers report
//! [`Violation`]s; a class whose hierarchy cannot be loaded is reported as
//! a [`LoadError`] instead, so callers can tell "not checked" apart from
//! "checked and failed".

use crate::ast::TypeKind;
use crate::common::ast_cache::AstCache;
use crate::common::class_index::{ClassIndex, ClassInfo};
use crate::config::Config;

pub mod contracts;
pub mod docblock;
pub mod throws;
pub mod violation;

pub use contracts::{compare_class_to_contracts, ContractComparator};
pub use docblock::{declared_throws, extract_throws};
pub use throws::ThrowsResolver;
pub use violation::{Violation, ViolationKind};

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("class '{0}' is not declared in the scanned sources")]
    ClassNotFound(String),
    #[error("class '{class}' cannot be checked: contract '{contract}' is not declared in the scanned sources")]
    UnresolvedContract { class: String, contract: String },
}

/// Everything a checker may consult while auditing one class
#[derive(Clone, Copy)]
pub struct AuditContext<'a> {
    pub index: &'a ClassIndex,
    pub cache: &'a AstCache,
    pub config: &'a Config,
}

/// A rule applied to each audited class
pub trait ClassChecker {
    fn name(&self) -> &'static str;

    fn check(&self, class: &ClassInfo, ctx: &AuditContext<'_>) -> LoadResult<Vec<Violation>>;
}

/// The checkers a default run applies
pub fn default_checkers() -> Vec<Box<dyn ClassChecker>> {
    vec![Box::new(ContractComparator)]
}

#[derive(Debug, Default, Clone)]
pub struct AuditReport {
    pub violations: Vec<Violation>,
    pub load_errors: Vec<LoadError>,
    /// Classes handed to the checkers
    pub checked: usize,
}

impl AuditReport {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Run every checker over the audited classes, in index order
pub fn audit(
    index: &ClassIndex,
    cache: &AstCache,
    config: &Config,
    checkers: &[Box<dyn ClassChecker>],
) -> AuditReport {
    let ctx = AuditContext { index, cache, config };
    let mut report = AuditReport::default();

    let subjects = index
        .classes()
        .filter(|class| !class.is_builtin() && matches!(class.kind, TypeKind::Class | TypeKind::Enum));
    for class in subjects {
        report.checked += 1;
        for checker in checkers {
            match checker.check(class, &ctx) {
                Ok(found) => {
                    log::debug!("{}: {} reported {} violation(s)", class.name, checker.name(), found.len());
                    report.violations.extend(found);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    report.load_errors.push(e);
                    break;
                }
            }
        }
    }

    log::info!(
        "audited {} classes: {} violation(s), {} could not be checked",
        report.checked,
        report.violations.len(),
        report.load_errors.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ast_cache::MemorySourceLoader;

    #[test]
    fn test_audit_skips_contracts_and_reports_load_errors() {
        let loader = MemorySourceLoader::new()
            .with_file("a.php", "<?php interface I { function f(); } trait T {} class Ok implements I { function f() {} }")
            .with_file("b.php", "<?php class Broken extends Unknown {} enum Suit { case Hearts; }");
        let paths = loader.paths();
        let cache = AstCache::new(loader);
        let index = ClassIndex::build(&paths, &cache);

        let report = audit(&index, &cache, &Config::default(), &default_checkers());
        assert_eq!(report.checked, 3);
        assert!(!report.has_violations());
        assert_eq!(
            report.load_errors,
            vec![LoadError::UnresolvedContract { class: "Broken".into(), contract: "Unknown".into() }]
        );
    }
}
