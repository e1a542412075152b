//! Liskov contract auditor for PHP
//!
//! Statically checks that classes honor the contracts they claim to satisfy:
//! an override may not raise exceptions its interface or parent does not
//! permit, may not widen its return type and may not narrow its parameters.
//!
//! ## Architecture
//!
//! - **parser**: lexical analysis and parsing of PHP source into an AST
//! - **ast**: syntax tree nodes and a read-only visitor
//! - **common**: name resolution, the syntax-tree cache, the class index and
//!   type signatures
//! - **review**: `@throws` extraction, actual-throws resolution and the
//!   contract comparator
//! - **bin**: command-line interface
//!
//! ## Audit Flow
//!
//! ```text
//! PHP sources → AstCache (parse + resolve names) → ClassIndex
//!                                                     ↓
//!                        audit() → ContractComparator → Violations
//!                                        ↓
//!                          docblock @throws / ThrowsResolver
//! ```

pub mod ast;
pub mod common;
pub mod config;
pub mod error;
pub mod parser;
pub mod review;

pub use common::{AstCache, ClassIndex};
pub use config::Config;
pub use error::{Error, Result};
pub use review::{audit, default_checkers, AuditReport, LoadError, Violation, ViolationKind};

use std::path::PathBuf;

/// Index the given files and audit every class found in them
pub fn audit_files(paths: &[PathBuf], config: &Config) -> AuditReport {
    let cache = AstCache::filesystem();
    let index = ClassIndex::build(paths, &cache);
    audit(&index, &cache, config, &default_checkers())
}
