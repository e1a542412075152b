//! Abstract Syntax Tree (AST) representation for PHP sources
//!
//! Only the constructs that matter to contract auditing keep their full
//! structure; everything else is parsed and reduced to spans.

mod nodes;
mod visitor;

pub use nodes::*;
pub use visitor::*;

pub use crate::parser::span::{Location, Span};

/// AST node trait that all spanned nodes implement
pub trait AstNode {
    /// Get the source span of this node
    fn span(&self) -> Span;
}

/// Main AST root node
#[derive(Debug, Clone)]
pub struct Ast {
    pub namespaces: Vec<NamespaceBlock>,
    /// Set once every name has been rewritten to its fully-qualified form
    pub names_resolved: bool,
    pub span: Span,
}

impl Ast {
    /// All type declarations across every namespace block, in source order
    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.namespaces.iter().flat_map(|ns| ns.types.iter())
    }

    /// Find a declaration by fully-qualified name (case-insensitive)
    pub fn find_type(&self, fq_name: &str) -> Option<&TypeDecl> {
        let wanted = fq_name.trim_start_matches('\\');
        self.types().find(|t| t.fq_name.eq_ignore_ascii_case(wanted))
    }

    /// Find a method body node by owner and method name
    pub fn find_method(&self, owner: &str, method: &str) -> Option<&MethodDecl> {
        self.find_type(owner).and_then(|t| t.method(method))
    }
}

impl AstNode for Ast {
    fn span(&self) -> Span {
        self.span
    }
}
