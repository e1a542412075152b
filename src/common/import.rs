//! Name resolution
//!
//! Converts short and aliased class names to fully qualified names based on
//! the enclosing namespace and its `use` declarations, following PHP rules:
//! a leading `\` is absolute, `namespace\X` is relative to the current
//! namespace, a first segment matching an import alias expands to the
//! imported name, anything else is prefixed with the current namespace.

use crate::ast::*;
use std::collections::HashMap;

/// Type keywords that are never class names
const RESERVED_TYPES: &[&str] = &[
    "array", "bool", "callable", "false", "float", "int", "iterable", "mixed",
    "never", "null", "object", "string", "true", "void", "self", "static", "parent",
];

pub fn is_reserved_type(name: &str) -> bool {
    RESERVED_TYPES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Namespace and class imports in effect for one namespace block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameContext {
    namespace: Option<String>,
    aliases: HashMap<String, String>, // lower-cased alias -> fully qualified name
}

impl NameContext {
    pub fn global() -> Self {
        Self::default()
    }

    /// Build the context from a namespace block's name and class imports
    pub fn from_block(block: &NamespaceBlock) -> Self {
        let mut context = NameContext {
            namespace: block.name.clone().filter(|ns| !ns.is_empty()),
            aliases: HashMap::new(),
        };
        for import in block.uses.iter().filter(|u| u.kind == UseKind::Class) {
            let binding = import.binding().to_ascii_lowercase();
            if let Some(previous) = context.aliases.insert(binding, import.name.clone()) {
                log::debug!("import of {} shadows earlier import {}", import.name, previous);
            }
        }
        context
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Qualify a declared (unqualified) name with the current namespace
    pub fn qualify(&self, short: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}\\{}", ns, short),
            None => short.to_string(),
        }
    }

    /// Resolve a class reference as written in source
    pub fn resolve_class(&self, raw: &str) -> String {
        if let Some(absolute) = raw.strip_prefix('\\') {
            return absolute.to_string();
        }
        if is_reserved_type(raw) {
            return raw.to_ascii_lowercase();
        }

        let (first, rest) = match raw.split_once('\\') {
            Some((first, rest)) => (first, Some(rest)),
            None => (raw, None),
        };
        if first.eq_ignore_ascii_case("namespace") {
            if let Some(rest) = rest {
                return self.qualify(rest);
            }
        }
        if let Some(imported) = self.aliases.get(&first.to_ascii_lowercase()) {
            return match rest {
                Some(rest) => format!("{}\\{}", imported, rest),
                None => imported.clone(),
            };
        }
        self.qualify(raw)
    }
}

/// Rewrite every class-like name in the AST to its fully qualified form and
/// mark the AST as resolved. Running it twice is a no-op.
pub fn resolve_names(ast: &mut Ast) {
    if ast.names_resolved {
        return;
    }
    for block in &mut ast.namespaces {
        let context = NameContext::from_block(block);
        let mut resolver = NameResolver { context: &context };
        for decl in &mut block.types {
            resolver.resolve_type_decl(decl);
        }
    }
    ast.names_resolved = true;
}

struct NameResolver<'a> {
    context: &'a NameContext,
}

impl<'a> NameResolver<'a> {
    fn resolve_name(&self, name: &mut Name) {
        name.resolved = Some(self.context.resolve_class(&name.raw));
    }

    fn resolve_type_decl(&mut self, decl: &mut TypeDecl) {
        decl.fq_name = self.context.qualify(&decl.name);
        for name in decl.extends.iter_mut().chain(&mut decl.implements).chain(&mut decl.traits) {
            self.resolve_name(name);
        }
        for method in &mut decl.methods {
            for param in &mut method.params {
                if let Some(hint) = &mut param.type_hint {
                    self.resolve_hint(hint);
                }
                if let Some(default) = &mut param.default {
                    self.resolve_expr(default);
                }
            }
            if let Some(hint) = &mut method.return_type {
                self.resolve_hint(hint);
            }
            if let Some(body) = &mut method.body {
                self.resolve_block(body);
            }
        }
    }

    fn resolve_hint(&mut self, hint: &mut TypeHint) {
        match hint {
            TypeHint::Named(name) => self.resolve_name(name),
            TypeHint::Nullable(inner) => self.resolve_hint(inner),
            TypeHint::Union(members) | TypeHint::Intersection(members) => {
                for member in members {
                    self.resolve_hint(member);
                }
            }
        }
    }

    fn resolve_block(&mut self, block: &mut Block) {
        for stmt in &mut block.statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Expr(expr) | Stmt::Throw(expr, _) => self.resolve_expr(expr),
            Stmt::Block(block) => self.resolve_block(block),
            Stmt::Return(value, _) => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::If(if_stmt) => {
                self.resolve_expr(&mut if_stmt.condition);
                self.resolve_stmt(&mut if_stmt.then_branch);
                for (condition, branch) in &mut if_stmt.else_ifs {
                    self.resolve_expr(condition);
                    self.resolve_stmt(branch);
                }
                if let Some(else_branch) = &mut if_stmt.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body, .. } | Stmt::DoWhile { body, condition, .. } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::For { init, condition, step, body, .. } => {
                for expr in init.iter_mut().chain(condition).chain(step) {
                    self.resolve_expr(expr);
                }
                self.resolve_stmt(body);
            }
            Stmt::Foreach { subject, key, value, body, .. } => {
                self.resolve_expr(subject);
                if let Some(key) = key {
                    self.resolve_expr(key);
                }
                self.resolve_expr(value);
                self.resolve_stmt(body);
            }
            Stmt::Switch { subject, cases, .. } => {
                self.resolve_expr(subject);
                for case in cases {
                    if let Some(label) = &mut case.label {
                        self.resolve_expr(label);
                    }
                    for stmt in &mut case.body {
                        self.resolve_stmt(stmt);
                    }
                }
            }
            Stmt::Try(try_stmt) => {
                self.resolve_block(&mut try_stmt.body);
                for clause in &mut try_stmt.catches {
                    for name in &mut clause.types {
                        self.resolve_name(name);
                    }
                    self.resolve_block(&mut clause.body);
                }
                if let Some(finally) = &mut try_stmt.finally {
                    self.resolve_block(finally);
                }
            }
            Stmt::Echo(exprs, _) | Stmt::Unset(exprs, _) => {
                for expr in exprs {
                    self.resolve_expr(expr);
                }
            }
            Stmt::StaticVars(vars, _) => {
                for (_, init) in vars {
                    if let Some(init) = init {
                        self.resolve_expr(init);
                    }
                }
            }
            Stmt::Global(..) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Declaration(_) | Stmt::Nop(_) => {}
        }
    }

    fn resolve_class_ref(&mut self, class: &mut ClassRef) {
        match class {
            ClassRef::Named(name) => self.resolve_name(name),
            ClassRef::Dynamic(expr) => self.resolve_expr(expr),
            ClassRef::SelfRef(_) | ClassRef::StaticRef(_) | ClassRef::ParentRef(_) | ClassRef::Anonymous(_) => {}
        }
    }

    fn resolve_args(&mut self, args: &mut [Arg]) {
        for arg in args {
            self.resolve_expr(&mut arg.value);
        }
    }

    fn resolve_items(&mut self, items: &mut [ArrayItem]) {
        for item in items {
            if let Some(key) = &mut item.key {
                self.resolve_expr(key);
            }
            self.resolve_expr(&mut item.value);
        }
    }

    fn resolve_member(&mut self, member: &mut MemberName) {
        if let MemberName::Dynamic(expr) = member {
            self.resolve_expr(expr);
        }
    }

    fn resolve_expr(&mut self, expr: &mut Expr) {
        match expr {
            // bare names are constants or functions, which have their own fallback rules
            Expr::Variable(..) | Expr::Literal(..) | Expr::Name(_) | Expr::Closure(_) => {}
            Expr::DynamicVariable(inner, _)
            | Expr::Clone(inner, _)
            | Expr::Empty(inner, _)
            | Expr::Include(inner, _)
            | Expr::Print(inner, _)
            | Expr::Throw(inner, _) => self.resolve_expr(inner),
            Expr::Array(items, _) | Expr::List(items, _) => self.resolve_items(items),
            Expr::New(new) => {
                self.resolve_class_ref(&mut new.class);
                self.resolve_args(&mut new.args);
            }
            Expr::MethodCall(call) => {
                self.resolve_expr(&mut call.target);
                self.resolve_member(&mut call.method);
                self.resolve_args(&mut call.args);
            }
            Expr::StaticCall(call) => {
                self.resolve_class_ref(&mut call.class);
                self.resolve_member(&mut call.method);
                self.resolve_args(&mut call.args);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                self.resolve_args(args);
            }
            Expr::PropertyFetch { target, property, .. } => {
                self.resolve_expr(target);
                self.resolve_member(property);
            }
            Expr::StaticPropertyFetch { class, .. } | Expr::ClassConst { class, .. } => {
                self.resolve_class_ref(class);
            }
            Expr::Index { target, index, .. } => {
                self.resolve_expr(target);
                if let Some(index) = index {
                    self.resolve_expr(index);
                }
            }
            Expr::Assign { target, value, .. } => {
                self.resolve_expr(target);
                self.resolve_expr(value);
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => self.resolve_expr(expr),
            Expr::Ternary { condition, then_expr, else_expr, .. } => {
                self.resolve_expr(condition);
                if let Some(then_expr) = then_expr {
                    self.resolve_expr(then_expr);
                }
                self.resolve_expr(else_expr);
            }
            Expr::InstanceOf { expr, class, .. } => {
                self.resolve_expr(expr);
                self.resolve_class_ref(class);
            }
            Expr::Isset(exprs, _) => {
                for expr in exprs {
                    self.resolve_expr(expr);
                }
            }
            Expr::Yield { key, value, .. } => {
                if let Some(key) = key {
                    self.resolve_expr(key);
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Expr::Match { subject, arms, .. } => {
                self.resolve_expr(subject);
                for arm in arms {
                    if let Some(conditions) = &mut arm.conditions {
                        for condition in conditions {
                            self.resolve_expr(condition);
                        }
                    }
                    self.resolve_expr(&mut arm.body);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_php;

    fn resolved(source: &str) -> Ast {
        let mut ast = parse_php(source).expect("Failed to parse");
        resolve_names(&mut ast);
        ast
    }

    #[test]
    fn test_resolve_class_rules() {
        let ast = parse_php(
            "<?php namespace App\\Http; use Lib\\Errors as E; use Vendor\\Client; use function foo;",
        )
        .expect("Failed to parse");
        let context = NameContext::from_block(&ast.namespaces[0]);

        assert_eq!(context.resolve_class("\\RuntimeException"), "RuntimeException");
        assert_eq!(context.resolve_class("Client"), "Vendor\\Client");
        assert_eq!(context.resolve_class("client"), "Vendor\\Client");
        assert_eq!(context.resolve_class("E\\NotFound"), "Lib\\Errors\\NotFound");
        assert_eq!(context.resolve_class("Request"), "App\\Http\\Request");
        assert_eq!(context.resolve_class("Sub\\Thing"), "App\\Http\\Sub\\Thing");
        assert_eq!(context.resolve_class("namespace\\Local"), "App\\Http\\Local");
        assert_eq!(context.resolve_class("foo"), "App\\Http\\foo");
        assert_eq!(context.resolve_class("Self"), "self");
        assert_eq!(context.resolve_class("?int".trim_start_matches('?')), "int");
    }

    #[test]
    fn test_global_namespace_keeps_short_names() {
        let context = NameContext::global();
        assert_eq!(context.namespace(), None);
        assert_eq!(context.resolve_class("Exception"), "Exception");
        assert_eq!(context.qualify("Repo"), "Repo");
    }

    #[test]
    fn test_resolve_names_rewrites_declarations_and_bodies() {
        let ast = resolved(r#"<?php
namespace App;

use Psr\Log\LoggerInterface;
use Errors\{Missing, Broken as Failure};

class Service extends Base implements LoggerInterface {
    public function run(Reader|\Other\Writer $io): Result {
        try {
            throw new Failure();
        } catch (Missing $e) {
            Helper::wrap($e);
        }
    }
}
"#);
        assert!(ast.names_resolved);
        let service = ast.find_type("App\\Service").expect("type");
        assert_eq!(service.extends[0].fq(), "App\\Base");
        assert_eq!(service.implements[0].fq(), "Psr\\Log\\LoggerInterface");

        let method = &service.methods[0];
        let hint_names: Vec<&str> = method.params[0]
            .type_hint
            .as_ref()
            .map(|h| h.names().into_iter().map(|n| n.fq()).collect())
            .unwrap_or_default();
        assert_eq!(hint_names, vec!["App\\Reader", "Other\\Writer"]);
        assert_eq!(method.return_type.as_ref().map(|h| h.to_string()).as_deref(), Some("App\\Result"));

        let try_stmt = match &method.body.as_ref().expect("body").statements[0] {
            Stmt::Try(t) => t,
            other => panic!("expected try, got {:?}", other),
        };
        match &try_stmt.body.statements[0] {
            Stmt::Throw(Expr::New(new), _) => match &new.class {
                ClassRef::Named(name) => assert_eq!(name.fq(), "Errors\\Broken"),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(try_stmt.catches[0].types[0].fq(), "Errors\\Missing");
        match &try_stmt.catches[0].body.statements[0] {
            Stmt::Expr(Expr::StaticCall(call)) => match &call.class {
                ClassRef::Named(name) => assert_eq!(name.fq(), "App\\Helper"),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reserved_type_hints_are_not_namespaced() {
        let ast = resolved("<?php namespace A; class B { function f(?int $x, self $y): static {} }");
        let method = &ast.find_type("A\\B").expect("type").methods[0];
        assert_eq!(method.params[0].type_hint.as_ref().map(|h| h.to_string()).as_deref(), Some("?int"));
        assert_eq!(method.params[1].type_hint.as_ref().map(|h| h.to_string()).as_deref(), Some("self"));
        assert_eq!(method.return_type.as_ref().map(|h| h.to_string()).as_deref(), Some("static"));
    }
}
