//! Actual-throws resolution
//!
//! Each method body is scanned once into a summary: the exception types it
//! raises itself and the calls whose target class is statically known
//! (`$this`, `self`/`static`/`parent`, named classes, instances constructed
//! at the call site and locals typed by a parameter declaration or a
//! preceding `new`). Anything else is skipped and only logged.
//!
//! A query then collects the bodies reachable from the queried method,
//! breadth-first up to the depth ceiling, and propagates outcomes along the
//! call edges until nothing changes. Mutually recursive methods end up with
//! the union of what their cycle raises.
//!
//! Values raised after reassignment, or built by a factory, are not tracked.

use crate::ast::*;
use crate::common::ast_cache::AstCache;
use crate::common::class_index::{ClassIndex, MethodInfo};
use crate::config::Config;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

/// Identifies one method body evaluated for one `$this` binding
type CallKey = (String, String, String);

/// A method body together with the class `$this` is bound to
struct Frame<'a> {
    this_class: String,
    info: &'a MethodInfo,
}

impl Frame<'_> {
    fn key(&self) -> CallKey {
        (
            self.this_class.to_ascii_lowercase(),
            self.info.source_owner.to_ascii_lowercase(),
            self.info.name.to_ascii_lowercase(),
        )
    }
}

/// A call leaving a body, with the catch types wrapped around it
#[derive(Debug, Clone)]
struct CallSite {
    this_class: String,
    lookup_class: String,
    method: String,
    caught: Vec<String>,
}

#[derive(Debug, Default)]
struct BodySummary {
    raised: BTreeSet<String>,
    calls: Vec<CallSite>,
}

enum EdgeTarget {
    /// Position in the graph of the current query
    Node(usize),
    /// Result of an earlier complete query
    Settled(BTreeSet<String>),
}

struct Edge {
    target: EdgeTarget,
    caught: Vec<String>,
}

struct Node {
    key: CallKey,
    raised: BTreeSet<String>,
    edges: Vec<Edge>,
}

pub struct ThrowsResolver<'a> {
    index: &'a ClassIndex,
    cache: &'a AstCache,
    config: &'a Config,
    summaries: HashMap<CallKey, Rc<BodySummary>>,
    memo: HashMap<CallKey, BTreeSet<String>>,
}

impl<'a> ThrowsResolver<'a> {
    pub fn new(index: &'a ClassIndex, cache: &'a AstCache, config: &'a Config) -> Self {
        Self {
            index,
            cache,
            config,
            summaries: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    /// Exception types `class::method()` can raise, fully qualified
    pub fn method_throws(&mut self, class: &str, method: &str) -> BTreeSet<String> {
        let root = match self.frame(class, class, method) {
            Some(root) => root,
            None => return BTreeSet::new(),
        };
        if let Some(known) = self.memo.get(&root.key()) {
            return known.clone();
        }
        if self.config.max_call_depth == 0 {
            return BTreeSet::new();
        }

        let (nodes, truncated) = self.collect_graph(root);
        let results = self.propagate(&nodes);
        log::debug!("{}::{}() reaches {} method bodies", class, method, nodes.len());

        let outcomes = results.first().cloned().unwrap_or_default();
        if truncated {
            log::warn!(
                "call depth ceiling ({}) reached below {}::{}(); deeper calls are not followed",
                self.config.max_call_depth,
                class,
                method
            );
        } else {
            for (node, result) in nodes.into_iter().zip(results) {
                self.memo.insert(node.key, result);
            }
        }
        outcomes
    }

    /// Look `method` up on `lookup_class` and bind `$this` to `this_class`
    fn frame(&self, this_class: &str, lookup_class: &str, method: &str) -> Option<Frame<'a>> {
        let index = self.index;
        match index.method(lookup_class, method) {
            Some(info) => Some(Frame { this_class: this_class.to_string(), info }),
            None => {
                log::debug!("no method {}::{}(), call contributes nothing", lookup_class, method);
                None
            }
        }
    }

    /// Bodies reachable from `root` within the depth ceiling, root first.
    /// The flag is set when a call was dropped at the ceiling.
    fn collect_graph(&mut self, root: Frame<'a>) -> (Vec<Node>, bool) {
        let max_depth = self.config.max_call_depth;
        let mut positions: HashMap<CallKey, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        let mut nodes = Vec::new();
        let mut truncated = false;

        positions.insert(root.key(), 0);
        queue.push_back((root, 0usize));
        while let Some((frame, depth)) = queue.pop_front() {
            let key = frame.key();
            let summary = self.summary(&key, &frame);
            let mut edges = Vec::new();
            for site in &summary.calls {
                let callee = match self.frame(&site.this_class, &site.lookup_class, &site.method) {
                    Some(callee) => callee,
                    None => continue,
                };
                let callee_key = callee.key();
                let target = if let Some(known) = self.memo.get(&callee_key) {
                    EdgeTarget::Settled(known.clone())
                } else if let Some(&position) = positions.get(&callee_key) {
                    EdgeTarget::Node(position)
                } else if depth + 1 >= max_depth {
                    truncated = true;
                    continue;
                } else {
                    let position = positions.len();
                    positions.insert(callee_key, position);
                    queue.push_back((callee, depth + 1));
                    EdgeTarget::Node(position)
                };
                edges.push(Edge { target, caught: site.caught.clone() });
            }
            nodes.push(Node { key, raised: summary.raised.clone(), edges });
        }
        (nodes, truncated)
    }

    /// Push outcomes along call edges until every node is stable
    fn propagate(&self, nodes: &[Node]) -> Vec<BTreeSet<String>> {
        let index = self.index;
        let mut results: Vec<BTreeSet<String>> = nodes.iter().map(|node| node.raised.clone()).collect();
        loop {
            let mut changed = false;
            for (position, node) in nodes.iter().enumerate() {
                let mut gained = Vec::new();
                for edge in &node.edges {
                    let source = match &edge.target {
                        EdgeTarget::Node(target) => &results[*target],
                        EdgeTarget::Settled(outcomes) => outcomes,
                    };
                    gained.extend(
                        source
                            .iter()
                            .filter(|outcome| !results[position].contains(*outcome))
                            .filter(|outcome| !is_caught(index, outcome, &edge.caught))
                            .cloned(),
                    );
                }
                if !gained.is_empty() {
                    results[position].extend(gained);
                    changed = true;
                }
            }
            if !changed {
                return results;
            }
        }
    }

    fn summary(&mut self, key: &CallKey, frame: &Frame<'a>) -> Rc<BodySummary> {
        if let Some(summary) = self.summaries.get(key) {
            return Rc::clone(summary);
        }
        let summary = Rc::new(self.scan_method(frame));
        self.summaries.insert(key.clone(), Rc::clone(&summary));
        summary
    }

    fn scan_method(&self, frame: &Frame<'a>) -> BodySummary {
        let info = frame.info;
        let file = match &info.file {
            Some(file) => file,
            None => return BodySummary::default(),
        };
        let parsed = match self.cache.parse(file) {
            Some(parsed) => parsed,
            None => return BodySummary::default(),
        };
        let body = match parsed.ast.find_method(&info.source_owner, &info.name).and_then(|m| m.body.as_ref()) {
            Some(body) => body,
            None => return BodySummary::default(),
        };

        let index = self.index;
        let mut locals = HashMap::new();
        for param in &info.params {
            if let Some(sig) = &param.type_sig {
                let classes: Vec<String> = sig
                    .class_names()
                    .into_iter()
                    .filter(|name| index.contains(name))
                    .map(str::to_string)
                    .collect();
                if !classes.is_empty() {
                    locals.insert(param.name.clone(), classes);
                }
            }
        }

        let mut scanner = BodyScanner {
            index,
            honor_catch_blocks: self.config.honor_catch_blocks,
            this_class: frame.this_class.clone(),
            self_class: info.declaring_class.clone(),
            parent: index.get(&info.declaring_class).and_then(|c| c.parent.clone()),
            locals,
            catch_vars: Vec::new(),
            guards: Vec::new(),
            summary: BodySummary::default(),
        };
        scanner.visit_block(body);
        scanner.summary
    }
}

fn canonical(index: &ClassIndex, name: &str) -> String {
    let name = name.trim_start_matches('\\');
    index.get(name).map_or_else(|| name.to_string(), |c| c.name.clone())
}

fn is_caught(index: &ClassIndex, outcome: &str, caught: &[String]) -> bool {
    caught.iter().any(|c| index.is_subtype(outcome, c))
}

struct BodyScanner<'a> {
    index: &'a ClassIndex,
    honor_catch_blocks: bool,
    this_class: String,
    self_class: String,
    parent: Option<String>,
    /// Variables whose class is known: parameter types and `$x = new Foo`
    locals: HashMap<String, Vec<String>>,
    /// Enclosing catch bindings, innermost last; `None` once reassigned
    catch_vars: Vec<(String, Option<Vec<String>>)>,
    /// Catch types of the enclosing `try` bodies when catch blocks are honored
    guards: Vec<Vec<String>>,
    summary: BodySummary,
}

impl BodyScanner<'_> {
    fn class_of(&self, class: &ClassRef) -> Option<String> {
        match class {
            ClassRef::Named(name) => Some(name.fq().to_string()),
            ClassRef::SelfRef(_) => Some(self.self_class.clone()),
            ClassRef::StaticRef(_) => Some(self.this_class.clone()),
            ClassRef::ParentRef(_) => self.parent.clone(),
            ClassRef::Dynamic(_) | ClassRef::Anonymous(_) => None,
        }
    }

    fn raise(&mut self, class: &str) {
        let class = canonical(self.index, class);
        if self.guards.iter().any(|caught| is_caught(self.index, &class, caught)) {
            log::debug!("{} raised in {} is handled by an enclosing catch", class, self.self_class);
            return;
        }
        self.summary.raised.insert(class);
    }

    fn record_throw(&mut self, value: &Expr) {
        match value {
            Expr::New(new) => match self.class_of(&new.class) {
                Some(class) => self.raise(&class),
                None => log::debug!("raise of a dynamic or anonymous class in {}", self.self_class),
            },
            Expr::Variable(var, _) => {
                let binding = self.catch_vars.iter().rev().find(|(name, _)| name == var).cloned();
                match binding {
                    Some((_, Some(types))) => {
                        for class in &types {
                            self.raise(class);
                        }
                    }
                    Some((_, None)) => log::debug!("${} was reassigned after being caught, re-raise not tracked", var),
                    None => log::debug!("raise of ${} with unknown type in {}", var, self.self_class),
                }
            }
            _ => log::debug!("raise of a computed value in {} not tracked", self.self_class),
        }
    }

    fn forget(&mut self, var: &str) {
        self.locals.remove(var);
        for (name, types) in self.catch_vars.iter_mut() {
            if name == var {
                *types = None;
            }
        }
    }

    fn follow(&mut self, this_class: &str, lookup_class: &str, method: &str) {
        self.summary.calls.push(CallSite {
            this_class: this_class.to_string(),
            lookup_class: lookup_class.to_string(),
            method: method.to_string(),
            caught: self.guards.concat(),
        });
    }

    fn method_call(&mut self, call: &MethodCallExpr) {
        let method = match call.method.as_ident() {
            Some(method) => method,
            None => {
                log::debug!("dynamic method name in {}, call skipped", self.self_class);
                return;
            }
        };
        if call.first_class {
            log::debug!("{}(...) creates a closure in {}, not followed", method, self.self_class);
            return;
        }
        match call.target.as_ref() {
            Expr::Variable(var, _) if var == "this" => {
                let this_class = self.this_class.clone();
                self.follow(&this_class, &this_class, method);
            }
            Expr::Variable(var, _) => match self.locals.get(var).cloned() {
                Some(classes) => {
                    for class in classes {
                        self.follow(&class, &class, method);
                    }
                }
                None => log::debug!("type of ${} unknown, call to {}() skipped", var, method),
            },
            Expr::New(new) => match self.class_of(&new.class) {
                Some(class) => self.follow(&class, &class, method),
                None => log::debug!("call to {}() on an anonymous or dynamic instance skipped", method),
            },
            _ => log::debug!("receiver of {}() not statically known, call skipped", method),
        }
    }

    fn static_call(&mut self, call: &StaticCallExpr) {
        let method = match call.method.as_ident() {
            Some(method) => method,
            None => return,
        };
        if call.first_class {
            log::debug!("::{}(...) creates a closure in {}, not followed", method, self.self_class);
            return;
        }
        let this_class = self.this_class.clone();
        match &call.class {
            ClassRef::Named(name) => {
                let class = name.fq().to_string();
                self.follow(&class, &class, method);
            }
            ClassRef::SelfRef(_) => {
                let self_class = self.self_class.clone();
                self.follow(&this_class, &self_class, method);
            }
            ClassRef::StaticRef(_) => self.follow(&this_class, &this_class, method),
            ClassRef::ParentRef(_) => match self.parent.clone() {
                Some(parent) => self.follow(&this_class, &parent, method),
                None => log::debug!("parent::{}() in {} which has no parent", method, self.self_class),
            },
            ClassRef::Dynamic(_) | ClassRef::Anonymous(_) => {
                log::debug!("static call to {}() on a dynamic class skipped", method)
            }
        }
    }

    fn visit_try(&mut self, try_stmt: &TryStmt) {
        if self.honor_catch_blocks {
            let caught = try_stmt
                .catches
                .iter()
                .flat_map(|clause| &clause.types)
                .map(|caught| caught.fq().to_string())
                .collect();
            self.guards.push(caught);
            self.visit_block(&try_stmt.body);
            self.guards.pop();
        } else {
            self.visit_block(&try_stmt.body);
        }

        for clause in &try_stmt.catches {
            self.visit_catch(clause);
        }
        if let Some(finally) = &try_stmt.finally {
            self.visit_block(finally);
        }
    }
}

impl Visitor for BodyScanner<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Throw(value, _) => {
                self.record_throw(value);
                walk_expr(self, value);
            }
            Stmt::Try(try_stmt) => self.visit_try(try_stmt),
            Stmt::Foreach { subject, key, value, body, .. } => {
                self.visit_expr(subject);
                for target in key.iter().chain(Some(value)) {
                    if let Expr::Variable(var, _) = target {
                        self.forget(var);
                    }
                }
                self.visit_stmt(body);
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_catch(&mut self, clause: &CatchClause) {
        match &clause.var {
            Some(var) => {
                let types = clause.types.iter().map(|t| t.fq().to_string()).collect();
                self.locals.remove(var);
                self.catch_vars.push((var.clone(), Some(types)));
                self.visit_block(&clause.body);
                self.catch_vars.pop();
            }
            None => self.visit_block(&clause.body),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Throw(value, _) => {
                self.record_throw(value);
                walk_expr(self, value);
            }
            Expr::MethodCall(call) => {
                walk_expr(self, expr);
                self.method_call(call);
            }
            Expr::StaticCall(call) => {
                walk_expr(self, expr);
                self.static_call(call);
            }
            Expr::Assign { target, op, value, .. } => {
                self.visit_expr(value);
                if let Expr::Variable(var, _) = target.as_ref() {
                    let constructed = match (op, value.as_ref()) {
                        (AssignOp::Assign, Expr::New(new)) => self.class_of(&new.class),
                        _ => None,
                    };
                    self.forget(var);
                    if let Some(class) = constructed {
                        self.locals.insert(var.clone(), vec![class]);
                    }
                } else {
                    self.visit_expr(target);
                }
            }
            _ => walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ast_cache::MemorySourceLoader;

    fn throws_of(source: &str, class: &str, method: &str, config: Config) -> Vec<String> {
        let loader = MemorySourceLoader::new().with_file("src.php", source);
        let paths = loader.paths();
        let cache = AstCache::new(loader);
        let index = ClassIndex::build(&paths, &cache);
        let mut resolver = ThrowsResolver::new(&index, &cache, &config);
        resolver.method_throws(class, method).into_iter().collect()
    }

    #[test]
    fn test_direct_and_expression_throws() {
        let source = r#"<?php
namespace App;
use InvalidArgumentException as Invalid;
class Guard {
    public function check($v) {
        if (!$v) { throw new Invalid('empty'); }
        $x = $v ?? throw new \LogicException();
        throw new self();
    }
}
"#;
        let found = throws_of(source, "App\\Guard", "check", Config::default());
        assert_eq!(found, vec!["App\\Guard", "InvalidArgumentException", "LogicException"]);
    }

    #[test]
    fn test_closures_and_nested_functions_are_not_scanned() {
        let source = r#"<?php
class Lazy {
    public function make() {
        $f = function () { throw new RuntimeException(); };
        $g = fn() => throw new LogicException();
        return $f;
    }
}
"#;
        assert!(throws_of(source, "Lazy", "make", Config::default()).is_empty());
    }

    #[test]
    fn test_honor_catch_blocks_drops_handled_outcomes() {
        let source = r#"<?php
class Careful {
    public function run() {
        try {
            throw new OutOfBoundsException();
            throw new LogicException();
        } catch (RuntimeException $e) {
            log($e);
        }
    }
}
"#;
        let literal = throws_of(source, "Careful", "run", Config::default());
        assert_eq!(literal, vec!["LogicException", "OutOfBoundsException"]);

        let honoring = throws_of(source, "Careful", "run", Config::default().with_honor_catch_blocks(true));
        assert_eq!(honoring, vec!["LogicException"]);
    }

    #[test]
    fn test_local_assignment_from_other_values_clears_type() {
        let source = r#"<?php
class Worker { public function go() { throw new RuntimeException(); } }
class Boss {
    public function delegate() {
        $w = new Worker();
        $w = $this->pick();
        $w->go();
    }
    private function pick() { return null; }
}
"#;
        assert!(throws_of(source, "Boss", "delegate", Config::default()).is_empty());
    }
}
