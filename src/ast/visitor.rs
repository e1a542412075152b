use super::*;

/// Read-only AST visitor.
///
/// Every method defaults to the matching `walk_*` function, so an
/// implementation overrides only the nodes it cares about and calls back
/// into `walk_*` to keep descending.
pub trait Visitor {
    fn visit_type_decl(&mut self, type_decl: &TypeDecl) {
        walk_type_decl(self, type_decl)
    }

    fn visit_method_decl(&mut self, method: &MethodDecl) {
        walk_method_decl(self, method)
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt)
    }

    fn visit_catch(&mut self, clause: &CatchClause) {
        walk_catch(self, clause)
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr)
    }

    fn visit_class_ref(&mut self, class: &ClassRef) {
        walk_class_ref(self, class)
    }
}

pub fn walk_ast<V: Visitor + ?Sized>(visitor: &mut V, ast: &Ast) {
    for type_decl in ast.types() {
        visitor.visit_type_decl(type_decl);
    }
}

pub fn walk_type_decl<V: Visitor + ?Sized>(visitor: &mut V, type_decl: &TypeDecl) {
    for method in &type_decl.methods {
        visitor.visit_method_decl(method);
    }
}

pub fn walk_method_decl<V: Visitor + ?Sized>(visitor: &mut V, method: &MethodDecl) {
    for param in &method.params {
        if let Some(default) = &param.default {
            visitor.visit_expr(default);
        }
    }
    if let Some(body) = &method.body {
        visitor.visit_block(body);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for stmt in &block.statements {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Expr(expr) => visitor.visit_expr(expr),
        Stmt::Block(block) => visitor.visit_block(block),
        Stmt::Return(value, _) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Throw(value, _) => visitor.visit_expr(value),
        Stmt::If(if_stmt) => {
            visitor.visit_expr(&if_stmt.condition);
            visitor.visit_stmt(&if_stmt.then_branch);
            for (condition, branch) in &if_stmt.else_ifs {
                visitor.visit_expr(condition);
                visitor.visit_stmt(branch);
            }
            if let Some(else_branch) = &if_stmt.else_branch {
                visitor.visit_stmt(else_branch);
            }
        }
        Stmt::While { condition, body, .. } => {
            visitor.visit_expr(condition);
            visitor.visit_stmt(body);
        }
        Stmt::DoWhile { body, condition, .. } => {
            visitor.visit_stmt(body);
            visitor.visit_expr(condition);
        }
        Stmt::For { init, condition, step, body, .. } => {
            for expr in init.iter().chain(condition).chain(step) {
                visitor.visit_expr(expr);
            }
            visitor.visit_stmt(body);
        }
        Stmt::Foreach { subject, key, value, body, .. } => {
            visitor.visit_expr(subject);
            if let Some(key) = key {
                visitor.visit_expr(key);
            }
            visitor.visit_expr(value);
            visitor.visit_stmt(body);
        }
        Stmt::Switch { subject, cases, .. } => {
            visitor.visit_expr(subject);
            for case in cases {
                if let Some(label) = &case.label {
                    visitor.visit_expr(label);
                }
                for stmt in &case.body {
                    visitor.visit_stmt(stmt);
                }
            }
        }
        Stmt::Try(try_stmt) => {
            visitor.visit_block(&try_stmt.body);
            for clause in &try_stmt.catches {
                visitor.visit_catch(clause);
            }
            if let Some(finally) = &try_stmt.finally {
                visitor.visit_block(finally);
            }
        }
        Stmt::Echo(exprs, _) | Stmt::Unset(exprs, _) => {
            for expr in exprs {
                visitor.visit_expr(expr);
            }
        }
        Stmt::StaticVars(vars, _) => {
            for (_, init) in vars {
                if let Some(init) = init {
                    visitor.visit_expr(init);
                }
            }
        }
        Stmt::Global(..)
        | Stmt::Break(_)
        | Stmt::Continue(_)
        | Stmt::Declaration(_)
        | Stmt::Nop(_) => {}
    }
}

pub fn walk_catch<V: Visitor + ?Sized>(visitor: &mut V, clause: &CatchClause) {
    visitor.visit_block(&clause.body);
}

pub fn walk_class_ref<V: Visitor + ?Sized>(visitor: &mut V, class: &ClassRef) {
    if let ClassRef::Dynamic(expr) = class {
        visitor.visit_expr(expr);
    }
}

fn walk_args<V: Visitor + ?Sized>(visitor: &mut V, args: &[Arg]) {
    for arg in args {
        visitor.visit_expr(&arg.value);
    }
}

fn walk_items<V: Visitor + ?Sized>(visitor: &mut V, items: &[ArrayItem]) {
    for item in items {
        if let Some(key) = &item.key {
            visitor.visit_expr(key);
        }
        visitor.visit_expr(&item.value);
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Variable(..) | Expr::Literal(..) | Expr::Name(_) | Expr::Closure(_) => {}
        Expr::DynamicVariable(inner, _)
        | Expr::Clone(inner, _)
        | Expr::Empty(inner, _)
        | Expr::Include(inner, _)
        | Expr::Print(inner, _)
        | Expr::Throw(inner, _) => visitor.visit_expr(inner),
        Expr::Array(items, _) | Expr::List(items, _) => walk_items(visitor, items),
        Expr::New(new) => {
            visitor.visit_class_ref(&new.class);
            walk_args(visitor, &new.args);
        }
        Expr::MethodCall(call) => {
            visitor.visit_expr(&call.target);
            if let MemberName::Dynamic(name) = &call.method {
                visitor.visit_expr(name);
            }
            walk_args(visitor, &call.args);
        }
        Expr::StaticCall(call) => {
            visitor.visit_class_ref(&call.class);
            if let MemberName::Dynamic(name) = &call.method {
                visitor.visit_expr(name);
            }
            walk_args(visitor, &call.args);
        }
        Expr::Call { callee, args, .. } => {
            visitor.visit_expr(callee);
            walk_args(visitor, args);
        }
        Expr::PropertyFetch { target, property, .. } => {
            visitor.visit_expr(target);
            if let MemberName::Dynamic(name) = property {
                visitor.visit_expr(name);
            }
        }
        Expr::StaticPropertyFetch { class, .. } | Expr::ClassConst { class, .. } => {
            visitor.visit_class_ref(class);
        }
        Expr::Index { target, index, .. } => {
            visitor.visit_expr(target);
            if let Some(index) = index {
                visitor.visit_expr(index);
            }
        }
        Expr::Assign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Expr::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => visitor.visit_expr(expr),
        Expr::Ternary { condition, then_expr, else_expr, .. } => {
            visitor.visit_expr(condition);
            if let Some(then_expr) = then_expr {
                visitor.visit_expr(then_expr);
            }
            visitor.visit_expr(else_expr);
        }
        Expr::InstanceOf { expr, class, .. } => {
            visitor.visit_expr(expr);
            visitor.visit_class_ref(class);
        }
        Expr::Isset(exprs, _) => {
            for expr in exprs {
                visitor.visit_expr(expr);
            }
        }
        Expr::Yield { key, value, .. } => {
            if let Some(key) = key {
                visitor.visit_expr(key);
            }
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Expr::Match { subject, arms, .. } => {
            visitor.visit_expr(subject);
            for arm in arms {
                if let Some(conditions) = &arm.conditions {
                    for condition in conditions {
                        visitor.visit_expr(condition);
                    }
                }
                visitor.visit_expr(&arm.body);
            }
        }
    }
}
