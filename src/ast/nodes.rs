use super::{AstNode, Span};
use std::fmt;

/// A class, interface, function or constant name as written, plus its
/// fully-qualified form once the resolution pass has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub raw: String,
    pub resolved: Option<String>,
    pub span: Span,
}

impl Name {
    pub fn new(raw: impl Into<String>, span: Span) -> Self {
        Self { raw: raw.into(), resolved: None, span }
    }

    /// Fully-qualified name without the leading `\`, falling back to the raw text
    pub fn fq(&self) -> &str {
        match &self.resolved {
            Some(resolved) => resolved,
            None => self.raw.trim_start_matches('\\'),
        }
    }

    /// Case-insensitive match against a reserved word such as `self`
    pub fn is_special(&self, word: &str) -> bool {
        self.raw.eq_ignore_ascii_case(word)
    }
}

impl AstNode for Name {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fq())
    }
}

// Namespaces and imports
#[derive(Debug, Clone)]
pub struct NamespaceBlock {
    /// `None` for the global namespace
    pub name: Option<String>,
    pub uses: Vec<UseDecl>,
    pub types: Vec<TypeDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Class,
    Function,
    Const,
}

#[derive(Debug, Clone)]
pub struct UseDecl {
    pub kind: UseKind,
    /// Imported name without leading `\`
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

impl UseDecl {
    /// The short name the import binds in this file
    pub fn binding(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.name.rsplit('\\').next().unwrap_or(&self.name),
        }
    }
}

impl fmt::Display for UseDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "use {} as {};", self.name, alias),
            None => write!(f, "use {};", self.name),
        }
    }
}

// Type declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Trait => "trait",
            TypeKind::Enum => "enum",
        };
        f.write_str(word)
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    /// Fully-qualified name, filled in by the resolution pass
    pub fq_name: String,
    pub modifiers: Vec<Modifier>,
    /// Parent class for classes; parent interfaces for interfaces
    pub extends: Vec<Name>,
    pub implements: Vec<Name>,
    pub traits: Vec<Name>,
    pub methods: Vec<MethodDecl>,
    pub doc: Option<String>,
    pub span: Span,
}

impl TypeDecl {
    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(&Modifier::Abstract)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

impl AstNode for TypeDecl {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.fq_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Abstract,
    Final,
    Static,
    Readonly,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub doc: Option<String>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub by_ref: bool,
    /// `None` for abstract and interface methods
    pub body: Option<Block>,
    pub span: Span,
}

impl MethodDecl {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }
}

impl AstNode for MethodDecl {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")?;
        if let Some(ret) = &self.return_type {
            write!(f, ": {}", ret)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub by_ref: bool,
    pub variadic: bool,
    /// Constructor property promotion modifiers
    pub promoted: Vec<Modifier>,
    pub span: Span,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(hint) = &self.type_hint {
            write!(f, "{} ", hint)?;
        }
        if self.variadic {
            write!(f, "...")?;
        }
        write!(f, "${}", self.name)
    }
}

/// Declared type of a parameter, return value or property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Named(Name),
    Nullable(Box<TypeHint>),
    Union(Vec<TypeHint>),
    Intersection(Vec<TypeHint>),
}

impl TypeHint {
    /// Every class-like name mentioned by the hint
    pub fn names(&self) -> Vec<&Name> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a Name>) {
        match self {
            TypeHint::Named(name) => out.push(name),
            TypeHint::Nullable(inner) => inner.collect_names(out),
            TypeHint::Union(members) | TypeHint::Intersection(members) => {
                for member in members {
                    member.collect_names(out);
                }
            }
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Named(name) => write!(f, "{}", name),
            TypeHint::Nullable(inner) => write!(f, "?{}", inner),
            TypeHint::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", parts.join("|"))
            }
            TypeHint::Intersection(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", parts.join("&"))
            }
        }
    }
}

// Statements
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Block(Block),
    Return(Option<Expr>, Span),
    Throw(Expr, Span),
    If(IfStmt),
    While { condition: Expr, body: Box<Stmt>, span: Span },
    DoWhile { body: Box<Stmt>, condition: Expr, span: Span },
    For { init: Vec<Expr>, condition: Vec<Expr>, step: Vec<Expr>, body: Box<Stmt>, span: Span },
    Foreach { subject: Expr, key: Option<Expr>, value: Expr, body: Box<Stmt>, span: Span },
    Switch { subject: Expr, cases: Vec<SwitchCase>, span: Span },
    Try(TryStmt),
    Echo(Vec<Expr>, Span),
    Unset(Vec<Expr>, Span),
    Global(Vec<String>, Span),
    StaticVars(Vec<(String, Option<Expr>)>, Span),
    Break(Span),
    Continue(Span),
    /// Nested function or class declarations; their bodies are not part of the enclosing method
    Declaration(Span),
    Nop(Span),
}

impl AstNode for Stmt {
    fn span(&self) -> Span {
        match self {
            Stmt::Expr(e) => e.span(),
            Stmt::Block(b) => b.span,
            Stmt::If(i) => i.span,
            Stmt::Try(t) => t.span,
            Stmt::Return(_, span)
            | Stmt::Throw(_, span)
            | Stmt::Echo(_, span)
            | Stmt::Unset(_, span)
            | Stmt::Global(_, span)
            | Stmt::StaticVars(_, span)
            | Stmt::Break(span)
            | Stmt::Continue(span)
            | Stmt::Declaration(span)
            | Stmt::Nop(span) => *span,
            Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Foreach { span, .. }
            | Stmt::Switch { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_ifs: Vec<(Expr, Stmt)>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub label: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub types: Vec<Name>,
    /// Variable name without `$`; PHP 8 allows catching without a binding
    pub var: Option<String>,
    pub body: Block,
    pub span: Span,
}

// Expressions
#[derive(Debug, Clone)]
pub enum Expr {
    Variable(String, Span),
    /// `$$name` or `${expr}`
    DynamicVariable(Box<Expr>, Span),
    Literal(Literal, Span),
    /// Bare constant or function name
    Name(Name),
    Array(Vec<ArrayItem>, Span),
    New(NewExpr),
    Clone(Box<Expr>, Span),
    MethodCall(MethodCallExpr),
    StaticCall(StaticCallExpr),
    Call { callee: Box<Expr>, args: Vec<Arg>, span: Span },
    PropertyFetch { target: Box<Expr>, property: MemberName, nullsafe: bool, span: Span },
    StaticPropertyFetch { class: ClassRef, property: String, span: Span },
    ClassConst { class: ClassRef, constant: String, span: Span },
    Index { target: Box<Expr>, index: Option<Box<Expr>>, span: Span },
    Assign { target: Box<Expr>, op: AssignOp, value: Box<Expr>, span: Span },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    Unary { op: UnaryOp, expr: Box<Expr>, span: Span },
    Ternary { condition: Box<Expr>, then_expr: Option<Box<Expr>>, else_expr: Box<Expr>, span: Span },
    InstanceOf { expr: Box<Expr>, class: ClassRef, span: Span },
    Cast { kind: String, expr: Box<Expr>, span: Span },
    Isset(Vec<Expr>, Span),
    Empty(Box<Expr>, Span),
    Include(Box<Expr>, Span),
    Print(Box<Expr>, Span),
    Throw(Box<Expr>, Span),
    Yield { key: Option<Box<Expr>>, value: Option<Box<Expr>>, from: bool, span: Span },
    Match { subject: Box<Expr>, arms: Vec<MatchArm>, span: Span },
    /// Closures and arrow functions; their bodies only run when invoked
    Closure(Span),
    /// `list(...)` destructuring target
    List(Vec<ArrayItem>, Span),
}

impl AstNode for Expr {
    fn span(&self) -> Span {
        match self {
            Expr::Name(name) => name.span,
            Expr::New(new) => new.span,
            Expr::MethodCall(call) => call.span,
            Expr::StaticCall(call) => call.span,
            Expr::Variable(_, span)
            | Expr::DynamicVariable(_, span)
            | Expr::Literal(_, span)
            | Expr::Array(_, span)
            | Expr::Clone(_, span)
            | Expr::Isset(_, span)
            | Expr::Empty(_, span)
            | Expr::Include(_, span)
            | Expr::Print(_, span)
            | Expr::Throw(_, span)
            | Expr::Closure(span)
            | Expr::List(_, span) => *span,
            Expr::Call { span, .. }
            | Expr::PropertyFetch { span, .. }
            | Expr::StaticPropertyFetch { span, .. }
            | Expr::ClassConst { span, .. }
            | Expr::Index { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::InstanceOf { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Yield { span, .. }
            | Expr::Match { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(String),
}

#[derive(Debug, Clone)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
    pub spread: bool,
}

#[derive(Debug, Clone)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
    pub spread: bool,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    /// `None` for the `default` arm
    pub conditions: Option<Vec<Expr>>,
    pub body: Expr,
}

/// Class operand of `new`, `::` and `instanceof`
#[derive(Debug, Clone)]
pub enum ClassRef {
    Named(Name),
    SelfRef(Span),
    StaticRef(Span),
    ParentRef(Span),
    Dynamic(Box<Expr>),
    /// `new class(...) { ... }`
    Anonymous(Span),
}

/// Member name after `->` or `::`
#[derive(Debug, Clone)]
pub enum MemberName {
    Ident(String),
    Dynamic(Box<Expr>),
}

impl MemberName {
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            MemberName::Ident(name) => Some(name),
            MemberName::Dynamic(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewExpr {
    pub class: ClassRef,
    pub args: Vec<Arg>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodCallExpr {
    pub target: Box<Expr>,
    pub method: MemberName,
    pub args: Vec<Arg>,
    /// `$obj->m(...)` creates a closure instead of calling
    pub first_class: bool,
    pub nullsafe: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StaticCallExpr {
    pub class: ClassRef,
    pub method: MemberName,
    pub args: Vec<Arg>,
    pub first_class: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AssignRef,
    Plus,
    Minus,
    Mul,
    Div,
    Concat,
    Mod,
    Pow,
    Coalesce,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Identical,
    NotIdentical,
    Lt,
    Le,
    Gt,
    Ge,
    Spaceship,
    And,
    Or,
    Xor,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Silence,
    Ref,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}
