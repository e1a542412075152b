//! Parser implementation for PHP sources
//!
//! Recursive descent over the token stream for declarations and statements,
//! with a binding-power loop for expressions. Constructs the auditor never
//! inspects (closures, anonymous classes, nested functions) are parsed for
//! validity and reduced to spans.

use super::error::{ParseError, ParseResult};
use super::lexer::{Lexer, LexicalToken, Token};
use super::span::{Location, Span};
use crate::ast::*;

const CAST_TYPES: &[&str] = &[
    "int", "integer", "bool", "boolean", "float", "double", "real",
    "string", "array", "object", "unset", "binary",
];

// Binding powers, lowest first
const ASSIGN_BP: u8 = 4;
const TERNARY_BP: u8 = 5;
const NOT_BP: u8 = 19;
const INSTANCEOF_BP: u8 = 20;
const UNARY_BP: u8 = 21;
const CLONE_BP: u8 = 23;

/// Parse source text into an AST with unresolved names
pub fn parse(source: &str) -> ParseResult<Ast> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

/// Parser for PHP sources
pub struct Parser {
    tokens: Vec<LexicalToken>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<LexicalToken>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse the token stream into an AST
    pub fn parse(mut self) -> ParseResult<Ast> {
        let start = self.current_location();
        let mut namespaces = Vec::new();
        let mut block = empty_namespace(None, start);

        while !self.is_at_end() {
            if self.check(&Token::Namespace) {
                let ns_start = self.current_location();
                self.advance();
                let name = if self.check(&Token::Name) {
                    Some(self.advance_lexeme().trim_start_matches('\\').to_string())
                } else {
                    None
                };

                let finished = std::mem::replace(&mut block, empty_namespace(name.clone(), ns_start));
                push_namespace(&mut namespaces, finished, self.previous_end(), false);

                if self.match_token(&Token::LBrace) {
                    while !self.check(&Token::RBrace) {
                        if self.is_at_end() {
                            return Err(self.error_expected("'}' closing namespace"));
                        }
                        self.parse_top_level_item(&mut block)?;
                    }
                    self.consume(&Token::RBrace, "'}' closing namespace")?;
                    let braced = std::mem::replace(&mut block, empty_namespace(None, self.current_location()));
                    push_namespace(&mut namespaces, braced, self.previous_end(), true);
                } else {
                    self.consume(&Token::Semicolon, "';' after namespace name")?;
                }
                continue;
            }
            self.parse_top_level_item(&mut block)?;
        }

        let keep_empty = namespaces.is_empty();
        push_namespace(&mut namespaces, block, self.previous_end(), keep_empty);

        Ok(Ast {
            namespaces,
            names_resolved: false,
            span: self.span_from(start),
        })
    }

    fn parse_top_level_item(&mut self, block: &mut NamespaceBlock) -> ParseResult<()> {
        let doc = self.peek_doc();
        self.skip_attributes()?;
        if self.at_type_decl() {
            let doc = doc.or_else(|| self.peek_doc());
            let decl = self.parse_type_decl(doc)?;
            block.types.push(decl);
            return Ok(());
        }
        match self.peek_kind() {
            Some(Token::Use) => {
                let uses = self.parse_use_decl()?;
                block.uses.extend(uses);
            }
            Some(Token::Const) => self.skip_statement()?,
            _ => {
                self.parse_statement()?;
            }
        }
        Ok(())
    }

    // Helper methods
    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&LexicalToken> {
        self.tokens.get(self.current)
    }

    fn peek_kind(&self) -> Option<Token> {
        self.peek().map(|t| t.token)
    }

    fn peek_kind_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.current + n).map(|t| t.token)
    }

    fn peek_doc(&self) -> Option<String> {
        self.peek().and_then(|t| t.doc.clone())
    }

    fn check(&self, token_type: &Token) -> bool {
        self.peek_kind() == Some(*token_type)
    }

    fn check_at(&self, n: usize, token_type: &Token) -> bool {
        self.peek_kind_at(n) == Some(*token_type)
    }

    fn check_word(&self, word: &str) -> bool {
        self.peek()
            .map_or(false, |t| t.token == Token::Name && t.lexeme.eq_ignore_ascii_case(word))
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn advance_lexeme(&mut self) -> String {
        let lexeme = self.peek().map(|t| t.lexeme.clone()).unwrap_or_default();
        self.advance();
        lexeme
    }

    fn match_token(&mut self, token_type: &Token) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, token_type: &Token, expected: &str) -> ParseResult<LexicalToken> {
        match self.peek() {
            Some(token) if token.token == *token_type => {
                let token = token.clone();
                self.advance();
                Ok(token)
            }
            _ => Err(self.error_expected(expected)),
        }
    }

    fn error_expected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::unexpected_token(expected, &token.lexeme, token.location),
            None => ParseError::unexpected_end_of_input(expected, self.previous_end()),
        }
    }

    fn current_location(&self) -> Location {
        self.peek().map(|t| t.location).unwrap_or_else(|| self.previous_end())
    }

    /// Location just past the previously consumed token
    fn previous_end(&self) -> Location {
        if self.current == 0 {
            return self.tokens.first().map(|t| t.location).unwrap_or_else(Location::start);
        }
        let previous = &self.tokens[self.current - 1];
        let mut location = previous.location;
        location.advance_str(&previous.lexeme);
        location
    }

    fn span_from(&self, start: Location) -> Span {
        Span::new(start, self.previous_end())
    }

    /// Plain identifier; keywords are accepted because PHP allows them as member names
    fn peek_is_identifier(&self) -> bool {
        self.peek().map_or(false, |t| {
            (t.token == Token::Name && !t.lexeme.contains('\\')) || t.token.is_keyword()
        })
    }

    fn parse_identifier(&mut self, expected: &str) -> ParseResult<String> {
        if self.peek_is_identifier() {
            Ok(self.advance_lexeme())
        } else {
            Err(self.error_expected(expected))
        }
    }

    fn parse_name(&mut self) -> ParseResult<Name> {
        let start = self.current_location();
        let token = self.consume(&Token::Name, "name")?;
        Ok(Name::new(token.lexeme, self.span_from(start)))
    }

    fn parse_name_list(&mut self) -> ParseResult<Vec<Name>> {
        let mut names = vec![self.parse_name()?];
        while self.match_token(&Token::Comma) {
            names.push(self.parse_name()?);
        }
        Ok(names)
    }

    /// Skip tokens up to the matching `close`; the opener is already consumed
    fn skip_balanced(&mut self, close: Token) -> ParseResult<()> {
        let mut depth = 0usize;
        loop {
            let kind = match self.peek_kind() {
                Some(kind) => kind,
                None => return Err(self.error_expected(&format!("{:?}", close))),
            };
            match kind {
                Token::LParen | Token::LBracket | Token::LBrace | Token::AttributeStart => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    if depth == 0 {
                        if kind != close {
                            return Err(self.error_expected(&format!("{:?}", close)));
                        }
                        self.advance();
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to and past the next `;` at bracket depth zero
    fn skip_statement(&mut self) -> ParseResult<()> {
        loop {
            match self.peek_kind() {
                None => return Err(self.error_expected("';'")),
                Some(Token::Semicolon) => {
                    self.advance();
                    return Ok(());
                }
                Some(Token::LParen) => {
                    self.advance();
                    self.skip_balanced(Token::RParen)?;
                }
                Some(Token::LBracket) | Some(Token::AttributeStart) => {
                    self.advance();
                    self.skip_balanced(Token::RBracket)?;
                }
                Some(Token::LBrace) => {
                    self.advance();
                    self.skip_balanced(Token::RBrace)?;
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn skip_attributes(&mut self) -> ParseResult<()> {
        while self.match_token(&Token::AttributeStart) {
            self.skip_balanced(Token::RBracket)?;
        }
        Ok(())
    }

    // Declarations
    fn parse_use_decl(&mut self) -> ParseResult<Vec<UseDecl>> {
        let start = self.current_location();
        self.consume(&Token::Use, "'use'")?;
        let kind = self.parse_use_kind(UseKind::Class);

        let mut uses = Vec::new();
        loop {
            let prefix = self.consume(&Token::Name, "imported name")?.lexeme;
            let prefix = prefix.trim_start_matches('\\').to_string();
            if self.check(&Token::Backslash) && self.check_at(1, &Token::LBrace) {
                self.advance();
                self.advance();
                while !self.check(&Token::RBrace) {
                    let item_kind = self.parse_use_kind(kind);
                    let part = self.consume(&Token::Name, "imported name")?.lexeme;
                    let alias = self.parse_use_alias()?;
                    uses.push(UseDecl {
                        kind: item_kind,
                        name: format!("{}\\{}", prefix, part.trim_start_matches('\\')),
                        alias,
                        span: self.span_from(start),
                    });
                    if !self.match_token(&Token::Comma) {
                        break;
                    }
                }
                self.consume(&Token::RBrace, "'}' closing group use")?;
            } else {
                let alias = self.parse_use_alias()?;
                uses.push(UseDecl { kind, name: prefix, alias, span: self.span_from(start) });
            }
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.consume(&Token::Semicolon, "';' after use")?;
        Ok(uses)
    }

    fn parse_use_kind(&mut self, default: UseKind) -> UseKind {
        if self.match_token(&Token::Function) {
            UseKind::Function
        } else if self.match_token(&Token::Const) {
            UseKind::Const
        } else {
            default
        }
    }

    fn parse_use_alias(&mut self) -> ParseResult<Option<String>> {
        if self.match_token(&Token::As) {
            Ok(Some(self.parse_identifier("alias after 'as'")?))
        } else {
            Ok(None)
        }
    }

    fn at_type_decl(&self) -> bool {
        let mut i = 0;
        while matches!(
            self.peek_kind_at(i),
            Some(Token::Abstract) | Some(Token::Final) | Some(Token::Readonly)
        ) {
            i += 1;
        }
        match self.peek_kind_at(i) {
            Some(Token::Class) | Some(Token::Interface) | Some(Token::Trait) => true,
            Some(Token::Name) => {
                self.tokens[self.current + i].lexeme.eq_ignore_ascii_case("enum")
                    && self.check_at(i + 1, &Token::Name)
            }
            _ => false,
        }
    }

    fn parse_type_decl(&mut self, doc: Option<String>) -> ParseResult<TypeDecl> {
        let start = self.current_location();

        let mut modifiers = Vec::new();
        loop {
            let modifier = match self.peek_kind() {
                Some(Token::Abstract) => Modifier::Abstract,
                Some(Token::Final) => Modifier::Final,
                Some(Token::Readonly) => Modifier::Readonly,
                _ => break,
            };
            modifiers.push(modifier);
            self.advance();
        }

        let kind = match self.peek_kind() {
            Some(Token::Class) => TypeKind::Class,
            Some(Token::Interface) => TypeKind::Interface,
            Some(Token::Trait) => TypeKind::Trait,
            Some(Token::Name) if self.check_word("enum") => TypeKind::Enum,
            _ => return Err(self.error_expected("type declaration")),
        };
        self.advance();

        let name = self.parse_identifier("type name")?;
        if kind == TypeKind::Enum && self.match_token(&Token::Colon) {
            self.parse_type_hint()?;
        }

        let extends = if self.match_token(&Token::Extends) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };
        let implements = if self.match_token(&Token::Implements) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };

        let (methods, traits) = self.parse_class_body()?;

        Ok(TypeDecl {
            kind,
            fq_name: name.clone(),
            name,
            modifiers,
            extends,
            implements,
            traits,
            methods,
            doc,
            span: self.span_from(start),
        })
    }

    fn parse_class_body(&mut self) -> ParseResult<(Vec<MethodDecl>, Vec<Name>)> {
        self.consume(&Token::LBrace, "'{' opening class body")?;
        let mut methods = Vec::new();
        let mut traits = Vec::new();

        while !self.match_token(&Token::RBrace) {
            if self.is_at_end() {
                return Err(self.error_expected("'}' closing class body"));
            }
            let member_start = self.current_location();
            let mut doc = self.peek_doc();
            self.skip_attributes()?;
            if doc.is_none() {
                doc = self.peek_doc();
            }

            match self.peek_kind() {
                Some(Token::Use) => {
                    self.advance();
                    traits.extend(self.parse_name_list()?);
                    if self.match_token(&Token::LBrace) {
                        self.skip_balanced(Token::RBrace)?;
                    } else {
                        self.consume(&Token::Semicolon, "';' after trait use")?;
                    }
                    continue;
                }
                Some(Token::Case) => {
                    self.skip_statement()?;
                    continue;
                }
                _ => {}
            }

            let mut modifiers = Vec::new();
            loop {
                let modifier = match self.peek_kind() {
                    Some(Token::Public) => Some(Modifier::Public),
                    Some(Token::Protected) => Some(Modifier::Protected),
                    Some(Token::Private) => Some(Modifier::Private),
                    Some(Token::Abstract) => Some(Modifier::Abstract),
                    Some(Token::Final) => Some(Modifier::Final),
                    Some(Token::Static) => Some(Modifier::Static),
                    Some(Token::Readonly) => Some(Modifier::Readonly),
                    Some(Token::Var) => None,
                    _ => break,
                };
                modifiers.extend(modifier);
                self.advance();
            }

            if self.check(&Token::Function) {
                methods.push(self.parse_method(modifiers, doc, member_start)?);
            } else {
                // constants and properties
                self.skip_statement()?;
            }
        }

        Ok((methods, traits))
    }

    fn parse_method(&mut self, modifiers: Vec<Modifier>, doc: Option<String>, start: Location) -> ParseResult<MethodDecl> {
        self.consume(&Token::Function, "'function'")?;
        let by_ref = self.match_token(&Token::Amp);
        let name = self.parse_identifier("method name")?;
        let params = self.parse_params()?;
        let return_type = if self.match_token(&Token::Colon) {
            Some(self.parse_type_hint()?)
        } else {
            None
        };
        let body = if self.check(&Token::LBrace) {
            Some(self.parse_block()?)
        } else {
            self.consume(&Token::Semicolon, "';' or method body")?;
            None
        };

        Ok(MethodDecl {
            name,
            modifiers,
            doc,
            params,
            return_type,
            by_ref,
            body,
            span: self.span_from(start),
        })
    }

    /// Named function declaration; only validated
    fn parse_function_decl(&mut self) -> ParseResult<()> {
        self.consume(&Token::Function, "'function'")?;
        self.match_token(&Token::Amp);
        self.parse_identifier("function name")?;
        self.parse_params()?;
        if self.match_token(&Token::Colon) {
            self.parse_type_hint()?;
        }
        self.parse_block()?;
        Ok(())
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.consume(&Token::LParen, "'(' opening parameter list")?;
        let mut params = Vec::new();

        while !self.check(&Token::RParen) {
            let start = self.current_location();
            self.skip_attributes()?;

            let mut promoted = Vec::new();
            loop {
                let modifier = match self.peek_kind() {
                    Some(Token::Public) => Modifier::Public,
                    Some(Token::Protected) => Modifier::Protected,
                    Some(Token::Private) => Modifier::Private,
                    Some(Token::Readonly) => Modifier::Readonly,
                    _ => break,
                };
                promoted.push(modifier);
                self.advance();
            }

            let type_hint = if matches!(
                self.peek_kind(),
                Some(Token::Variable) | Some(Token::Amp) | Some(Token::Ellipsis)
            ) {
                None
            } else {
                Some(self.parse_type_hint()?)
            };
            let by_ref = self.match_token(&Token::Amp);
            let variadic = self.match_token(&Token::Ellipsis);
            let variable = self.consume(&Token::Variable, "parameter variable")?;
            let default = if self.match_token(&Token::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };

            params.push(Param {
                name: variable.lexeme[1..].to_string(),
                type_hint,
                default,
                by_ref,
                variadic,
                promoted,
                span: self.span_from(start),
            });

            if !self.match_token(&Token::Comma) {
                break;
            }
        }

        self.consume(&Token::RParen, "')' closing parameter list")?;
        Ok(params)
    }

    // Types
    fn parse_type_hint(&mut self) -> ParseResult<TypeHint> {
        if self.match_token(&Token::Question) {
            let inner = self.parse_type_atom()?;
            return Ok(TypeHint::Nullable(Box::new(inner)));
        }
        let first = self.parse_type_term()?;
        if !self.check(&Token::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.match_token(&Token::Pipe) {
            members.push(self.parse_type_term()?);
        }
        Ok(TypeHint::Union(members))
    }

    /// A single atom, an intersection, or a parenthesised DNF group
    fn parse_type_term(&mut self) -> ParseResult<TypeHint> {
        if self.match_token(&Token::LParen) {
            let group = self.parse_intersection()?;
            self.consume(&Token::RParen, "')' closing type group")?;
            return Ok(group);
        }
        self.parse_intersection()
    }

    fn parse_intersection(&mut self) -> ParseResult<TypeHint> {
        let first = self.parse_type_atom()?;
        if !(self.check(&Token::Amp) && self.type_atom_follows(1)) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.check(&Token::Amp) && self.type_atom_follows(1) {
            self.advance();
            members.push(self.parse_type_atom()?);
        }
        Ok(TypeHint::Intersection(members))
    }

    fn type_atom_follows(&self, n: usize) -> bool {
        matches!(
            self.peek_kind_at(n),
            Some(Token::Name) | Some(Token::Array) | Some(Token::Static)
        )
    }

    fn parse_type_atom(&mut self) -> ParseResult<TypeHint> {
        let start = self.current_location();
        match self.peek_kind() {
            Some(Token::Name) | Some(Token::Array) | Some(Token::Static) => {
                let lexeme = self.advance_lexeme();
                Ok(TypeHint::Named(Name::new(lexeme, self.span_from(start))))
            }
            _ => Err(self.error_expected("type")),
        }
    }

    // Statements
    fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.current_location();
        self.consume(&Token::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_at_end() {
                return Err(self.error_expected("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        self.consume(&Token::RBrace, "'}'")?;
        Ok(Block { statements, span: self.span_from(start) })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_location();
        self.skip_attributes()?;

        if self.at_type_decl() {
            let doc = self.peek_doc();
            self.parse_type_decl(doc)?;
            return Ok(Stmt::Declaration(self.span_from(start)));
        }

        let kind = match self.peek_kind() {
            Some(kind) => kind,
            None => return Err(self.error_expected("statement")),
        };

        match kind {
            Token::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            Token::Semicolon => {
                self.advance();
                Ok(Stmt::Nop(self.span_from(start)))
            }
            Token::If => self.parse_if(),
            Token::While => {
                self.advance();
                let condition = self.parse_paren_expr()?;
                let body = self.parse_control_body()?;
                Ok(Stmt::While { condition, body: Box::new(body), span: self.span_from(start) })
            }
            Token::Do => {
                self.advance();
                let body = self.parse_statement()?;
                self.consume(&Token::While, "'while' after do body")?;
                let condition = self.parse_paren_expr()?;
                self.end_statement()?;
                Ok(Stmt::DoWhile { body: Box::new(body), condition, span: self.span_from(start) })
            }
            Token::For => {
                self.advance();
                self.consume(&Token::LParen, "'(' after for")?;
                let init = self.parse_expr_list(Token::Semicolon)?;
                self.consume(&Token::Semicolon, "';' in for")?;
                let condition = self.parse_expr_list(Token::Semicolon)?;
                self.consume(&Token::Semicolon, "';' in for")?;
                let step = self.parse_expr_list(Token::RParen)?;
                self.consume(&Token::RParen, "')' closing for")?;
                let body = self.parse_control_body()?;
                Ok(Stmt::For { init, condition, step, body: Box::new(body), span: self.span_from(start) })
            }
            Token::Foreach => {
                self.advance();
                self.consume(&Token::LParen, "'(' after foreach")?;
                let subject = self.parse_expr()?;
                self.consume(&Token::As, "'as' in foreach")?;
                let first = self.parse_expr()?;
                let (key, value) = if self.match_token(&Token::DoubleArrow) {
                    (Some(first), self.parse_expr()?)
                } else {
                    (None, first)
                };
                self.consume(&Token::RParen, "')' closing foreach")?;
                let body = self.parse_control_body()?;
                Ok(Stmt::Foreach { subject, key, value, body: Box::new(body), span: self.span_from(start) })
            }
            Token::Switch => self.parse_switch(),
            Token::Try => self.parse_try(),
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.end_statement()?;
                Ok(Stmt::Return(value, self.span_from(start)))
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expr()?;
                self.end_statement()?;
                Ok(Stmt::Throw(value, self.span_from(start)))
            }
            Token::Echo => {
                self.advance();
                let mut exprs = vec![self.parse_expr()?];
                while self.match_token(&Token::Comma) {
                    exprs.push(self.parse_expr()?);
                }
                self.end_statement()?;
                Ok(Stmt::Echo(exprs, self.span_from(start)))
            }
            Token::Unset => {
                self.advance();
                self.consume(&Token::LParen, "'(' after unset")?;
                let exprs = self.parse_expr_list(Token::RParen)?;
                self.consume(&Token::RParen, "')' closing unset")?;
                self.end_statement()?;
                Ok(Stmt::Unset(exprs, self.span_from(start)))
            }
            Token::Global => {
                self.advance();
                let mut names = Vec::new();
                loop {
                    let variable = self.consume(&Token::Variable, "variable after global")?;
                    names.push(variable.lexeme[1..].to_string());
                    if !self.match_token(&Token::Comma) {
                        break;
                    }
                }
                self.end_statement()?;
                Ok(Stmt::Global(names, self.span_from(start)))
            }
            Token::Static if self.check_at(1, &Token::Variable) => {
                self.advance();
                let mut vars = Vec::new();
                loop {
                    let variable = self.consume(&Token::Variable, "static variable")?;
                    let init = if self.match_token(&Token::Assign) {
                        Some(self.parse_expr()?)
                    } else {
                        None
                    };
                    vars.push((variable.lexeme[1..].to_string(), init));
                    if !self.match_token(&Token::Comma) {
                        break;
                    }
                }
                self.end_statement()?;
                Ok(Stmt::StaticVars(vars, self.span_from(start)))
            }
            Token::Break | Token::Continue => {
                self.advance();
                self.match_token(&Token::Number);
                self.end_statement()?;
                let span = self.span_from(start);
                Ok(if kind == Token::Break { Stmt::Break(span) } else { Stmt::Continue(span) })
            }
            Token::Function
                if self.check_at(1, &Token::Name)
                    || (self.check_at(1, &Token::Amp) && self.check_at(2, &Token::Name)) =>
            {
                self.parse_function_decl()?;
                Ok(Stmt::Declaration(self.span_from(start)))
            }
            Token::Declare => {
                self.advance();
                self.consume(&Token::LParen, "'(' after declare")?;
                self.skip_balanced(Token::RParen)?;
                if self.check(&Token::LBrace) {
                    return Ok(Stmt::Block(self.parse_block()?));
                }
                self.end_statement()?;
                Ok(Stmt::Nop(self.span_from(start)))
            }
            Token::Name if self.check_at(1, &Token::Colon) => {
                // goto label
                self.advance();
                self.advance();
                Ok(Stmt::Nop(self.span_from(start)))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn end_statement(&mut self) -> ParseResult<()> {
        self.consume(&Token::Semicolon, "';'")?;
        Ok(())
    }

    /// Body of a control structure; the `:`/`endif` alternative syntax is rejected
    fn parse_control_body(&mut self) -> ParseResult<Stmt> {
        if self.check(&Token::Colon) {
            return Err(ParseError::invalid_syntax(
                "alternative control structure syntax is not supported",
                self.current_location(),
            ));
        }
        self.parse_statement()
    }

    fn parse_paren_expr(&mut self) -> ParseResult<Expr> {
        self.consume(&Token::LParen, "'('")?;
        let expr = self.parse_expr()?;
        self.consume(&Token::RParen, "')'")?;
        Ok(expr)
    }

    fn parse_expr_list(&mut self, terminator: Token) -> ParseResult<Vec<Expr>> {
        let mut exprs = Vec::new();
        while !self.check(&terminator) {
            exprs.push(self.parse_expr()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.current_location();
        self.consume(&Token::If, "'if'")?;
        let condition = self.parse_paren_expr()?;
        let then_branch = self.parse_control_body()?;

        let mut else_ifs = Vec::new();
        let mut else_branch = None;
        loop {
            if self.match_token(&Token::ElseIf) {
                let condition = self.parse_paren_expr()?;
                let branch = self.parse_control_body()?;
                else_ifs.push((condition, branch));
            } else if self.match_token(&Token::Else) {
                let branch = if self.check(&Token::If) {
                    self.parse_if()?
                } else {
                    self.parse_control_body()?
                };
                else_branch = Some(Box::new(branch));
                break;
            } else {
                break;
            }
        }

        Ok(Stmt::If(IfStmt {
            condition,
            then_branch: Box::new(then_branch),
            else_ifs,
            else_branch,
            span: self.span_from(start),
        }))
    }

    fn parse_switch(&mut self) -> ParseResult<Stmt> {
        let start = self.current_location();
        self.consume(&Token::Switch, "'switch'")?;
        let subject = self.parse_paren_expr()?;
        if self.check(&Token::Colon) {
            return Err(ParseError::invalid_syntax(
                "alternative control structure syntax is not supported",
                self.current_location(),
            ));
        }
        self.consume(&Token::LBrace, "'{' opening switch")?;

        let mut cases = Vec::new();
        while !self.match_token(&Token::RBrace) {
            let label = if self.match_token(&Token::Case) {
                Some(self.parse_expr()?)
            } else {
                self.consume(&Token::Default, "'case' or 'default'")?;
                None
            };
            if !self.match_token(&Token::Colon) {
                self.consume(&Token::Semicolon, "':' after case label")?;
            }
            let mut body = Vec::new();
            while !matches!(
                self.peek_kind(),
                Some(Token::Case) | Some(Token::Default) | Some(Token::RBrace) | None
            ) {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { label, body });
        }

        Ok(Stmt::Switch { subject, cases, span: self.span_from(start) })
    }

    fn parse_try(&mut self) -> ParseResult<Stmt> {
        let start = self.current_location();
        self.consume(&Token::Try, "'try'")?;
        let body = self.parse_block()?;

        let mut catches = Vec::new();
        while self.check(&Token::Catch) {
            let catch_start = self.current_location();
            self.advance();
            self.consume(&Token::LParen, "'(' after catch")?;
            let mut types = vec![self.parse_name()?];
            while self.match_token(&Token::Pipe) {
                types.push(self.parse_name()?);
            }
            let var = if self.check(&Token::Variable) {
                Some(self.advance_lexeme()[1..].to_string())
            } else {
                None
            };
            self.consume(&Token::RParen, "')' closing catch")?;
            let body = self.parse_block()?;
            catches.push(CatchClause { types, var, body, span: self.span_from(catch_start) });
        }

        let finally = if self.match_token(&Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if catches.is_empty() && finally.is_none() {
            return Err(self.error_expected("'catch' or 'finally'"));
        }

        Ok(Stmt::Try(TryStmt { body, catches, finally, span: self.span_from(start) }))
    }

    // Expressions
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let start = self.current_location();
        let mut lhs = self.parse_unary()?;

        loop {
            let kind = match self.peek_kind() {
                Some(kind) => kind,
                None => break,
            };

            // Assignment binds to any writable operand regardless of the
            // surrounding precedence, as in `!$x = f()`.
            if let Some(op) = assign_op(kind) {
                if !is_assignable(&lhs) {
                    break;
                }
                self.advance();
                let op = if op == AssignOp::Assign && self.match_token(&Token::Amp) {
                    AssignOp::AssignRef
                } else {
                    op
                };
                let value = self.parse_expr_bp(ASSIGN_BP)?;
                lhs = Expr::Assign {
                    target: Box::new(lhs),
                    op,
                    value: Box::new(value),
                    span: self.span_from(start),
                };
                continue;
            }

            if kind == Token::Question {
                if TERNARY_BP < min_bp {
                    break;
                }
                self.advance();
                let then_expr = if self.match_token(&Token::Colon) {
                    None
                } else {
                    let then_expr = self.parse_expr()?;
                    self.consume(&Token::Colon, "':' in ternary")?;
                    Some(Box::new(then_expr))
                };
                let else_expr = self.parse_expr_bp(TERNARY_BP + 1)?;
                lhs = Expr::Ternary {
                    condition: Box::new(lhs),
                    then_expr,
                    else_expr: Box::new(else_expr),
                    span: self.span_from(start),
                };
                continue;
            }

            if kind == Token::InstanceOf {
                if INSTANCEOF_BP < min_bp {
                    break;
                }
                self.advance();
                let class = self.parse_instanceof_class()?;
                lhs = Expr::InstanceOf { expr: Box::new(lhs), class, span: self.span_from(start) };
                continue;
            }

            match binary_op(kind) {
                Some((lbp, right_assoc, op)) if lbp >= min_bp => {
                    self.advance();
                    let rbp = if right_assoc { lbp } else { lbp + 1 };
                    let rhs = self.parse_expr_bp(rbp)?;
                    lhs = Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        span: self.span_from(start),
                    };
                }
                _ => break,
            }
        }

        Ok(lhs)
    }

    fn parse_instanceof_class(&mut self) -> ParseResult<ClassRef> {
        match self.peek_kind() {
            Some(Token::Name) => Ok(class_ref_from_name(self.parse_name()?)),
            Some(Token::Static) => {
                let start = self.current_location();
                self.advance();
                Ok(ClassRef::StaticRef(self.span_from(start)))
            }
            _ => Ok(ClassRef::Dynamic(Box::new(self.parse_expr_bp(CLONE_BP)?))),
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();

        if let Some(kind) = self.cast_ahead() {
            self.advance();
            self.advance();
            self.advance();
            let expr = self.parse_expr_bp(UNARY_BP)?;
            return Ok(Expr::Cast { kind, expr: Box::new(expr), span: self.span_from(start) });
        }

        let prefix = match self.peek_kind() {
            Some(Token::Bang) => Some((UnaryOp::Not, NOT_BP)),
            Some(Token::Minus) => Some((UnaryOp::Neg, UNARY_BP)),
            Some(Token::Plus) => Some((UnaryOp::Plus, UNARY_BP)),
            Some(Token::Tilde) => Some((UnaryOp::BitNot, UNARY_BP)),
            Some(Token::At) => Some((UnaryOp::Silence, UNARY_BP)),
            Some(Token::Amp) => Some((UnaryOp::Ref, UNARY_BP)),
            Some(Token::Inc) => Some((UnaryOp::PreInc, UNARY_BP)),
            Some(Token::Dec) => Some((UnaryOp::PreDec, UNARY_BP)),
            _ => None,
        };
        if let Some((op, bp)) = prefix {
            self.advance();
            let expr = self.parse_expr_bp(bp)?;
            return Ok(Expr::Unary { op, expr: Box::new(expr), span: self.span_from(start) });
        }

        match self.peek_kind() {
            Some(Token::Clone) => {
                self.advance();
                let expr = self.parse_expr_bp(CLONE_BP)?;
                Ok(Expr::Clone(Box::new(expr), self.span_from(start)))
            }
            Some(Token::Print) => {
                self.advance();
                let expr = self.parse_expr_bp(ASSIGN_BP)?;
                Ok(Expr::Print(Box::new(expr), self.span_from(start)))
            }
            Some(Token::Throw) => {
                self.advance();
                let expr = self.parse_expr()?;
                Ok(Expr::Throw(Box::new(expr), self.span_from(start)))
            }
            Some(Token::Include) | Some(Token::IncludeOnce) | Some(Token::Require) | Some(Token::RequireOnce) => {
                self.advance();
                let expr = self.parse_expr_bp(ASSIGN_BP)?;
                Ok(Expr::Include(Box::new(expr), self.span_from(start)))
            }
            Some(Token::Yield) => self.parse_yield(),
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn cast_ahead(&self) -> Option<String> {
        if !self.check(&Token::LParen) || !self.check_at(2, &Token::RParen) {
            return None;
        }
        let token = self.tokens.get(self.current + 1)?;
        if !matches!(token.token, Token::Name | Token::Array) {
            return None;
        }
        let lower = token.lexeme.to_ascii_lowercase();
        CAST_TYPES.contains(&lower.as_str()).then_some(lower)
    }

    fn parse_yield(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        self.consume(&Token::Yield, "'yield'")?;
        if self.check_word("from") {
            self.advance();
            let value = self.parse_expr_bp(ASSIGN_BP)?;
            return Ok(Expr::Yield { key: None, value: Some(Box::new(value)), from: true, span: self.span_from(start) });
        }
        if matches!(
            self.peek_kind(),
            None | Some(Token::Semicolon) | Some(Token::RParen) | Some(Token::Comma) | Some(Token::RBracket)
        ) {
            return Ok(Expr::Yield { key: None, value: None, from: false, span: self.span_from(start) });
        }
        let first = self.parse_expr_bp(TERNARY_BP)?;
        let (key, value) = if self.match_token(&Token::DoubleArrow) {
            (Some(Box::new(first)), self.parse_expr_bp(TERNARY_BP)?)
        } else {
            (None, first)
        };
        Ok(Expr::Yield { key, value: Some(Box::new(value)), from: false, span: self.span_from(start) })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        let kind = match self.peek_kind() {
            Some(kind) => kind,
            None => return Err(self.error_expected("expression")),
        };

        match kind {
            Token::Variable => {
                let lexeme = self.advance_lexeme();
                Ok(Expr::Variable(lexeme[1..].to_string(), self.span_from(start)))
            }
            Token::Dollar => {
                self.advance();
                let inner = if self.match_token(&Token::LBrace) {
                    let inner = self.parse_expr()?;
                    self.consume(&Token::RBrace, "'}'")?;
                    inner
                } else {
                    self.parse_primary()?
                };
                Ok(Expr::DynamicVariable(Box::new(inner), self.span_from(start)))
            }
            Token::Number => {
                let lexeme = self.advance_lexeme();
                Ok(Expr::Literal(Literal::Number(lexeme), self.span_from(start)))
            }
            Token::StringLiteral | Token::Heredoc => {
                let lexeme = self.advance_lexeme();
                Ok(Expr::Literal(Literal::String(lexeme), self.span_from(start)))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.consume(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_array_items(Token::RBracket)?;
                Ok(Expr::Array(items, self.span_from(start)))
            }
            Token::Array if self.check_at(1, &Token::LParen) => {
                self.advance();
                self.advance();
                let items = self.parse_array_items(Token::RParen)?;
                Ok(Expr::Array(items, self.span_from(start)))
            }
            Token::List => {
                self.advance();
                self.consume(&Token::LParen, "'(' after list")?;
                let items = self.parse_array_items(Token::RParen)?;
                Ok(Expr::List(items, self.span_from(start)))
            }
            Token::Isset => {
                self.advance();
                self.consume(&Token::LParen, "'(' after isset")?;
                let exprs = self.parse_expr_list(Token::RParen)?;
                self.consume(&Token::RParen, "')' closing isset")?;
                Ok(Expr::Isset(exprs, self.span_from(start)))
            }
            Token::Empty => {
                self.advance();
                let expr = self.parse_paren_expr()?;
                Ok(Expr::Empty(Box::new(expr), self.span_from(start)))
            }
            Token::Match => self.parse_match(),
            Token::New => self.parse_new(),
            Token::Function | Token::Fn => self.parse_closure(),
            Token::Static => {
                if matches!(self.peek_kind_at(1), Some(Token::Function) | Some(Token::Fn)) {
                    return self.parse_closure();
                }
                self.advance();
                Ok(Expr::Name(Name::new("static", self.span_from(start))))
            }
            Token::Name => Ok(Expr::Name(self.parse_name()?)),
            _ => Err(self.error_expected("expression")),
        }
    }

    fn parse_array_items(&mut self, close: Token) -> ParseResult<Vec<ArrayItem>> {
        let mut items = Vec::new();
        loop {
            if self.match_token(&close) {
                break;
            }
            if self.match_token(&Token::Comma) {
                // skipped destructuring slot
                continue;
            }
            let spread = self.match_token(&Token::Ellipsis);
            let first = self.parse_expr()?;
            let item = if self.match_token(&Token::DoubleArrow) {
                let by_ref = self.match_token(&Token::Amp);
                let value = self.parse_expr()?;
                ArrayItem { key: Some(first), value, by_ref, spread }
            } else {
                ArrayItem { key: None, value: first, by_ref: false, spread }
            };
            items.push(item);
            if !self.match_token(&Token::Comma) {
                self.consume(&close, "end of array")?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_match(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        self.consume(&Token::Match, "'match'")?;
        let subject = self.parse_paren_expr()?;
        self.consume(&Token::LBrace, "'{' opening match")?;

        let mut arms = Vec::new();
        while !self.match_token(&Token::RBrace) {
            let conditions = if self.match_token(&Token::Default) {
                None
            } else {
                let mut conditions = vec![self.parse_expr()?];
                while self.match_token(&Token::Comma) {
                    if self.check(&Token::DoubleArrow) {
                        break;
                    }
                    conditions.push(self.parse_expr()?);
                }
                Some(conditions)
            };
            self.consume(&Token::DoubleArrow, "'=>' in match arm")?;
            let body = self.parse_expr()?;
            arms.push(MatchArm { conditions, body });
            if !self.match_token(&Token::Comma) {
                self.consume(&Token::RBrace, "'}' closing match")?;
                break;
            }
        }

        Ok(Expr::Match { subject: Box::new(subject), arms, span: self.span_from(start) })
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        self.consume(&Token::New, "'new'")?;

        if self.match_token(&Token::Class) {
            let args = if self.check(&Token::LParen) {
                self.parse_args()?
            } else {
                Vec::new()
            };
            if self.match_token(&Token::Extends) {
                self.parse_name_list()?;
            }
            if self.match_token(&Token::Implements) {
                self.parse_name_list()?;
            }
            self.parse_class_body()?;
            let span = self.span_from(start);
            return Ok(Expr::New(NewExpr { class: ClassRef::Anonymous(span), args, span }));
        }

        let class = match self.peek_kind() {
            Some(Token::Name) => class_ref_from_name(self.parse_name()?),
            Some(Token::Static) => {
                let static_start = self.current_location();
                self.advance();
                ClassRef::StaticRef(self.span_from(static_start))
            }
            Some(Token::LParen) => ClassRef::Dynamic(Box::new(self.parse_paren_expr()?)),
            Some(Token::Variable) | Some(Token::Dollar) => {
                ClassRef::Dynamic(Box::new(self.parse_new_class_expr()?))
            }
            _ => return Err(self.error_expected("class name after 'new'")),
        };
        let args = if self.check(&Token::LParen) {
            self.parse_args()?
        } else {
            Vec::new()
        };

        Ok(Expr::New(NewExpr { class, args, span: self.span_from(start) }))
    }

    /// Class expression after `new`: a variable with property, static property
    /// or index accesses but no calls
    fn parse_new_class_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                Some(Token::Arrow) | Some(Token::NullsafeArrow) => {
                    let nullsafe = self.check(&Token::NullsafeArrow);
                    self.advance();
                    let property = self.parse_member_name()?;
                    expr = Expr::PropertyFetch { target: Box::new(expr), property, nullsafe, span: self.span_from(start) };
                }
                Some(Token::DoubleColon) if self.check_at(1, &Token::Variable) => {
                    self.advance();
                    let property = self.advance_lexeme()[1..].to_string();
                    expr = Expr::StaticPropertyFetch {
                        class: ClassRef::Dynamic(Box::new(expr)),
                        property,
                        span: self.span_from(start),
                    };
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.consume(&Token::RBracket, "']'")?;
                    expr = Expr::Index { target: Box::new(expr), index: Some(Box::new(index)), span: self.span_from(start) };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_closure(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        self.match_token(&Token::Static);

        if self.match_token(&Token::Fn) {
            self.match_token(&Token::Amp);
            self.parse_params()?;
            if self.match_token(&Token::Colon) {
                self.parse_type_hint()?;
            }
            self.consume(&Token::DoubleArrow, "'=>' in arrow function")?;
            self.parse_expr()?;
            return Ok(Expr::Closure(self.span_from(start)));
        }

        self.consume(&Token::Function, "'function'")?;
        self.match_token(&Token::Amp);
        self.parse_params()?;
        if self.match_token(&Token::Use) {
            self.consume(&Token::LParen, "'(' after use")?;
            while !self.check(&Token::RParen) {
                self.match_token(&Token::Amp);
                self.consume(&Token::Variable, "captured variable")?;
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
            self.consume(&Token::RParen, "')' closing use")?;
        }
        if self.match_token(&Token::Colon) {
            self.parse_type_hint()?;
        }
        self.parse_block()?;
        Ok(Expr::Closure(self.span_from(start)))
    }

    fn parse_args(&mut self) -> ParseResult<Vec<Arg>> {
        self.parse_call_args().map(|(args, _)| args)
    }

    /// Argument list of a call; the flag is set for the callable-creation form `f(...)`
    fn parse_call_args(&mut self) -> ParseResult<(Vec<Arg>, bool)> {
        self.consume(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        let mut first_class = false;
        while !self.check(&Token::RParen) {
            if args.is_empty() && self.check(&Token::Ellipsis) && self.check_at(1, &Token::RParen) {
                self.advance();
                first_class = true;
                break;
            }
            let spread = self.match_token(&Token::Ellipsis);
            let name = if self.peek_is_identifier() && self.check_at(1, &Token::Colon) {
                let name = self.parse_identifier("argument name")?;
                self.advance();
                Some(name)
            } else {
                None
            };
            let value = self.parse_expr()?;
            args.push(Arg { name, value, spread });
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.consume(&Token::RParen, "')' closing arguments")?;
        Ok((args, first_class))
    }

    fn parse_member_name(&mut self) -> ParseResult<MemberName> {
        let start = self.current_location();
        match self.peek_kind() {
            Some(Token::Variable) => {
                let lexeme = self.advance_lexeme();
                Ok(MemberName::Dynamic(Box::new(Expr::Variable(lexeme[1..].to_string(), self.span_from(start)))))
            }
            Some(Token::LBrace) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.consume(&Token::RBrace, "'}'")?;
                Ok(MemberName::Dynamic(Box::new(expr)))
            }
            _ => Ok(MemberName::Ident(self.parse_identifier("member name")?)),
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        let start = expr.span().start;
        loop {
            match self.peek_kind() {
                Some(Token::Arrow) | Some(Token::NullsafeArrow) => {
                    let nullsafe = self.check(&Token::NullsafeArrow);
                    self.advance();
                    let member = self.parse_member_name()?;
                    expr = if self.check(&Token::LParen) {
                        let (args, first_class) = self.parse_call_args()?;
                        Expr::MethodCall(MethodCallExpr {
                            target: Box::new(expr),
                            method: member,
                            args,
                            first_class,
                            nullsafe,
                            span: self.span_from(start),
                        })
                    } else {
                        Expr::PropertyFetch {
                            target: Box::new(expr),
                            property: member,
                            nullsafe,
                            span: self.span_from(start),
                        }
                    };
                }
                Some(Token::DoubleColon) => {
                    self.advance();
                    let class = match expr {
                        Expr::Name(name) => class_ref_from_name(name),
                        other => ClassRef::Dynamic(Box::new(other)),
                    };
                    expr = self.parse_static_member(class, start)?;
                }
                Some(Token::LParen) => {
                    let args = self.parse_args()?;
                    expr = Expr::Call { callee: Box::new(expr), args, span: self.span_from(start) };
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = if self.check(&Token::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    self.consume(&Token::RBracket, "']'")?;
                    expr = Expr::Index { target: Box::new(expr), index, span: self.span_from(start) };
                }
                Some(Token::Inc) | Some(Token::Dec) => {
                    let op = if self.check(&Token::Inc) { UnaryOp::PostInc } else { UnaryOp::PostDec };
                    self.advance();
                    expr = Expr::Unary { op, expr: Box::new(expr), span: self.span_from(start) };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Member access after `Class::`
    fn parse_static_member(&mut self, class: ClassRef, start: Location) -> ParseResult<Expr> {
        let member_start = self.current_location();
        match self.peek_kind() {
            Some(Token::Variable) => {
                let property = self.advance_lexeme()[1..].to_string();
                if self.check(&Token::LParen) {
                    let method = MemberName::Dynamic(Box::new(Expr::Variable(property, self.span_from(member_start))));
                    let (args, first_class) = self.parse_call_args()?;
                    return Ok(Expr::StaticCall(StaticCallExpr {
                        class,
                        method,
                        args,
                        first_class,
                        span: self.span_from(start),
                    }));
                }
                Ok(Expr::StaticPropertyFetch { class, property, span: self.span_from(start) })
            }
            Some(Token::LBrace) => {
                self.advance();
                let name = self.parse_expr()?;
                self.consume(&Token::RBrace, "'}'")?;
                let (args, first_class) = self.parse_call_args()?;
                Ok(Expr::StaticCall(StaticCallExpr {
                    class,
                    method: MemberName::Dynamic(Box::new(name)),
                    args,
                    first_class,
                    span: self.span_from(start),
                }))
            }
            _ => {
                let member = self.parse_identifier("member name after '::'")?;
                if self.check(&Token::LParen) {
                    let (args, first_class) = self.parse_call_args()?;
                    Ok(Expr::StaticCall(StaticCallExpr {
                        class,
                        method: MemberName::Ident(member),
                        args,
                        first_class,
                        span: self.span_from(start),
                    }))
                } else {
                    Ok(Expr::ClassConst { class, constant: member, span: self.span_from(start) })
                }
            }
        }
    }
}

fn empty_namespace(name: Option<String>, start: Location) -> NamespaceBlock {
    NamespaceBlock { name, uses: Vec::new(), types: Vec::new(), span: Span::single(start) }
}

fn push_namespace(namespaces: &mut Vec<NamespaceBlock>, mut block: NamespaceBlock, end: Location, keep_empty: bool) {
    if keep_empty || block.name.is_some() || !block.uses.is_empty() || !block.types.is_empty() {
        block.span.end = end;
        namespaces.push(block);
    }
}

/// `self`, `static` and `parent` are reserved class references
fn class_ref_from_name(name: Name) -> ClassRef {
    if name.is_special("self") {
        ClassRef::SelfRef(name.span)
    } else if name.is_special("static") {
        ClassRef::StaticRef(name.span)
    } else if name.is_special("parent") {
        ClassRef::ParentRef(name.span)
    } else {
        ClassRef::Named(name)
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Variable(..)
            | Expr::DynamicVariable(..)
            | Expr::Index { .. }
            | Expr::PropertyFetch { .. }
            | Expr::StaticPropertyFetch { .. }
            | Expr::List(..)
            | Expr::Array(..)
    )
}

fn assign_op(kind: Token) -> Option<AssignOp> {
    let op = match kind {
        Token::Assign => AssignOp::Assign,
        Token::PlusAssign => AssignOp::Plus,
        Token::MinusAssign => AssignOp::Minus,
        Token::MulAssign => AssignOp::Mul,
        Token::DivAssign => AssignOp::Div,
        Token::ConcatAssign => AssignOp::Concat,
        Token::ModAssign => AssignOp::Mod,
        Token::PowAssign => AssignOp::Pow,
        Token::CoalesceAssign => AssignOp::Coalesce,
        Token::AndAssign => AssignOp::BitAnd,
        Token::OrAssign => AssignOp::BitOr,
        Token::XorAssign => AssignOp::BitXor,
        Token::ShlAssign => AssignOp::Shl,
        Token::ShrAssign => AssignOp::Shr,
        _ => return None,
    };
    Some(op)
}

/// (left binding power, right associative, operator)
fn binary_op(kind: Token) -> Option<(u8, bool, BinaryOp)> {
    let entry = match kind {
        Token::LogicalOr => (1, false, BinaryOp::Or),
        Token::LogicalXor => (2, false, BinaryOp::Xor),
        Token::LogicalAnd => (3, false, BinaryOp::And),
        Token::Coalesce => (7, true, BinaryOp::Coalesce),
        Token::PipePipe => (8, false, BinaryOp::Or),
        Token::AndAnd => (9, false, BinaryOp::And),
        Token::Pipe => (10, false, BinaryOp::BitOr),
        Token::Caret => (11, false, BinaryOp::BitXor),
        Token::Amp => (12, false, BinaryOp::BitAnd),
        Token::Eq => (13, false, BinaryOp::Eq),
        Token::Ne => (13, false, BinaryOp::Ne),
        Token::Identical => (13, false, BinaryOp::Identical),
        Token::NotIdentical => (13, false, BinaryOp::NotIdentical),
        Token::Spaceship => (13, false, BinaryOp::Spaceship),
        Token::Lt => (14, false, BinaryOp::Lt),
        Token::Le => (14, false, BinaryOp::Le),
        Token::Gt => (14, false, BinaryOp::Gt),
        Token::Ge => (14, false, BinaryOp::Ge),
        Token::Dot => (15, false, BinaryOp::Concat),
        Token::Shl => (16, false, BinaryOp::Shl),
        Token::Shr => (16, false, BinaryOp::Shr),
        Token::Plus => (17, false, BinaryOp::Add),
        Token::Minus => (17, false, BinaryOp::Sub),
        Token::Star => (18, false, BinaryOp::Mul),
        Token::Slash => (18, false, BinaryOp::Div),
        Token::Percent => (18, false, BinaryOp::Mod),
        Token::Pow => (22, true, BinaryOp::Pow),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Ast {
        parse(source).expect("Failed to parse")
    }

    fn first_method_body(ast: &Ast) -> &Block {
        ast.types()
            .next()
            .and_then(|t| t.methods.first())
            .and_then(|m| m.body.as_ref())
            .expect("method body")
    }

    #[test]
    fn test_namespaces_and_uses() {
        let ast = parse_ok(r#"<?php
namespace App\Service;

use App\Contracts\Store;
use App\Errors\{NotFound, Conflict as Clash};
use function strlen;

class Repo implements Store {}
"#);
        assert_eq!(ast.namespaces.len(), 1);
        let ns = &ast.namespaces[0];
        assert_eq!(ns.name.as_deref(), Some("App\\Service"));
        assert_eq!(ns.uses.len(), 4);
        assert_eq!(ns.uses[1].name, "App\\Errors\\NotFound");
        assert_eq!(ns.uses[2].binding(), "Clash");
        assert_eq!(ns.uses[3].kind, UseKind::Function);
        assert_eq!(ns.types[0].implements[0].raw, "Store");
    }

    #[test]
    fn test_braced_namespaces() {
        let ast = parse_ok("<?php namespace A { class X {} } namespace B { class Y {} }");
        assert_eq!(ast.namespaces.len(), 2);
        assert_eq!(ast.namespaces[1].name.as_deref(), Some("B"));
        assert_eq!(ast.namespaces[1].types[0].name, "Y");
    }

    #[test]
    fn test_method_signatures() {
        let ast = parse_ok(r#"<?php
abstract class Shape {
    /** @throws \RuntimeException */
    #[Pure]
    abstract public function area(int|float $scale, ?Unit $unit = null, A&B ...$rest): static;
    public function __construct(private readonly Clock $clock, &$out) {}
}
"#);
        let shape = ast.types().next().expect("type");
        assert!(shape.is_abstract());
        let area = &shape.methods[0];
        assert!(area.doc.as_deref().unwrap_or("").contains("@throws"));
        assert!(area.body.is_none());
        assert!(matches!(area.params[0].type_hint, Some(TypeHint::Union(_))));
        assert!(matches!(area.params[1].type_hint, Some(TypeHint::Nullable(_))));
        assert!(matches!(area.params[2].type_hint, Some(TypeHint::Intersection(_))));
        assert!(area.params[2].variadic);
        assert_eq!(area.return_type.as_ref().map(|t| t.to_string()).as_deref(), Some("static"));
        let ctor = &shape.methods[1];
        assert_eq!(ctor.params[0].promoted, vec![Modifier::Private, Modifier::Readonly]);
        assert!(ctor.params[1].by_ref);
    }

    #[test]
    fn test_try_catch_and_throw() {
        let ast = parse_ok(r#"<?php
class A {
    function run() {
        try {
            throw new \Domain\Failure("x");
        } catch (NotFound | Gone $e) {
            throw $e;
        } catch (\Throwable) {
        } finally {
            $this->close();
        }
    }
}
"#);
        let body = first_method_body(&ast);
        let try_stmt = match &body.statements[0] {
            Stmt::Try(t) => t,
            other => panic!("expected try, got {:?}", other),
        };
        assert_eq!(try_stmt.catches.len(), 2);
        assert_eq!(try_stmt.catches[0].types.len(), 2);
        assert_eq!(try_stmt.catches[0].var.as_deref(), Some("e"));
        assert!(try_stmt.catches[1].var.is_none());
        assert!(try_stmt.finally.is_some());
        assert!(matches!(try_stmt.body.statements[0], Stmt::Throw(Expr::New(_), _)));
    }

    #[test]
    fn test_calls_and_precedence() {
        let ast = parse_ok(r#"<?php
class A {
    function run(Reader $r) {
        $x = (new Parser($r))->parse() ?? self::fallback();
        if (!$y = $r?->next()) { return parent::run($r); }
        $z = $a . $b + 1 ** -2 instanceof Foo;
        $f = static fn(int $v): int => $v * 2;
        $m = match ($x) { 1, 2 => 'a', default => throw new Oops() };
        $list = [1, 'k' => &$v, ...$rest];
        [$p, , $q] = $pair;
    }
}
"#);
        let body = first_method_body(&ast);
        assert_eq!(body.statements.len(), 7);
        match &body.statements[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => match value.as_ref() {
                Expr::Binary { op: BinaryOp::Coalesce, lhs, rhs, .. } => {
                    assert!(matches!(lhs.as_ref(), Expr::MethodCall(_)));
                    assert!(matches!(rhs.as_ref(), Expr::StaticCall(StaticCallExpr { class: ClassRef::SelfRef(_), .. })));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
        match &body.statements[1] {
            Stmt::If(if_stmt) => assert!(matches!(
                &if_stmt.condition,
                Expr::Unary { op: UnaryOp::Not, .. }
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_first_class_callables_are_flagged() {
        let ast = parse_ok(r#"<?php
class A {
    function run() {
        $f = $this->load(...);
        $g = self::make(...);
        $this->load($spread, ...$rest);
    }
}
"#);
        let body = first_method_body(&ast);
        let assigned: Vec<&Expr> = body
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Expr(Expr::Assign { value, .. }) => Some(value.as_ref()),
                _ => None,
            })
            .collect();
        assert!(matches!(assigned[0], Expr::MethodCall(MethodCallExpr { first_class: true, .. })));
        assert!(matches!(assigned[1], Expr::StaticCall(StaticCallExpr { first_class: true, .. })));
        match &body.statements[2] {
            Stmt::Expr(Expr::MethodCall(call)) => {
                assert!(!call.first_class);
                assert_eq!(call.args.len(), 2);
                assert!(call.args[1].spread);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_interfaces_traits_and_enums() {
        let ast = parse_ok(r#"<?php
interface Store extends Reader, Writer { public function put($k, $v): void; const X = 1; }
trait Logs { public function log(string $m) { echo $m; } }
enum Suit: string implements HasLabel {
    case Hearts = 'H';
    public function label(): string { return 'x'; }
}
final class Impl { use Logs, Other { Logs::log insteadof Other; } public int $count = 0; }
"#);
        let types: Vec<&TypeDecl> = ast.types().collect();
        assert_eq!(types.len(), 4);
        assert_eq!(types[0].kind, TypeKind::Interface);
        assert_eq!(types[0].extends.len(), 2);
        assert_eq!(types[1].kind, TypeKind::Trait);
        assert_eq!(types[2].kind, TypeKind::Enum);
        assert_eq!(types[2].methods.len(), 1);
        assert_eq!(types[3].traits.len(), 2);
        assert!(types[3].methods.is_empty());
    }

    #[test]
    fn test_method_span_covers_body_lines() {
        let ast = parse_ok("<?php\nclass A {\n    public function run()\n    {\n        return 1;\n    }\n}\n");
        let method = &ast.types().next().expect("type").methods[0];
        assert_eq!(method.span.start.line, 3);
        assert_eq!(method.span.end.line, 6);
    }

    #[test]
    fn test_alternative_syntax_is_rejected() {
        let err = parse("<?php if ($a): echo 1; endif;").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_unclosed_class_is_an_error() {
        let err = parse("<?php class A { function f() {").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEndOfInput { .. } | ParseError::UnexpectedToken { .. }));
    }
}
