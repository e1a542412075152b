use logos::Logos;
use super::error::ParseError;
use super::span::Location;

/// Token types for PHP source
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Token {
    // Tags
    #[token("<?php", ignore(ascii_case))]
    OpenTag,
    #[token("<?=")]
    OpenTagEcho,
    #[token("?>")]
    CloseTag,

    // Keywords (case-insensitive)
    #[token("abstract", ignore(ascii_case))]
    Abstract,
    #[token("and", ignore(ascii_case))]
    LogicalAnd,
    #[token("array", ignore(ascii_case))]
    Array,
    #[token("as", ignore(ascii_case))]
    As,
    #[token("break", ignore(ascii_case))]
    Break,
    #[token("case", ignore(ascii_case))]
    Case,
    #[token("catch", ignore(ascii_case))]
    Catch,
    #[token("class", ignore(ascii_case))]
    Class,
    #[token("clone", ignore(ascii_case))]
    Clone,
    #[token("const", ignore(ascii_case))]
    Const,
    #[token("continue", ignore(ascii_case))]
    Continue,
    #[token("declare", ignore(ascii_case))]
    Declare,
    #[token("default", ignore(ascii_case))]
    Default,
    #[token("do", ignore(ascii_case))]
    Do,
    #[token("echo", ignore(ascii_case))]
    Echo,
    #[token("else", ignore(ascii_case))]
    Else,
    #[token("elseif", ignore(ascii_case))]
    ElseIf,
    #[token("empty", ignore(ascii_case))]
    Empty,
    #[token("extends", ignore(ascii_case))]
    Extends,
    #[token("final", ignore(ascii_case))]
    Final,
    #[token("finally", ignore(ascii_case))]
    Finally,
    #[token("fn", ignore(ascii_case))]
    Fn,
    #[token("for", ignore(ascii_case))]
    For,
    #[token("foreach", ignore(ascii_case))]
    Foreach,
    #[token("function", ignore(ascii_case))]
    Function,
    #[token("global", ignore(ascii_case))]
    Global,
    #[token("if", ignore(ascii_case))]
    If,
    #[token("implements", ignore(ascii_case))]
    Implements,
    #[token("include", ignore(ascii_case))]
    Include,
    #[token("include_once", ignore(ascii_case))]
    IncludeOnce,
    #[token("instanceof", ignore(ascii_case))]
    InstanceOf,
    #[token("insteadof", ignore(ascii_case))]
    InsteadOf,
    #[token("interface", ignore(ascii_case))]
    Interface,
    #[token("isset", ignore(ascii_case))]
    Isset,
    #[token("list", ignore(ascii_case))]
    List,
    #[token("match", ignore(ascii_case))]
    Match,
    #[token("namespace", ignore(ascii_case))]
    Namespace,
    #[token("new", ignore(ascii_case))]
    New,
    #[token("or", ignore(ascii_case))]
    LogicalOr,
    #[token("print", ignore(ascii_case))]
    Print,
    #[token("private", ignore(ascii_case))]
    Private,
    #[token("protected", ignore(ascii_case))]
    Protected,
    #[token("public", ignore(ascii_case))]
    Public,
    #[token("readonly", ignore(ascii_case))]
    Readonly,
    #[token("require", ignore(ascii_case))]
    Require,
    #[token("require_once", ignore(ascii_case))]
    RequireOnce,
    #[token("return", ignore(ascii_case))]
    Return,
    #[token("static", ignore(ascii_case))]
    Static,
    #[token("switch", ignore(ascii_case))]
    Switch,
    #[token("throw", ignore(ascii_case))]
    Throw,
    #[token("trait", ignore(ascii_case))]
    Trait,
    #[token("try", ignore(ascii_case))]
    Try,
    #[token("unset", ignore(ascii_case))]
    Unset,
    #[token("use", ignore(ascii_case))]
    Use,
    #[token("var", ignore(ascii_case))]
    Var,
    #[token("while", ignore(ascii_case))]
    While,
    #[token("xor", ignore(ascii_case))]
    LogicalXor,
    #[token("yield", ignore(ascii_case))]
    Yield,

    // Assignment operators
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token(".=")]
    ConcatAssign,
    #[token("%=")]
    ModAssign,
    #[token("**=")]
    PowAssign,
    #[token("??=")]
    CoalesceAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,

    // Comparison
    #[token("==")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    Ne,
    #[token("===")]
    Identical,
    #[token("!==")]
    NotIdentical,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("<=>")]
    Spaceship,

    // Arithmetic, bitwise and logical
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("**")]
    Pow,
    #[token(".")]
    Dot,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token("??")]
    Coalesce,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("::")]
    DoubleColon,
    #[token("->")]
    Arrow,
    #[token("?->")]
    NullsafeArrow,
    #[token("=>")]
    DoubleArrow,
    #[token("@")]
    At,
    #[token("$")]
    Dollar,
    #[token("\\")]
    Backslash,

    // Separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("...")]
    Ellipsis,
    #[token("#[")]
    AttributeStart,

    // Literals
    #[regex(r"'([^'\\]|\\.)*'")]
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"`([^`\\]|\\.)*`")]
    StringLiteral,
    #[token("<<<", lex_heredoc)]
    Heredoc,
    #[regex(r"[0-9][0-9_]*")]
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"0[bB][01_]+")]
    #[regex(r"0[oO][0-7_]+")]
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+")]
    Number,

    // Names and variables
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*")]
    Variable,
    /// Identifier or qualified name, optionally with a leading `\`
    #[regex(r"\\?[a-zA-Z_][a-zA-Z0-9_]*(\\[a-zA-Z_][a-zA-Z0-9_]*)*")]
    Name,

    // Comments and whitespace
    #[token("//", lex_line_comment)]
    LineComment,
    #[token("#", lex_line_comment)]
    HashComment,
    #[regex(r"/\*\*[^*]*\*+([^/*][^*]*\*+)*/", priority = 3)]
    DocComment,
    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", priority = 2)]
    BlockComment,
    #[regex(r"[ \t\n\r\f]+", priority = 2)]
    Whitespace,

    // Unicode BOM (Byte Order Mark) - treat as ignorable whitespace
    #[token("\u{FEFF}")]
    Bom,
}

/// Single-line comments stop at the newline or before a closing `?>`
fn lex_line_comment(lex: &mut logos::Lexer<Token>) {
    let rest = lex.remainder();
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let end = rest[..line_end].find("?>").unwrap_or(line_end);
    lex.bump(end);
}

/// Scan a heredoc or nowdoc body up to and including its closing label.
fn lex_heredoc(lex: &mut logos::Lexer<Token>) -> bool {
    let rest = lex.remainder();
    let header_end = match rest.find('\n') {
        Some(i) => i,
        None => return false,
    };
    let label = rest[..header_end]
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'');
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    let mut offset = header_end + 1;
    for line in rest[header_end + 1..].split_inclusive('\n') {
        let trimmed = line.trim_start_matches([' ', '\t']);
        if let Some(after) = trimmed.strip_prefix(label) {
            if !after.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
                let indent = line.len() - trimmed.len();
                lex.bump(offset + indent + label.len());
                return true;
            }
        }
        offset += line.len();
    }
    false
}

impl Token {
    /// Check if this token is a keyword; keywords may still name members
    pub fn is_keyword(&self) -> bool {
        matches!(self,
            Token::Abstract | Token::LogicalAnd | Token::Array | Token::As |
            Token::Break | Token::Case | Token::Catch | Token::Class |
            Token::Clone | Token::Const | Token::Continue | Token::Declare |
            Token::Default | Token::Do | Token::Echo | Token::Else |
            Token::ElseIf | Token::Empty | Token::Extends | Token::Final |
            Token::Finally | Token::Fn | Token::For | Token::Foreach |
            Token::Function | Token::Global | Token::If | Token::Implements |
            Token::Include | Token::IncludeOnce | Token::InstanceOf |
            Token::InsteadOf | Token::Interface | Token::Isset | Token::List |
            Token::Match | Token::Namespace | Token::New | Token::LogicalOr |
            Token::Print | Token::Private | Token::Protected | Token::Public |
            Token::Readonly | Token::Require | Token::RequireOnce |
            Token::Return | Token::Static | Token::Switch | Token::Throw |
            Token::Trait | Token::Try | Token::Unset | Token::Use |
            Token::Var | Token::While | Token::LogicalXor | Token::Yield
        )
    }

    /// Tokens dropped before parsing
    pub fn is_trivia(&self) -> bool {
        matches!(self,
            Token::Whitespace | Token::Bom | Token::LineComment |
            Token::HashComment | Token::BlockComment | Token::OpenTag
        )
    }
}

/// Lexical token with location information
#[derive(Debug, Clone)]
pub struct LexicalToken {
    pub token: Token,
    pub lexeme: String,
    pub location: Location,
    /// Doc comment that immediately precedes this token, if any
    pub doc: Option<String>,
}

impl LexicalToken {
    pub fn new(token: Token, lexeme: String, location: Location) -> Self {
        Self { token, lexeme, location, doc: None }
    }

    pub fn token_type(&self) -> &Token {
        &self.token
    }

    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is(&self, token_type: &Token) -> bool {
        self.token == *token_type
    }
}

/// Lexer for PHP source files
pub struct Lexer<'a> {
    lexer: logos::Lexer<'a, Token>,
    position: Location,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Self {
            lexer: Token::lexer(source),
            position: Location::start(),
        };
        lexer.skip_inline_html();
        lexer
    }

    /// Skip text outside `<?php ... ?>` up to the next open tag
    fn skip_inline_html(&mut self) {
        let rest = self.lexer.remainder();
        let skip = match find_open_tag(rest) {
            Some(0) => return,
            Some(i) => i,
            None => rest.len(),
        };
        let skipped = &rest[..skip];
        self.position.advance_str(skipped);
        self.lexer.bump(skip);
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Option<Result<LexicalToken, ParseError>> {
        let token = self.lexer.next()?;
        let location = self.position;
        let lexeme = self.lexer.slice().to_string();
        self.position.advance_str(&lexeme);

        match token {
            Ok(Token::CloseTag) => {
                self.skip_inline_html();
                // `?>` terminates the statement it follows
                Some(Ok(LexicalToken::new(Token::Semicolon, ";".to_string(), location)))
            }
            Ok(Token::OpenTagEcho) => Some(Ok(LexicalToken::new(Token::Echo, lexeme, location))),
            Ok(token) => Some(Ok(LexicalToken::new(token, lexeme, location))),
            Err(()) => Some(Err(ParseError::lexical_error(
                &format!("unexpected character sequence '{}'", lexeme),
                location,
            ))),
        }
    }

    /// Get all significant tokens from the source, attaching doc comments
    pub fn tokenize(mut self) -> Result<Vec<LexicalToken>, ParseError> {
        let mut tokens = Vec::new();
        let mut pending_doc: Option<String> = None;

        while let Some(result) = self.next_token() {
            let mut token = result?;
            if token.token == Token::DocComment {
                pending_doc = Some(token.lexeme);
                continue;
            }
            if token.token.is_trivia() {
                continue;
            }
            token.doc = pending_doc.take();
            tokens.push(token);
        }

        Ok(tokens)
    }
}

fn find_open_tag(text: &str) -> Option<usize> {
    let lower = text.to_ascii_lowercase();
    match (lower.find("<?php"), lower.find("<?=")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<LexicalToken, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .expect("Failed to tokenize")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_lexer_keywords_are_case_insensitive() {
        let tokens = kinds("<?php ABSTRACT Class Foo extends Bar implements Baz");
        assert_eq!(tokens, vec![
            Token::Abstract, Token::Class, Token::Name, Token::Extends,
            Token::Name, Token::Implements, Token::Name,
        ]);
    }

    #[test]
    fn test_lexer_qualified_names_and_variables() {
        let tokens = Lexer::new(r"<?php throw new \App\Errors\Failure($msg);")
            .tokenize()
            .expect("Failed to tokenize");
        assert!(tokens[0].is(&Token::Throw));
        assert!(tokens[1].is(&Token::New));
        assert!(tokens[2].is(&Token::Name));
        assert_eq!(tokens[2].lexeme(), r"\App\Errors\Failure");
        assert!(tokens[4].is(&Token::Variable));
        assert_eq!(tokens[4].lexeme(), "$msg");
    }

    #[test]
    fn test_lexer_operators() {
        let tokens = kinds("<?php ?-> -> => :: ?? ??= === !== <=> ** ... #[");
        assert_eq!(tokens, vec![
            Token::NullsafeArrow, Token::Arrow, Token::DoubleArrow, Token::DoubleColon,
            Token::Coalesce, Token::CoalesceAssign, Token::Identical, Token::NotIdentical,
            Token::Spaceship, Token::Pow, Token::Ellipsis, Token::AttributeStart,
        ]);
    }

    #[test]
    fn test_doc_comment_attaches_to_next_token() {
        let source = "<?php\n/**\n * @throws Foo\n */\n// note\npublic function run() {}";
        let tokens = Lexer::new(source).tokenize().expect("Failed to tokenize");
        assert!(tokens[0].is(&Token::Public));
        assert!(tokens[0].doc.as_deref().unwrap_or("").contains("@throws Foo"));
        assert!(tokens[1].doc.is_none());
    }

    #[test]
    fn test_plain_block_comment_is_not_a_doc_comment() {
        let tokens = Lexer::new("<?php /* @throws Foo */ function f() {}")
            .tokenize()
            .expect("Failed to tokenize");
        assert!(tokens[0].is(&Token::Function));
        assert!(tokens[0].doc.is_none());
    }

    #[test]
    fn test_heredoc_is_a_single_token() {
        let source = "<?php $x = <<<EOT\n  body with \"quotes\" and 'ticks'\n  EOT;\n$y = 1;";
        let tokens = kinds(source);
        assert_eq!(tokens, vec![
            Token::Variable, Token::Assign, Token::Heredoc, Token::Semicolon,
            Token::Variable, Token::Assign, Token::Number, Token::Semicolon,
        ]);
    }

    #[test]
    fn test_inline_html_and_close_tag() {
        let source = "<html>\n<?php echo 1 ?>\n<p>tail</p>";
        let tokens = Lexer::new(source).tokenize().expect("Failed to tokenize");
        assert_eq!(tokens.len(), 3);
        assert!(tokens[0].is(&Token::Echo));
        assert_eq!(tokens[0].location.line, 2);
        assert!(tokens[2].is(&Token::Semicolon));
    }

    #[test]
    fn test_hash_comment_vs_attribute() {
        let tokens = kinds("<?php # comment\n#[Attr]\nclass A {}");
        assert_eq!(tokens[0], Token::AttributeStart);
        assert_eq!(tokens[1], Token::Name);
        assert_eq!(tokens[2], Token::RBracket);
    }

    #[test]
    fn test_line_comment_ends_at_close_tag() {
        let source = "<?php $a = 1; // note ?> <b>html</b> <?php # more ?>\n<i>x</i><?php $b = 2;";
        let tokens = kinds(source);
        assert_eq!(tokens, vec![
            Token::Variable, Token::Assign, Token::Number, Token::Semicolon,
            Token::Semicolon,
            Token::Semicolon,
            Token::Variable, Token::Assign, Token::Number, Token::Semicolon,
        ]);
    }
}
