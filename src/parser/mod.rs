//! Parser module for PHP sources
//!
//! This module handles lexical analysis and parsing of `.php` files into AST.
//! Names are left as written; see [`crate::common::import`] for resolution.

pub mod lexer;
pub mod parser;
pub mod error;
pub mod span;

pub use lexer::{Lexer, LexicalToken, Token};
pub use parser::Parser;
pub use error::{ParseError, ParseResult};
pub use span::{Span, Location};

use crate::ast::Ast;
use crate::error::Result;

/// Parse a PHP source file into an AST
pub fn parse_php(source: &str) -> Result<Ast> {
    Ok(parser::parse(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_class() {
        let source = r#"<?php
namespace App;

class HelloWorld {
    public static function main(array $args): void {
        echo "Hello, World!";
    }
}
"#;

        let ast = parse_php(source).expect("Failed to parse");
        assert_eq!(ast.types().count(), 1);
        assert!(!ast.names_resolved);
        assert!(ast.find_method("HelloWorld", "MAIN").is_some());
    }

    #[test]
    fn test_parse_error_reports_location() {
        let err = parse_php("<?php\nclass {").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 2"), "unexpected message: {}", message);
    }

    #[test]
    fn test_html_only_file_is_empty() {
        let ast = parse_php("<html><body>no code</body></html>").expect("Failed to parse");
        assert_eq!(ast.types().count(), 0);
    }
}
