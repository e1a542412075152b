//! `@throws` extraction from docblocks
//!
//! Only lines whose first content (after whitespace and comment markers) is
//! the `@throws` tag count. The tag's argument is its first whitespace
//! delimited token, possibly a `|` union; anything after it is description.
//! Tokens that are not class names contribute nothing.

use crate::common::class_index::ClassIndex;
use crate::common::import::NameContext;
use std::collections::BTreeSet;

const THROWS_TAG: &str = "@throws";

/// Exception names as written in the docblock, in order of appearance
pub fn extract_throws(doc: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in doc.lines() {
        let content = strip_comment_markers(line);
        let rest = match content.strip_prefix(THROWS_TAG) {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest,
            _ => continue,
        };
        let token = match rest.split_whitespace().next() {
            Some(token) => token,
            None => continue,
        };
        for member in token.split('|') {
            if is_class_name(member) && !names.iter().any(|n| n.eq_ignore_ascii_case(member)) {
                names.push(member.to_string());
            }
        }
    }
    names
}

/// Declared exceptions resolved to fully qualified names. A name that is
/// unknown in its namespace but known globally resolves to the global class.
pub fn declared_throws(doc: Option<&str>, context: &NameContext, index: &ClassIndex) -> BTreeSet<String> {
    let doc = match doc {
        Some(doc) => doc,
        None => return BTreeSet::new(),
    };
    extract_throws(doc)
        .into_iter()
        .map(|written| {
            let resolved = context.resolve_class(&written);
            if !index.contains(&resolved) && !written.starts_with('\\') && index.contains(&written) {
                written
            } else {
                resolved
            }
        })
        .collect()
}

fn strip_comment_markers(line: &str) -> &str {
    let line = line.trim_start();
    let line = line.strip_prefix("/**").or_else(|| line.strip_prefix("/*")).unwrap_or(line);
    line.trim_start_matches(|c: char| c == '*' || c.is_whitespace())
}

fn is_class_name(token: &str) -> bool {
    let body = token.strip_prefix('\\').unwrap_or(token);
    !body.is_empty()
        && body.split('\\').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_tags_and_unions() {
        let doc = r#"/**
         * Loads a record.
         *
         * @param int $id
         * @throws NotFound when the record is missing
         * @throws \Db\Timeout|\Db\Gone
         * @return Record
         */"#;
        assert_eq!(extract_throws(doc), vec!["NotFound", "\\Db\\Timeout", "\\Db\\Gone"]);
    }

    #[test]
    fn test_ignores_tags_not_at_line_start() {
        let doc = "/** See @throws Foo for details\n * @throwsBar\n * @throws\n */";
        assert!(extract_throws(doc).is_empty());
    }

    #[test]
    fn test_single_line_docblock() {
        assert_eq!(extract_throws("/** @throws \\RuntimeException */"), vec!["\\RuntimeException"]);
    }

    #[test]
    fn test_malformed_members_are_skipped_and_duplicates_merged() {
        let doc = "/**\n * @throws {@link Foo}\n * @throws A||B\n * @throws a\n */";
        assert_eq!(extract_throws(doc), vec!["A", "B"]);
    }

    #[test]
    fn test_declared_throws_resolves_names() {
        let ast = crate::parser::parse_php("<?php namespace App; use Lib\\Missing;").expect("Failed to parse");
        let context = NameContext::from_block(&ast.namespaces[0]);
        let index = ClassIndex::new();

        let doc = "/**\n * @throws Missing\n * @throws RuntimeException\n * @throws Local\n * @throws \\Other\n */";
        let declared: Vec<String> = declared_throws(Some(doc), &context, &index).into_iter().collect();
        assert_eq!(declared, vec!["App\\Local", "Lib\\Missing", "Other", "RuntimeException"]);
        assert!(declared_throws(None, &context, &index).is_empty());
    }
}
