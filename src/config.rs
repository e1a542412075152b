//! Audit configuration
//!
//! Defaults can be overridden through `LISKOV_*` environment variables so a
//! caller embedding the engine does not need a configuration file.

use crate::error::{Error, Result};

pub const ENV_MAX_CALL_DEPTH: &str = "LISKOV_MAX_CALL_DEPTH";
pub const ENV_HONOR_CATCH: &str = "LISKOV_HONOR_CATCH";
pub const ENV_EXTENSIONS: &str = "LISKOV_EXTENSIONS";

/// Default ceiling for transitive call following
pub const DEFAULT_MAX_CALL_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum nesting of followed calls before the resolver gives up on a branch
    pub max_call_depth: usize,
    /// Drop outcomes raised in a `try` body when one of its catch clauses handles them
    pub honor_catch_blocks: bool,
    /// Source file extensions collected when walking directories
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            honor_catch_blocks: false,
            extensions: vec!["php".to_string()],
        }
    }
}

impl Config {
    /// Defaults overlaid with any `LISKOV_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(ENV_MAX_CALL_DEPTH) {
            config.max_call_depth = parse_depth(&raw)?;
        }
        if let Ok(raw) = std::env::var(ENV_HONOR_CATCH) {
            config.honor_catch_blocks = parse_flag(&raw)?;
        }
        if let Ok(raw) = std::env::var(ENV_EXTENSIONS) {
            config.extensions = raw
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        Ok(config)
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_honor_catch_blocks(mut self, honor: bool) -> Self {
        self.honor_catch_blocks = honor;
        self
    }

    /// Whether a path has one of the configured source extensions
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

fn parse_depth(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(Error::config_error(format!("{} must be at least 1", ENV_MAX_CALL_DEPTH))),
        Ok(depth) => Ok(depth),
        Err(_) => Err(Error::config_error(format!("{}='{}' is not a number", ENV_MAX_CALL_DEPTH, raw))),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::config_error(format!("{}='{}' is not a boolean", ENV_HONOR_CATCH, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults_follow_literal_semantics() {
        let config = Config::default();
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert!(!config.honor_catch_blocks);
        assert!(config.accepts(Path::new("src/Foo.php")));
        assert!(config.accepts(Path::new("src/Foo.PHP")));
        assert!(!config.accepts(Path::new("src/Foo.txt")));
    }

    #[test]
    fn depth_and_flag_parsing() {
        assert_eq!(parse_depth("8").unwrap(), 8);
        assert!(parse_depth("0").is_err());
        assert!(parse_depth("deep").is_err());
        assert!(parse_flag("yes").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
