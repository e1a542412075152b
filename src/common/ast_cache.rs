//! Syntax-tree cache and loader
//!
//! Each source file is read and parsed at most once per run; the resolved AST
//! is shared through `Rc`. A file that cannot be read or parsed is cached as
//! unavailable so callers degrade to "no evidence" instead of aborting.

use crate::ast::Ast;
use crate::common::import::resolve_names;
use crate::parser::parse_php;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where source text comes from
pub trait SourceLoader {
    fn load(&self, path: &Path) -> io::Result<String>;

    /// Key under which a path is cached
    fn cache_key(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Reads sources from disk, keyed by canonical path
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn cache_key(&self, path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Serves sources registered in memory; used by tests and embedders
#[derive(Debug, Default, Clone)]
pub struct MemorySourceLoader {
    files: HashMap<PathBuf, String>,
}

impl MemorySourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    /// Registered paths in sorted order
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl SourceLoader for MemorySourceLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} is not registered", path.display())))
    }
}

/// A parsed source file whose names have been resolved
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub ast: Ast,
}

impl ParsedFile {
    pub fn names_resolved(&self) -> bool {
        self.ast.names_resolved
    }
}

/// Memoizing parser keyed by file path
pub struct AstCache {
    loader: Box<dyn SourceLoader>,
    entries: RefCell<HashMap<PathBuf, Option<Rc<ParsedFile>>>>,
    reads: Cell<usize>,
}

impl AstCache {
    pub fn new(loader: impl SourceLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            entries: RefCell::new(HashMap::new()),
            reads: Cell::new(0),
        }
    }

    pub fn filesystem() -> Self {
        Self::new(FsLoader)
    }

    /// Parse `path` once; `None` when the file is unreadable or unparseable
    pub fn parse(&self, path: &Path) -> Option<Rc<ParsedFile>> {
        let key = self.loader.cache_key(path);
        if let Some(entry) = self.entries.borrow().get(&key) {
            return entry.clone();
        }

        let entry = self.load_and_parse(&key).map(Rc::new);
        self.entries.borrow_mut().insert(key, entry.clone());
        entry
    }

    fn load_and_parse(&self, path: &Path) -> Option<ParsedFile> {
        self.reads.set(self.reads.get() + 1);
        let source = match self.loader.load(path) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        let mut ast = match parse_php(&source) {
            Ok(ast) => ast,
            Err(e) => {
                log::warn!("cannot parse {}: {}", path.display(), e);
                return None;
            }
        };
        resolve_names(&mut ast);
        log::debug!("parsed {} ({} types)", path.display(), ast.types().count());
        Some(ParsedFile { path: path.to_path_buf(), ast })
    }

    /// Number of times the loader has been asked for source text
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every entry, for long-running embedders between runs
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl std::fmt::Debug for AstCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AstCache")
            .field("entries", &self.len())
            .field("reads", &self.read_count())
            .finish()
    }
}
