//! Common definitions shared across modules
//!
//! Name resolution, the syntax-tree cache, the built-in type table, the
//! static class index and type signatures used by the review passes.

pub mod ast_cache;
pub mod builtins;
pub mod class_index;
pub mod import;
pub mod type_sig;

// Re-export commonly used items for convenience
pub use ast_cache::{AstCache, FsLoader, MemorySourceLoader, ParsedFile, SourceLoader};
pub use class_index::{ClassIndex, ClassInfo, MethodInfo, ParamInfo, Visibility};
pub use import::{resolve_names, NameContext};
pub use type_sig::TypeSig;
