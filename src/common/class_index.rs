//! Static symbol table
//!
//! Records every class-like declaration found in the scanned sources, plus the
//! built-in hierarchy, and answers the hierarchy questions the auditor needs:
//! parent chains, implemented interfaces, method lookup and subtyping.
//! Lookups are case-insensitive, as class names are in PHP.

use crate::ast::{MethodDecl, Modifier, TypeDecl, TypeKind};
use crate::common::ast_cache::AstCache;
use crate::common::builtins::BUILTIN_CLASSES;
use crate::common::import::NameContext;
use crate::common::type_sig::TypeSig;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub type_sig: Option<TypeSig>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    /// Class the method belongs to; for trait methods, the using class
    pub declaring_class: String,
    /// Declaration holding the method body (the declaring class or a trait)
    pub source_owner: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub doc: Option<String>,
    pub return_type: Option<TypeSig>,
    pub params: Vec<ParamInfo>,
    /// First and last line of the declaration
    pub lines: Option<(usize, usize)>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub kind: TypeKind,
    pub parent: Option<String>,
    /// Directly implemented interfaces; for interfaces, the ones they extend
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
    pub is_abstract: bool,
    pub file: Option<PathBuf>,
    /// Name context of the declaring namespace block, for docblock names
    pub context: NameContext,
    /// Own methods, including those copied in from traits
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    pub fn is_builtin(&self) -> bool {
        self.file.is_none()
    }

    pub fn own_method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    fn from_decl(decl: &TypeDecl, context: &NameContext, file: &Path) -> Self {
        let (parent, interfaces) = match decl.kind {
            TypeKind::Interface => (None, decl.extends.iter().map(|n| n.fq().to_string()).collect()),
            _ => {
                let parent = decl.extends.first().map(|n| n.fq().to_string());
                let mut interfaces: Vec<String> = decl.implements.iter().map(|n| n.fq().to_string()).collect();
                if decl.kind == TypeKind::Enum {
                    interfaces.push("UnitEnum".to_string());
                }
                (parent, interfaces)
            }
        };
        let methods = decl
            .methods
            .iter()
            .map(|m| method_info(m, decl, parent.as_deref(), file))
            .collect();

        ClassInfo {
            name: decl.fq_name.clone(),
            kind: decl.kind,
            parent,
            interfaces,
            traits: decl.traits.iter().map(|n| n.fq().to_string()).collect(),
            is_abstract: decl.is_abstract() || decl.kind == TypeKind::Interface,
            file: Some(file.to_path_buf()),
            context: context.clone(),
            methods,
        }
    }
}

fn method_info(method: &MethodDecl, owner: &TypeDecl, parent: Option<&str>, file: &Path) -> MethodInfo {
    let self_class = owner.fq_name.as_str();
    let visibility = if method.modifiers.contains(&Modifier::Private) {
        Visibility::Private
    } else if method.modifiers.contains(&Modifier::Protected) {
        Visibility::Protected
    } else {
        Visibility::Public
    };

    MethodInfo {
        name: method.name.clone(),
        declaring_class: self_class.to_string(),
        source_owner: self_class.to_string(),
        visibility,
        is_static: method.is_static(),
        is_abstract: method.body.is_none(),
        doc: method.doc.clone(),
        return_type: method.return_type.as_ref().map(|h| TypeSig::from_hint(h, self_class, parent)),
        params: method
            .params
            .iter()
            .map(|p| ParamInfo {
                name: p.name.clone(),
                type_sig: p.type_hint.as_ref().map(|h| TypeSig::from_hint(h, self_class, parent)),
            })
            .collect(),
        lines: Some(method.span.lines()),
        file: Some(file.to_path_buf()),
    }
}

fn key(name: &str) -> String {
    name.trim_start_matches('\\').to_ascii_lowercase()
}

/// Name-to-declaration table over the scanned sources
#[derive(Debug, Clone)]
pub struct ClassIndex {
    classes: Vec<ClassInfo>,
    by_name: HashMap<String, usize>,
    unparsed: Vec<PathBuf>,
}

impl Default for ClassIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassIndex {
    /// An index holding only the built-in types
    pub fn new() -> Self {
        let mut index = ClassIndex {
            classes: Vec::new(),
            by_name: HashMap::new(),
            unparsed: Vec::new(),
        };
        for builtin in BUILTIN_CLASSES.iter() {
            index.insert(builtin.clone());
        }
        index
    }

    /// Parse every path through the cache and index its declarations
    pub fn build(paths: &[PathBuf], cache: &AstCache) -> Self {
        let mut index = Self::new();
        for path in paths {
            index.add_file(path, cache);
        }
        index.apply_traits();
        log::info!(
            "indexed {} declarations from {} files ({} unparsed)",
            index.classes.iter().filter(|c| !c.is_builtin()).count(),
            paths.len(),
            index.unparsed.len()
        );
        index
    }

    fn add_file(&mut self, path: &Path, cache: &AstCache) {
        let parsed = match cache.parse(path) {
            Some(parsed) => parsed,
            None => {
                self.unparsed.push(path.to_path_buf());
                return;
            }
        };
        for block in &parsed.ast.namespaces {
            let context = NameContext::from_block(block);
            for decl in &block.types {
                self.insert(ClassInfo::from_decl(decl, &context, &parsed.path));
            }
        }
    }

    fn insert(&mut self, info: ClassInfo) {
        let key = key(&info.name);
        if let Some(&existing) = self.by_name.get(&key) {
            log::warn!(
                "duplicate declaration of {} in {}; keeping the one from {}",
                info.name,
                info.file.as_deref().map_or_else(|| "<builtin>".into(), |p| p.display().to_string()),
                self.classes[existing].file.as_deref().map_or_else(|| "<builtin>".into(), |p| p.display().to_string()),
            );
            return;
        }
        self.by_name.insert(key, self.classes.len());
        self.classes.push(info);
    }

    /// Copy trait methods into every using class; the class's own methods win
    fn apply_traits(&mut self) {
        let mut additions = Vec::new();
        for (position, class) in self.classes.iter().enumerate() {
            if class.traits.is_empty() {
                continue;
            }
            let mut visited = HashSet::new();
            let mut copied: Vec<MethodInfo> = Vec::new();
            for trait_name in &class.traits {
                for method in self.trait_methods(trait_name, &mut visited) {
                    let shadowed = class.own_method(&method.name).is_some()
                        || copied.iter().any(|m| m.name.eq_ignore_ascii_case(&method.name));
                    if shadowed {
                        continue;
                    }
                    let mut method = method.clone();
                    method.return_type = method.return_type.map(|t| t.rebind(&method.declaring_class, &class.name));
                    for param in &mut method.params {
                        param.type_sig = param.type_sig.take().map(|t| t.rebind(&method.declaring_class, &class.name));
                    }
                    method.declaring_class = class.name.clone();
                    copied.push(method);
                }
            }
            additions.push((position, copied));
        }
        for (position, copied) in additions {
            self.classes[position].methods.extend(copied);
        }
    }

    /// Methods a trait contributes, including those of the traits it uses
    fn trait_methods<'s>(&'s self, name: &str, visited: &mut HashSet<String>) -> Vec<&'s MethodInfo> {
        if !visited.insert(key(name)) {
            return Vec::new();
        }
        let info = match self.get(name) {
            Some(info) if info.kind == TypeKind::Trait => info,
            _ => {
                log::warn!("trait {} is not declared in the scanned sources", name);
                return Vec::new();
            }
        };
        let mut methods: Vec<&MethodInfo> = info.methods.iter().collect();
        for nested in &info.traits {
            for method in self.trait_methods(nested, visited) {
                if !methods.iter().any(|m| m.name.eq_ignore_ascii_case(&method.name)) {
                    methods.push(method);
                }
            }
        }
        methods
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.by_name.get(&key(name)).map(|&i| &self.classes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&key(name))
    }

    /// All declarations in insertion order, built-ins first
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }

    pub fn parent(&self, name: &str) -> Option<&ClassInfo> {
        self.get(name)?.parent.as_deref().and_then(|p| self.get(p))
    }

    /// Files that could not be read or parsed
    pub fn unparsed_files(&self) -> &[PathBuf] {
        &self.unparsed
    }

    /// Resolve a method the way the runtime does: own and trait methods, the
    /// parent chain, then implemented interfaces
    pub fn method(&self, class: &str, method: &str) -> Option<&MethodInfo> {
        let mut seen = HashSet::new();
        let mut current = self.get(class);
        while let Some(info) = current {
            if !seen.insert(key(&info.name)) {
                break;
            }
            if let Some(found) = info.own_method(method) {
                return Some(found);
            }
            current = info.parent.as_deref().and_then(|p| self.get(p));
        }
        self.interfaces(class)
            .iter()
            .filter_map(|iface| self.get(iface))
            .find_map(|iface| iface.own_method(method))
    }

    /// Every method visible on the class; the first declaration of a name wins
    pub fn methods(&self, class: &str) -> Vec<&MethodInfo> {
        let mut declarations: Vec<&ClassInfo> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(class);
        while let Some(info) = current {
            if !seen.insert(key(&info.name)) {
                break;
            }
            declarations.push(info);
            current = info.parent.as_deref().and_then(|p| self.get(p));
        }
        let interfaces = self.interfaces(class);
        declarations.extend(interfaces.iter().filter_map(|iface| self.get(iface)));

        let mut out: Vec<&MethodInfo> = Vec::new();
        for method in declarations.into_iter().flat_map(|info| info.methods.iter()) {
            if !out.iter().any(|m| m.name.eq_ignore_ascii_case(&method.name)) {
                out.push(method);
            }
        }
        out
    }

    /// Interfaces implemented directly or indirectly, deduplicated: each own
    /// interface followed by those it extends, then the parent's
    pub fn interfaces(&self, class: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut visiting = HashSet::new();
        self.collect_interfaces(class, &mut out, &mut visiting);
        out
    }

    fn collect_interfaces(&self, class: &str, out: &mut Vec<String>, visiting: &mut HashSet<String>) {
        if !visiting.insert(key(class)) {
            return;
        }
        let info = match self.get(class) {
            Some(info) => info,
            None => return,
        };
        for iface in &info.interfaces {
            let display = self.get(iface).map_or_else(|| iface.clone(), |i| i.name.clone());
            if !out.iter().any(|o| o.eq_ignore_ascii_case(&display)) {
                out.push(display);
            }
            self.collect_interfaces(iface, out, visiting);
        }
        if let Some(parent) = &info.parent {
            self.collect_interfaces(parent, out, visiting);
        }
    }

    /// Reflexive-transitive closure of parent and interface edges
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let target = key(sup);
        let mut queue = VecDeque::from([key(sub)]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(info) = self.get(&current) {
                queue.extend(info.parent.iter().map(|p| key(p)));
                queue.extend(info.interfaces.iter().map(|i| key(i)));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ast_cache::MemorySourceLoader;

    fn build(files: &[(&str, &str)]) -> (ClassIndex, AstCache) {
        let mut loader = MemorySourceLoader::new();
        for (path, source) in files {
            loader.insert(*path, *source);
        }
        let paths = loader.paths();
        let cache = AstCache::new(loader);
        (ClassIndex::build(&paths, &cache), cache)
    }

    #[test]
    fn test_hierarchy_queries() {
        let (index, _) = build(&[(
            "a.php",
            r#"<?php
namespace Shop;
interface Reader { function read(): string; }
interface Store extends Reader { function put(string $k): void; }
abstract class Base implements \Countable { function count(): int { return 0; } function read(): string { return ''; } }
class Impl extends Base implements Store { function put(string $k): void {} }
"#,
        )]);

        assert!(index.contains("shop\\impl"));
        assert_eq!(index.parent("Shop\\Impl").map(|p| p.name.as_str()), Some("Shop\\Base"));
        assert_eq!(index.interfaces("Shop\\Impl"), vec!["Shop\\Store", "Shop\\Reader", "Countable"]);
        assert!(index.is_subtype("Shop\\Impl", "Shop\\Reader"));
        assert!(index.is_subtype("Shop\\Impl", "countable"));
        assert!(!index.is_subtype("Shop\\Base", "Shop\\Store"));

        let read = index.method("Shop\\Impl", "READ").expect("read");
        assert_eq!(read.declaring_class, "Shop\\Base");
        let put = index.method("Shop\\Store", "put").expect("put");
        assert!(put.is_abstract);

        let names: Vec<&str> = index.methods("Shop\\Impl").iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["put", "count", "read"]);
    }

    #[test]
    fn test_trait_methods_belong_to_using_class() {
        let (index, _) = build(&[
            ("t.php", "<?php trait Greets { /** @throws Oops */ function hello(): static {} }"),
            ("c.php", "<?php class Person { use Greets; }"),
        ]);
        let hello = index.method("Person", "hello").expect("hello");
        assert_eq!(hello.declaring_class, "Person");
        assert_eq!(hello.source_owner, "Greets");
        assert_eq!(hello.return_type.as_ref().map(|t| t.to_string()).as_deref(), Some("Person"));
        assert!(hello.doc.is_some());
    }

    #[test]
    fn test_unparsed_files_and_duplicates() {
        let (index, _) = build(&[
            ("bad.php", "<?php class {"),
            ("one.php", "<?php class Dup { function a() {} }"),
            ("two.php", "<?php class Dup { function b() {} }"),
        ]);
        assert_eq!(index.unparsed_files(), &[PathBuf::from("bad.php")]);
        let dup = index.get("Dup").expect("Dup");
        assert_eq!(dup.file.as_deref(), Some(Path::new("one.php")));
        assert!(dup.own_method("a").is_some());
    }

    #[test]
    fn test_method_lines_and_builtins() {
        let (index, _) = build(&[("l.php", "<?php\nclass L\n{\n    function f()\n    {\n    }\n}\n")]);
        assert_eq!(index.method("L", "f").and_then(|m| m.lines), Some((4, 6)));
        assert!(index.is_subtype("InvalidArgumentException", "Exception"));
        assert!(index.is_subtype("Exception", "Throwable"));
        assert!(index.get("Throwable").map_or(false, |t| t.is_builtin()));
    }
}
