// Common test utilities
#![allow(dead_code)]

use liskov::common::{AstCache, ClassIndex, MemorySourceLoader};
use liskov::config::Config;
use liskov::review::{compare_class_to_contracts, AuditContext, LoadError, ThrowsResolver, Violation};

/// Route `log` output through the test harness; safe to call from every test
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An index and cache over in-memory PHP sources
pub struct Fixture {
    pub cache: AstCache,
    pub index: ClassIndex,
    pub config: Config,
}

impl Fixture {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::with_config(files, Config::default())
    }

    pub fn with_config(files: &[(&str, &str)], config: Config) -> Self {
        init_logger();
        let mut loader = MemorySourceLoader::new();
        for (path, source) in files {
            loader.insert(*path, *source);
        }
        let paths = loader.paths();
        let cache = AstCache::new(loader);
        let index = ClassIndex::build(&paths, &cache);
        Self { cache, index, config }
    }

    /// A single file named `src.php`
    pub fn single(source: &str) -> Self {
        Self::new(&[("src.php", source)])
    }

    pub fn context(&self) -> AuditContext<'_> {
        AuditContext { index: &self.index, cache: &self.cache, config: &self.config }
    }

    pub fn check(&self, class: &str) -> Result<Vec<Violation>, LoadError> {
        compare_class_to_contracts(class, &self.context())
    }

    /// Violations for a class that must load
    pub fn violations(&self, class: &str) -> Vec<Violation> {
        self.check(class).unwrap_or_else(|e| panic!("{} failed to load: {}", class, e))
    }

    pub fn rendered(&self, class: &str) -> Vec<String> {
        self.violations(class).iter().map(|v| v.to_string()).collect()
    }

    pub fn throws(&self, class: &str, method: &str) -> Vec<String> {
        let mut resolver = ThrowsResolver::new(&self.index, &self.cache, &self.config);
        resolver.method_throws(class, method).into_iter().collect()
    }
}
