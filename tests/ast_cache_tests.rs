use liskov::common::{AstCache, FsLoader, MemorySourceLoader};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

mod common;

#[test]
fn parsing_twice_returns_the_cached_tree() {
    common::init_logger();
    let loader = MemorySourceLoader::new().with_file("a.php", "<?php class A { function f() {} }");
    let cache = AstCache::new(loader);

    let first = cache.parse(Path::new("a.php")).expect("first parse");
    let second = cache.parse(Path::new("a.php")).expect("second parse");
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(cache.read_count(), 1);
    assert_eq!(cache.len(), 1);
    assert!(first.names_resolved());
}

#[test]
fn unavailable_files_are_cached_as_unavailable() {
    common::init_logger();
    let loader = MemorySourceLoader::new().with_file("broken.php", "<?php class Broken { function f( }");
    let cache = AstCache::new(loader);

    assert!(cache.parse(Path::new("broken.php")).is_none());
    assert!(cache.parse(Path::new("broken.php")).is_none());
    assert!(cache.parse(Path::new("missing.php")).is_none());
    assert_eq!(cache.read_count(), 2);
}

#[test]
fn clear_forces_a_fresh_read() {
    let loader = MemorySourceLoader::new().with_file("a.php", "<?php class A {}");
    let cache = AstCache::new(loader);
    let first = cache.parse(Path::new("a.php")).expect("parse");
    cache.clear();
    assert!(cache.is_empty());
    let second = cache.parse(Path::new("a.php")).expect("parse");
    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(cache.read_count(), 2);
}

#[test]
fn filesystem_loader_keys_by_canonical_path() {
    common::init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("Service.php");
    fs::write(&file, "<?php\nnamespace App;\nuse Lib\\Base;\nclass Service extends Base {}\n").expect("write");

    let cache = AstCache::new(FsLoader);
    let direct = cache.parse(&file).expect("parse");
    let roundabout: PathBuf = dir.path().join(".").join("Service.php");
    let again = cache.parse(&roundabout).expect("parse");

    assert!(Rc::ptr_eq(&direct, &again));
    assert_eq!(cache.read_count(), 1);

    let service = direct.ast.find_type("App\\Service").expect("Service");
    assert_eq!(service.extends[0].fq(), "Lib\\Base");
}
