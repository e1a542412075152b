use liskov::review::{LoadError, Violation, ViolationKind};
use pretty_assertions::assert_eq;

mod common;
use common::Fixture;

fn kinds(violations: &[Violation]) -> Vec<ViolationKind> {
    violations.iter().map(|v| v.kind).collect()
}

#[test]
fn annotation_only_mismatch_is_reported_once() {
    let fx = Fixture::single(
        r#"<?php
namespace App;
interface Repository {
    public function find(int $id): ?object;
}
class SqlRepository implements Repository {
    /**
     * @throws \RuntimeException when the connection drops
     */
    public function find(int $id): ?object { return null; }
}
"#,
    );
    assert_eq!(
        fx.rendered("App\\SqlRepository"),
        vec![
            "App\\SqlRepository::find() — contract App\\Repository — declares exception RuntimeException via @throws annotation, which the contract does not permit"
        ]
    );
}

#[test]
fn empty_contract_reports_each_type_per_evidence_source() {
    let fx = Fixture::single(
        r#"<?php
interface Cache { public function get(string $key); }
class RedisCache implements Cache {
    /**
     * @throws RuntimeException|LogicException
     */
    public function get(string $key) {
        if ($key === '') { throw new LogicException(); }
        throw new OverflowException();
    }
}
"#,
    );
    let violations = fx.violations("RedisCache");
    assert_eq!(
        kinds(&violations),
        vec![
            ViolationKind::AnnotationThrows,
            ViolationKind::AnnotationThrows,
            ViolationKind::CodeThrows,
            ViolationKind::CodeThrows,
        ]
    );
    let reasons: Vec<&str> = violations.iter().map(|v| v.reason.as_str()).collect();
    assert_eq!(
        reasons,
        vec![
            "declares exception LogicException via @throws annotation, which the contract does not permit",
            "declares exception RuntimeException via @throws annotation, which the contract does not permit",
            "throws exception LogicException in code (detected via AST analysis), which the contract does not permit",
            "throws exception OverflowException in code (detected via AST analysis), which the contract does not permit",
        ]
    );
}

#[test]
fn subtypes_of_permitted_outcomes_are_allowed() {
    let fx = Fixture::single(
        r#"<?php
namespace Storage;
class IOFailure extends \Exception {}
class FileNotFoundFailure extends IOFailure {}
class PermissionFailure extends \Exception {}

interface Disk {
    /** @throws IOFailure */
    public function read(string $path): string;
}
class LocalDisk implements Disk {
    /** @throws FileNotFoundFailure */
    public function read(string $path): string {
        throw new FileNotFoundFailure($path);
    }
}
class LockedDisk implements Disk {
    public function read(string $path): string {
        throw new PermissionFailure($path);
    }
}
"#,
    );
    assert!(fx.violations("Storage\\LocalDisk").is_empty());

    let locked = fx.violations("Storage\\LockedDisk");
    assert_eq!(locked.len(), 1);
    assert_eq!(locked[0].kind, ViolationKind::CodeThrows);
    assert!(locked[0].reason.contains("Storage\\PermissionFailure"));
}

#[test]
fn narrowed_parameter_yields_one_contravariance_violation() {
    let fx = Fixture::single(
        r#"<?php
class Animal {}
class Dog extends Animal {}
interface Shelter { public function admit(Animal $animal, int $days): void; }
class DogShelter implements Shelter {
    public function admit(Dog $animal, int $days): void {}
}
class AnyShelter implements Shelter {
    public function admit(object $animal, $days, $extra = null): void {}
}
"#,
    );
    let violations = fx.violations("DogShelter");
    assert_eq!(kinds(&violations), vec![ViolationKind::ParameterContravariance]);
    assert_eq!(
        violations[0].reason,
        "parameter type narrows the contract's precondition: $animal accepts Dog, the contract accepts Animal"
    );
    assert!(fx.violations("AnyShelter").is_empty());
}

#[test]
fn return_types_must_be_covariant() {
    let fx = Fixture::single(
        r#"<?php
interface Factory {
    public function make(): Traversable;
    public function name(): ?string;
    public function build();
    public function me(): static;
}
class Good implements Factory {
    public function make(): ArrayIterator { return new ArrayIterator([]); }
    public function name(): string { return 'good'; }
    public function build(): int { return 1; }
    public function me(): static { return $this; }
}
class Bad implements Factory {
    public function make(): array { return []; }
    public function name() { return null; }
    public function build() {}
    public function me(): static { return $this; }
}
"#,
    );
    assert!(fx.violations("Good").is_empty());

    let bad = fx.rendered("Bad");
    assert_eq!(
        bad,
        vec![
            "Bad::make() — contract Factory — return type is not covariant with the contract: array is not a subtype of Traversable",
            "Bad::name() — contract Factory — return type is not covariant with the contract: mixed is not a subtype of string|null",
        ]
    );
}

#[test]
fn every_contract_is_checked_independently() {
    let fx = Fixture::single(
        r#"<?php
interface Reader { public function open(); }
interface Writer { public function open(); }
abstract class Stream { abstract public function open(); }
class Socket extends Stream implements Reader, Writer {
    public function open() { throw new RuntimeException(); }
}
"#,
    );
    let contracts: Vec<String> = fx.violations("Socket").into_iter().map(|v| v.contract_name).collect();
    assert_eq!(contracts, vec!["Reader", "Writer", "Stream"]);
}

#[test]
fn parent_class_contract_and_inherited_interfaces() {
    let fx = Fixture::single(
        r#"<?php
namespace Shop;
use InvalidArgumentException as BadInput;
interface Priced { public function price(): int; }
class Product implements Priced {
    /** @throws BadInput */
    public function price(): int { return 1; }
    /** @throws BadInput */
    public function rename(string $name): void {}
}
class Voucher extends Product {
    /** @throws \DomainException */
    public function rename(string $name): void {
        throw new BadInput();
    }
    public function price(): int { throw new \LengthException(); }
}
"#,
    );
    // Priced comes first as an inherited interface, then the parent Product
    assert_eq!(
        fx.rendered("Shop\\Voucher"),
        vec![
            "Shop\\Voucher::price() — contract Shop\\Priced — throws exception LengthException in code (detected via AST analysis), which the contract does not permit",
            "Shop\\Voucher::price() — contract Shop\\Product — throws exception LengthException in code (detected via AST analysis), which the contract does not permit",
            "Shop\\Voucher::rename() — contract Shop\\Product — declares exception DomainException via @throws annotation, which the contract does not permit",
        ]
    );
}

#[test]
fn docblock_names_resolve_through_imports_and_global_fallback() {
    let fx = Fixture::new(&[
        (
            "Contracts/Queue.php",
            r#"<?php
namespace Contracts;
use Errors\QueueFull;
interface Queue {
    /**
     * @throws QueueFull
     * @throws RuntimeException
     */
    public function push($job);
}
"#,
        ),
        ("Errors/QueueFull.php", "<?php namespace Errors; class QueueFull extends \\Exception {}"),
        (
            "Impl/MemoryQueue.php",
            r#"<?php
namespace Impl;
use Errors\QueueFull as Full;
class MemoryQueue implements \Contracts\Queue {
    /**
     * @throws Full
     * @throws \UnexpectedValueException
     */
    public function push($job) {
        throw new \OverflowException();
    }
}
"#,
        ),
    ]);
    assert!(fx.violations("Impl\\MemoryQueue").is_empty());
}

#[test]
fn unknown_subject_or_contract_is_a_load_error() {
    let fx = Fixture::single("<?php class Plugin extends Vendor\\BasePlugin {}");
    assert_eq!(fx.check("Nope"), Err(LoadError::ClassNotFound("Nope".to_string())));
    assert_eq!(
        fx.check("Plugin"),
        Err(LoadError::UnresolvedContract {
            class: "Plugin".to_string(),
            contract: "Vendor\\BasePlugin".to_string(),
        })
    );
}

#[test]
fn results_are_deterministic() {
    let source = r#"<?php
interface Api {
    /** @throws LogicException */
    public function call(array $args): mixed;
}
class Client implements Api {
    /** @throws RuntimeException|DomainException|OverflowException */
    public function call(array $args): mixed {
        match (count($args)) {
            0 => throw new UnderflowException(),
            1 => throw new DomainException(),
            default => $this->send($args),
        };
    }
    private function send(array $args) { throw new RangeException(); }
}
"#;
    let first = Fixture::single(source).rendered("Client");
    for _ in 0..5 {
        assert_eq!(Fixture::single(source).rendered("Client"), first);
    }
    assert_eq!(first.len(), 4);
}

#[test]
fn callable_creation_is_not_an_invocation() {
    let fx = Fixture::single(
        r#"<?php
interface Source { public function reader(): \Closure; }
class Lazy implements Source {
    public function reader(): \Closure { return $this->load(...); }
    private function load() { throw new RuntimeException(); }
}
"#,
    );
    assert!(fx.violations("Lazy").is_empty());
}
