use liskov::config::Config;
use liskov::review::{audit, default_checkers, LoadError};
use liskov::{audit_files, ViolationKind};
use pretty_assertions::assert_eq;
use std::fs;

mod common;
use common::Fixture;

#[test]
fn audit_covers_classes_and_enums_in_index_order() {
    let fx = Fixture::new(&[
        (
            "a_contracts.php",
            r#"<?php
namespace Pay;
interface Gateway {
    /** @throws GatewayError */
    public function charge(int $cents): string;
}
class GatewayError extends \RuntimeException {}
class Timeout extends GatewayError {}
"#,
        ),
        (
            "b_impl.php",
            r#"<?php
namespace Pay;
class Stripe implements Gateway {
    public function charge(int $cents): string { throw new Timeout(); }
}
class Paypal implements Gateway {
    public function charge(int $cents): string { $this->login(); return 'ok'; }
    private function login() { throw new \InvalidArgumentException(); }
}
enum Currency implements \JsonSerializable {
    case Eur;
    public function jsonSerialize(): int { throw new \LogicException(); }
}
class Legacy extends \Vendor\Base {}
"#,
        ),
    ]);

    let report = audit(&fx.index, &fx.cache, &fx.config, &default_checkers());
    // GatewayError, Timeout, Stripe, Paypal, Currency, Legacy
    assert_eq!(report.checked, 6);
    assert!(report.has_violations());

    let summary: Vec<(String, String, ViolationKind)> = report
        .violations
        .iter()
        .map(|v| (v.class_name.clone(), v.contract_name.clone(), v.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Pay\\Paypal".to_string(), "Pay\\Gateway".to_string(), ViolationKind::CodeThrows),
            ("Pay\\Currency".to_string(), "JsonSerializable".to_string(), ViolationKind::CodeThrows),
        ]
    );
    assert_eq!(
        report.load_errors,
        vec![LoadError::UnresolvedContract { class: "Pay\\Legacy".into(), contract: "Vendor\\Base".into() }]
    );
}

#[test]
fn audit_files_reads_from_disk_and_skips_broken_files() {
    common::init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let contract = dir.path().join("Sink.php");
    let sink = dir.path().join("FileSink.php");
    let broken = dir.path().join("Broken.php");
    fs::write(&contract, "<?php\ninterface Sink { public function write(string $line): void; }\n").expect("write");
    fs::write(
        &sink,
        "<?php\nclass FileSink implements Sink {\n    public function write(string $line): void { throw new RuntimeException(); }\n}\n",
    )
    .expect("write");
    fs::write(&broken, "<?php\nclass Broken {\n").expect("write");

    let report = audit_files(&[contract, sink, broken], &Config::default());
    assert_eq!(report.checked, 1);
    assert_eq!(
        report.violations.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
        vec![
            "FileSink::write() — contract Sink — throws exception RuntimeException in code (detected via AST analysis), which the contract does not permit"
        ]
    );
}

#[test]
fn clean_hierarchy_has_no_violations() {
    let fx = Fixture::single(
        r#"<?php
interface Counter extends Countable { public function increment(int $by = 1): static; }
final class Tally implements Counter {
    private int $n = 0;
    public function count(): int { return $this->n; }
    public function increment(int|float $by = 1): static { $this->n += $by; return $this; }
}
"#,
    );
    let report = audit(&fx.index, &fx.cache, &fx.config, &default_checkers());
    assert_eq!(report.checked, 1);
    assert!(!report.has_violations());
    assert!(report.load_errors.is_empty());
}
