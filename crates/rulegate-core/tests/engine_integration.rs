//! Integration test: rule files to findings, fixes and write decisions.
//!
//! Uses fixture files under `tests/fixtures/engine/` to verify that the full
//! rule file → store → matcher → fix / enforcement pipeline behaves as a host
//! would see it.

use rulegate_core::{
    apply_edits, bulk_scan, synthesize, BulkScanOptions, Document, EnforcementMode,
    EnforcementSettings, Enforcer, LoadOutcome, Resolution, RuleStore, Severity, StoreError,
    WriteDecision,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/engine")
}

fn loaded_store() -> RuleStore {
    let store = RuleStore::new();
    store
        .load(&fixture_root().join("rules"))
        .expect("fixture rules should load");
    store
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), to.join(entry.file_name())).unwrap();
    }
}

// ── Loading ──

#[test]
fn loads_valid_rules_and_drops_invalid_ones() {
    let store = RuleStore::new();
    let outcome = store.load(&fixture_root().join("rules")).unwrap();

    // base.yaml has 2 valid + 2 invalid rules
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            rule_count: 4,
            file_count: 3
        }
    );

    let rules = store.active_rules();
    let ids: Vec<&str> = rules.rules().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["no-todo", "no-var", "no-console", "team.rules-line2"]);
    assert_eq!(rules.get("team.rules-line2").unwrap().severity(), Severity::Error);
}

#[test]
fn failed_reload_keeps_previous_rules() {
    let dir = TempDir::new().unwrap();
    copy_dir(&fixture_root().join("rules"), dir.path());

    let store = RuleStore::new();
    store.load(dir.path()).unwrap();

    fs::write(dir.path().join("zz-broken.yaml"), "rules: [\n").unwrap();
    let err = store.load(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got {err}");
    assert_eq!(store.active_rules().len(), 4);

    fs::remove_file(dir.path().join("zz-broken.yaml")).unwrap();
    fs::remove_file(dir.path().join("base.yaml")).unwrap();
    store.load(dir.path()).unwrap();
    assert_eq!(store.active_rules().len(), 2);
}

// ── Scanning ──

#[test]
fn bulk_scan_reports_expected_findings() {
    let store = loaded_store();
    let report = bulk_scan(
        &fixture_root().join("workspace"),
        &store.active_rules(),
        &BulkScanOptions::default(),
    );

    assert_eq!(report.files_scanned, 2);
    let found: Vec<(&str, usize)> = report
        .findings
        .iter()
        .map(|f| (f.rule_id.as_str(), f.line))
        .collect();
    // console.log in src/generated is excluded by path
    assert_eq!(found, vec![("no-todo", 1), ("no-var", 2), ("no-console", 3)]);
    assert!(report.has_errors());
    assert_eq!(report.count_by_severity(), (1, 1, 1));
}

#[test]
fn empty_rules_directory_produces_no_findings() {
    let rules_dir = TempDir::new().unwrap();
    let store = RuleStore::new();
    store.load(rules_dir.path()).unwrap();

    let report = bulk_scan(
        &fixture_root().join("workspace"),
        &store.active_rules(),
        &BulkScanOptions::default(),
    );
    assert!(store.active_rules().is_empty());
    assert!(report.findings.is_empty());
    assert!(!report.has_errors());
}

// ── Fixes ──

#[test]
fn applying_fixes_clears_fixable_findings() {
    let store = loaded_store();
    let rules = store.active_rules();
    let path = fixture_root().join("workspace/src/app.ts");
    let text = fs::read_to_string(&path).unwrap();
    let doc = Document::from_path("src/app.ts", text);

    let findings = doc.match_rules(rules.rules());
    let edits: Vec<_> = findings
        .iter()
        .filter_map(|f| synthesize(f, rules.get(&f.rule_id)?))
        .collect();
    assert_eq!(edits.len(), 2);

    let (fixed, applied) = apply_edits(&doc.text, &edits);
    assert_eq!(applied, 2);
    assert!(fixed.contains("let count = 0;"));
    assert!(!fixed.contains("console.log"));

    let remaining = Document::from_path("src/app.ts", fixed).match_rules(rules.rules());
    let ids: Vec<&str> = remaining.iter().map(|f| f.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["no-todo"]);
}

// ── Enforcement ──

#[test]
fn draconian_blocks_without_override() {
    let store = loaded_store();
    let doc = Document::from_path("src/app.ts", "// TODO\n");
    let findings = doc.match_rules(store.active_rules().rules());

    let enforcer = Enforcer::new(EnforcementMode::Draconian, EnforcementSettings::default());
    match enforcer.decide(&findings) {
        WriteDecision::Block(prompt) => {
            assert_eq!(prompt.error_count, 1);
            assert_eq!(prompt.choices, vec![Resolution::FixNow, Resolution::Cancel]);
        }
        WriteDecision::Allow => panic!("draconian mode should block on errors"),
    }

    let mut passive = enforcer;
    passive.set_mode(EnforcementMode::Passive);
    assert_eq!(passive.decide(&findings), WriteDecision::Allow);
}
