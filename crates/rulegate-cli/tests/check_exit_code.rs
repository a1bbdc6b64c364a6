//! Integration test: `rulegate check` exit status for build pipelines.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn rulegate(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rulegate"))
        .args(args)
        .current_dir(cwd)
        .env("RULEGATE_CONFIG_DIR", cwd.join("no-global-config"))
        .output()
        .expect("binary should run")
}

fn project_with_rules(rules: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".agent/rules")).unwrap();
    fs::write(tmp.path().join(".agent/rules/rules.txt"), rules).unwrap();
    fs::write(tmp.path().join("main.js"), "// TODO fix this\nvar x;\n").unwrap();
    tmp
}

#[test]
fn error_finding_exits_one() {
    let project = project_with_rules("error: No TODO :: TODO\n");
    let output = rulegate(&["check", "--format", "compact"], project.path());

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("main.js:1:4: error [rules.txt-line1] No TODO"), "{stdout}");
}

#[test]
fn severity_without_colon_still_fails_build() {
    let project = project_with_rules("error No TODO :: TODO\n");
    let output = rulegate(&["check", "--format", "compact"], project.path());

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error [rules.txt-line1] No TODO"), "{stdout}");
}

#[test]
fn warnings_only_exit_zero() {
    let project = project_with_rules("warn: No var :: \\bvar\\b\n");
    let output = rulegate(&["check", "--format", "compact"], project.path());
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn empty_rules_directory_exits_zero() {
    let project = TempDir::new().unwrap();
    fs::create_dir_all(project.path().join(".agent/rules")).unwrap();
    fs::write(project.path().join("main.js"), "// TODO\n").unwrap();

    let output = rulegate(&["check"], project.path());
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn fix_rewrites_and_rechecks() {
    let project = TempDir::new().unwrap();
    let rules = project.path().join("policy");
    fs::create_dir_all(&rules).unwrap();
    fs::write(
        rules.join("todo.json"),
        r#"{"rules":[{"id":"no-todo","severity":"error","message":"No TODO","match":{"pattern":"TODO "},"fix":{"kind":"delete"}}]}"#,
    )
    .unwrap();
    fs::write(project.path().join("main.js"), "// TODO fix this\n").unwrap();

    let output = rulegate(&["check", "--rules-dir", "policy", "--fix"], project.path());
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        fs::read_to_string(project.path().join("main.js")).unwrap(),
        "// fix this\n"
    );
}

#[test]
fn json_report_is_machine_readable() {
    let project = project_with_rules("info: Note :: var\n");
    let output = rulegate(&["check", "--format", "json"], project.path());
    let json = String::from_utf8_lossy(&output.stdout);
    assert!(json.contains("\"rule_id\": \"rules.txt-line1\""), "{json}");
    assert!(json.contains("\"files_scanned\": 1"), "{json}");
}
