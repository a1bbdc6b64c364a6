//! Integration test: human-facing output of `rulegate check` and `rulegate list-rules`.

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

// ── list-rules ──────────────────────────────────────────────────────

#[test]
fn list_rules_reports_shadowed_duplicates() {
    let project = TempDir::new().unwrap();
    let rules = project.path().join(".agent/rules");
    fs::create_dir_all(rules.join("team")).unwrap();
    fs::write(rules.join("style.txt"), "error: No TODO :: TODO\n").unwrap();
    fs::write(rules.join("team/style.txt"), "error: No FIXME :: FIXME\n").unwrap();

    let output = rulegate(&["list-rules"], project.path());
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 rule(s)"), "{stdout}");
    assert!(stdout.contains("not enforced"), "{stdout}");
    assert!(stdout.contains("team/style.txt") || stdout.contains("team\\style.txt"), "{stdout}");
    assert!(stdout.contains("1 shadowed rule(s)"), "{stdout}");
}

#[test]
fn list_rules_without_duplicates_has_no_shadowed_section() {
    let project = TempDir::new().unwrap();
    let rules = project.path().join(".agent/rules");
    fs::create_dir_all(&rules).unwrap();
    fs::write(rules.join("style.txt"), "warn: No var :: var\n").unwrap();

    let output = rulegate(&["list-rules"], project.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("style.txt-line1"), "{stdout}");
    assert!(!stdout.contains("Shadowed"), "{stdout}");
}

// ── check --format text ─────────────────────────────────────────────

#[test]
fn text_format_groups_errors_before_infos() {
    let project = TempDir::new().unwrap();
    let rules = project.path().join(".agent/rules");
    fs::create_dir_all(&rules).unwrap();
    fs::write(rules.join("rules.txt"), "info: Note var :: var\nerror: No TODO :: TODO\n").unwrap();
    fs::write(project.path().join("main.js"), "// TODO\nvar x;\n").unwrap();

    let output = rulegate(&["check", "--format", "text"], project.path());
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let error_pos = stdout.find("== error (1) ==").expect("error group");
    let info_pos = stdout.find("== info (1) ==").expect("info group");
    assert!(error_pos < info_pos, "{stdout}");
    assert!(!stdout.contains("== warn"), "{stdout}");
    assert!(
        stdout.contains("Found 1 error(s), 0 warning(s), 1 info(s) in 1 file(s)"),
        "{stdout}"
    );
}

#[test]
fn every_format_succeeds_on_a_clean_project() {
    let project = TempDir::new().unwrap();
    let rules = project.path().join(".agent/rules");
    fs::create_dir_all(&rules).unwrap();
    fs::write(rules.join("rules.txt"), "error: No TODO :: TODO\n").unwrap();
    fs::write(project.path().join("main.js"), "let x = 1;\n").unwrap();

    for format in ["text", "json", "compact"] {
        let output = rulegate(&["check", "--format", format], project.path());
        assert_eq!(output.status.code(), Some(0), "format {format}");
    }
}
