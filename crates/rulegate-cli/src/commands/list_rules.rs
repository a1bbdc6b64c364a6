//! List rules command implementation.

use anyhow::{Context, Result};
use rulegate_core::{LoadOutcome, RuleStore};
use std::path::{Path, PathBuf};

use crate::config_resolver::ConfigSource;

/// Runs the list-rules command.
pub fn run(path: &Path, rules_dir: Option<PathBuf>, source: &ConfigSource) -> Result<()> {
    let config = source.load()?;
    let rules_root = rules_dir.unwrap_or_else(|| path.join(&config.scan.rules_path));

    let store = RuleStore::new();
    let outcome = store
        .load(&rules_root)
        .with_context(|| format!("Failed to load rules from {}", rules_root.display()))?;
    if let LoadOutcome::MissingDirectory { .. } = outcome {
        println!("No rules directory at {}", rules_root.display());
        return Ok(());
    }

    let rules = store.active_rules();
    println!("Active rules in {}:\n", rules_root.display());
    println!("{:<30} {:<8} {:<6} Message", "Id", "Severity", "Fix");
    println!("{}", "-".repeat(80));

    for rule in rules.rules() {
        println!(
            "{:<30} {:<8} {:<6} {}",
            rule.id(),
            rule.severity().to_string(),
            if rule.fix().is_some() { "yes" } else { "-" },
            rule.message()
        );
    }

    println!("\n{} rule(s)", rules.len());

    let shadowed = rules.shadowed();
    if !shadowed.is_empty() {
        println!("\nShadowed by an earlier rule with the same id (not enforced):\n");
        for rule in shadowed {
            println!(
                "{:<30} {}",
                rule.id(),
                rule.origin().map_or_else(|| "<unknown>".into(), |p| p.display().to_string())
            );
        }
        println!("\n{} shadowed rule(s)", shadowed.len());
    }
    Ok(())
}
