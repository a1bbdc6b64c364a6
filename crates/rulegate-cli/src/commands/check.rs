//! Check command implementation.

use anyhow::{Context, Result};
use rulegate_core::{
    apply_edits, bulk_scan, synthesize, BulkScanOptions, GlobPattern, LoadOutcome, RuleSet,
    RuleStore, ScanReport, TextEdit,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Arguments of the check command.
pub struct CheckArgs {
    /// Project root to scan.
    pub path: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Rules directory override.
    pub rules_dir: Option<PathBuf>,
    /// Include globs; scanning is limited to these when given.
    pub include: Vec<String>,
    /// Apply synthesized fixes in place.
    pub fix: bool,
}

/// Runs the check command.
///
/// Exits the process with status 1 when any error finding remains.
pub fn run(args: CheckArgs, source: &ConfigSource) -> Result<()> {
    let config = source.load()?;

    let rules_root = args
        .rules_dir
        .clone()
        .unwrap_or_else(|| args.path.join(&config.scan.rules_path));

    let store = RuleStore::new();
    match store
        .load(&rules_root)
        .with_context(|| format!("Failed to load rules from {}", rules_root.display()))?
    {
        LoadOutcome::MissingDirectory { .. } => {
            tracing::info!("No rules directory at {}; nothing to check", rules_root.display());
        }
        LoadOutcome::Loaded { rule_count, .. } => {
            tracing::info!("Checking {:?} with {rule_count} rule(s)", args.path);
        }
    }
    let rules = store.active_rules();

    // Build integration scans the whole project.
    let mut options = BulkScanOptions::from_config(&config.scan).with_max_files(None);
    if !args.include.is_empty() {
        let include = args
            .include
            .iter()
            .map(|g| GlobPattern::new(g).map_err(|e| anyhow::anyhow!("Invalid --include glob `{g}`: {e}")))
            .collect::<Result<Vec<_>>>()?;
        options = options.with_include(include);
    }
    if let Some(glob) = rules_dir_glob(&args.path, &rules_root) {
        options.exclude.push(glob);
    }

    let mut report = bulk_scan(&args.path, &rules, &options);

    if args.fix {
        let fixed = apply_fixes(&args.path, &rules, &report)?;
        if fixed > 0 {
            tracing::info!("Applied {fixed} fix(es); re-checking");
            report = bulk_scan(&args.path, &rules, &options);
        }
    }

    super::output::print(&report, &args.path, args.format)?;

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Glob covering the rules directory when it lives inside the scanned tree.
fn rules_dir_glob(root: &Path, rules_root: &Path) -> Option<GlobPattern> {
    let (root, rules_root) = match (root.canonicalize(), rules_root.canonicalize()) {
        (Ok(root), Ok(rules_root)) => (root, rules_root),
        _ => (root.to_path_buf(), rules_root.to_path_buf()),
    };
    let relative = rules_root.strip_prefix(&root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    let raw = relative.to_string_lossy().replace('\\', "/");
    GlobPattern::new(&format!("{}/**", raw.trim_end_matches('/'))).ok()
}

/// Writes synthesized fixes back to disk and returns how many were applied.
fn apply_fixes(root: &Path, rules: &RuleSet, report: &ScanReport) -> Result<usize> {
    let mut per_file: BTreeMap<&Path, Vec<TextEdit>> = BTreeMap::new();
    for finding in &report.findings {
        let Some(rule) = rules.get(&finding.rule_id) else {
            continue;
        };
        if let Some(edit) = synthesize(finding, rule) {
            per_file.entry(finding.source.as_path()).or_default().push(edit);
        }
    }

    let mut total = 0;
    for (relative, edits) in per_file {
        let path = root.join(relative);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let (fixed, applied) = apply_edits(&text, &edits);
        if applied == 0 {
            continue;
        }
        std::fs::write(&path, fixed).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("{}: applied {applied} fix(es)", path.display());
        total += applied;
    }
    Ok(total)
}
