//! Decides when match passes run and where their findings go.
//!
//! Edits are debounced per document: each change aborts the document's pending
//! timer and starts a new one, so a burst of edits produces one pass on the
//! last text. Opening or saving a document runs a pass immediately.

use crate::config::ScanConfig;
use crate::matcher::Document;
use crate::rule::GlobPattern;
use crate::store::{LoadOutcome, RuleSet, RuleStore};
use crate::types::{Finding, ScanReport};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directory names pruned from bulk scans unless include globs are given.
pub const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    ".venv",
    "__pycache__",
];

/// Identifies an open document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(PathBuf);

impl DocumentId {
    /// Path of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for DocumentId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for DocumentId {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl From<&Document> for DocumentId {
    fn from(doc: &Document) -> Self {
        Self(doc.path.clone())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Host surface that displays findings per document.
pub trait DiagnosticsSink: Send + Sync + 'static {
    /// Replaces the findings shown for `document`.
    fn publish(&self, document: &DocumentId, findings: Vec<Finding>);

    /// Removes the findings shown for `document`.
    fn clear(&self, document: &DocumentId);

    /// Removes all findings.
    fn clear_all(&self);
}

/// Host surface for user-facing notices.
pub trait Notifier: Send + Sync + 'static {
    /// Shows an informational notice.
    fn info(&self, message: &str);

    /// Shows an error notice.
    fn error(&self, message: &str);
}

/// Options for a bulk workspace scan.
#[derive(Debug, Clone)]
pub struct BulkScanOptions {
    /// Stop after this many files; `None` scans everything.
    pub max_files: Option<usize>,
    /// When non-empty, only matching files are scanned and no directory is
    /// pruned.
    pub include: Vec<GlobPattern>,
    /// Files matching any of these are never scanned.
    pub exclude: Vec<GlobPattern>,
}

impl Default for BulkScanOptions {
    fn default() -> Self {
        Self {
            max_files: Some(crate::config::DEFAULT_MAX_FILES),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl BulkScanOptions {
    /// Builds options from the `[scan]` config section.
    ///
    /// Invalid globs are logged and ignored.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            max_files: Some(config.max_files),
            include: compile_globs(&config.include, "include"),
            exclude: compile_globs(&config.exclude, "exclude"),
        }
    }

    /// Sets the file cap.
    #[must_use]
    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    /// Sets the include globs.
    #[must_use]
    pub fn with_include(mut self, include: Vec<GlobPattern>) -> Self {
        self.include = include;
        self
    }
}

fn compile_globs(raw: &[String], field: &str) -> Vec<GlobPattern> {
    raw.iter()
        .filter_map(|g| match GlobPattern::new(g) {
            Ok(glob) => Some(glob),
            Err(reason) => {
                warn!("Ignoring invalid scan {field} glob `{g}`: {reason}");
                None
            }
        })
        .collect()
}

/// Scans every eligible file under `root` against `rules`.
///
/// Paths in findings are relative to `root`. Files that are not valid UTF-8
/// are skipped silently and counted in `files_skipped`.
#[must_use]
pub fn bulk_scan(root: &Path, rules: &RuleSet, options: &BulkScanOptions) -> ScanReport {
    scan_tree(root, rules, options, |_, _| {})
}

fn scan_tree<F>(root: &Path, rules: &RuleSet, options: &BulkScanOptions, mut on_file: F) -> ScanReport
where
    F: FnMut(&Path, &[Finding]),
{
    let mut report = ScanReport::new();
    let prune = options.include.is_empty();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(prune && e.depth() > 0 && e.file_type().is_dir() && is_skipped_dir(e.file_name())));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if options.exclude.iter().any(|g| g.matches(relative)) {
            continue;
        }
        if !options.include.is_empty() && !options.include.iter().any(|g| g.matches(relative)) {
            continue;
        }

        if options.max_files.is_some_and(|max| report.files_scanned >= max) {
            report.capped = true;
            break;
        }

        let text = match std::fs::read(entry.path()).map(String::from_utf8) {
            Ok(Ok(text)) => text,
            Ok(Err(_)) => {
                report.files_skipped += 1;
                continue;
            }
            Err(e) => {
                debug!("Skipping {}: {e}", entry.path().display());
                report.files_skipped += 1;
                continue;
            }
        };

        let doc = Document::from_path(relative, text);
        let findings = doc.match_rules(rules.rules());
        on_file(relative, &findings);
        report.files_scanned += 1;
        report.findings.extend(findings);
    }

    let (errors, warnings, infos) = report.count_by_severity();
    info!(
        "Scanned {} file(s) ({} skipped{}): {errors} error(s), {warnings} warning(s), {infos} info(s)",
        report.files_scanned,
        report.files_skipped,
        if report.capped { ", capped" } else { "" }
    );
    report
}

fn is_skipped_dir(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| SKIPPED_DIRS.contains(&n))
}

/// Owns open documents and their debounce timers.
///
/// Must be used from within a tokio runtime; timers are spawned tasks.
pub struct ScanScheduler<S: DiagnosticsSink, N: Notifier> {
    store: Arc<RuleStore>,
    sink: Arc<S>,
    notifier: Arc<N>,
    rules_root: PathBuf,
    debounce: Duration,
    documents: HashMap<DocumentId, Document>,
    timers: HashMap<DocumentId, JoinHandle<()>>,
}

impl<S: DiagnosticsSink, N: Notifier> ScanScheduler<S, N> {
    /// Creates a scheduler that reloads rules from `rules_root`.
    #[must_use]
    pub fn new(store: Arc<RuleStore>, sink: Arc<S>, notifier: Arc<N>, rules_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            sink,
            notifier,
            rules_root: rules_root.into(),
            debounce: Duration::from_millis(crate::config::DEFAULT_DEBOUNCE_MS),
            documents: HashMap::new(),
            timers: HashMap::new(),
        }
    }

    /// Sets the on-change debounce interval.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// The rule store this scheduler matches against.
    #[must_use]
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Whether `id` is currently open.
    #[must_use]
    pub fn is_open(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    /// Matches `doc` against the active rules without publishing.
    #[must_use]
    pub fn check(&self, doc: &Document) -> Vec<Finding> {
        doc.match_rules(self.store.active_rules().rules())
    }

    /// Schedules a debounced pass for an edited document.
    pub fn on_change(&mut self, doc: Document) {
        let id = DocumentId::from(&doc);
        self.cancel_timer(&id);
        self.timers.retain(|_, handle| !handle.is_finished());

        let store = Arc::clone(&self.store);
        let sink = Arc::clone(&self.sink);
        let debounce = self.debounce;
        let task_id = id.clone();
        let task_doc = doc.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let findings = task_doc.match_rules(store.active_rules().rules());
            debug!("Debounced pass on {task_id}: {} finding(s)", findings.len());
            sink.publish(&task_id, findings);
        });

        self.documents.insert(id.clone(), doc);
        self.timers.insert(id, handle);
    }

    /// Runs a pass for a newly opened document.
    pub fn on_open(&mut self, doc: Document) {
        self.run_now(doc);
    }

    /// Runs a pass for a saved document, superseding any pending timer.
    pub fn on_save(&mut self, doc: Document) {
        self.run_now(doc);
    }

    /// Forgets a closed document and clears its findings.
    pub fn on_close(&mut self, id: &DocumentId) {
        self.cancel_timer(id);
        self.documents.remove(id);
        self.sink.clear(id);
    }

    /// Scans the workspace under `root`, publishing findings per file.
    pub fn bulk_scan(&self, root: &Path, options: &BulkScanOptions) -> ScanReport {
        let rules = self.store.active_rules();
        let sink = Arc::clone(&self.sink);
        scan_tree(root, &rules, options, |relative, findings| {
            sink.publish(&DocumentId::from(root.join(relative)), findings.to_vec());
        })
    }

    /// Reloads rules and re-matches every open document.
    ///
    /// A failed reload keeps the previous rules and is reported through the
    /// notifier; open documents are re-matched either way.
    pub fn on_rules_changed(&mut self) {
        match self.store.load(&self.rules_root) {
            Ok(LoadOutcome::MissingDirectory { first_notice: true }) => {
                self.notifier.info(&format!(
                    "No rules directory at {}; rule checks are inactive",
                    self.rules_root.display()
                ));
            }
            Ok(_) => {}
            Err(e) => self.notifier.error(&format!("Failed to reload rules: {e}")),
        }

        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        let rules = self.store.active_rules();
        for (id, doc) in &self.documents {
            self.sink.publish(id, doc.match_rules(rules.rules()));
        }
        debug!("Re-matched {} open document(s)", self.documents.len());
    }

    /// Cancels all timers and clears all findings.
    pub fn shutdown(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        self.documents.clear();
        self.sink.clear_all();
    }

    fn run_now(&mut self, doc: Document) {
        let id = DocumentId::from(&doc);
        self.cancel_timer(&id);
        let findings = self.check(&doc);
        self.documents.insert(id.clone(), doc);
        self.sink.publish(&id, findings);
    }

    fn cancel_timer(&mut self, id: &DocumentId) {
        if let Some(handle) = self.timers.remove(id) {
            handle.abort();
        }
    }
}

impl<S: DiagnosticsSink, N: Notifier> Drop for ScanScheduler<S, N> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
