//! Rule store: loads a rules directory and serves the active rule set.
//!
//! Loads are all-or-nothing. The new set replaces the active one with a single
//! pointer swap, so a match pass in flight sees either the old set or the new
//! one. A failed load puts the last good set back.

use crate::parser::{parse_rules, ParseError, RuleFormat};
use crate::rule::Rule;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Errors that abort a whole load.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The directory could not be traversed.
    #[error("Failed to traverse rules directory {path}: {source}")]
    Walk {
        /// Directory being traversed.
        path: PathBuf,
        /// Underlying traversal error.
        source: walkdir::Error,
    },

    /// A rule file could not be read.
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A rule file is not parseable as its format.
    #[error("Failed to parse rule file {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        source: ParseError,
    },
}

/// Result of a successful [`RuleStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Rules were loaded from the directory.
    Loaded {
        /// Rules in the new active set.
        rule_count: usize,
        /// Rule files that were parsed.
        file_count: usize,
    },
    /// The rules directory does not exist; the active set is now empty.
    MissingDirectory {
        /// `true` only the first time this store sees a missing directory.
        first_notice: bool,
    },
}

/// An immutable, ordered set of rules with unique ids.
///
/// Later rules reusing an id are not enforced. They are kept aside so hosts
/// can report the collision.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    shadowed: Vec<Rule>,
}

impl RuleSet {
    /// Builds a set, keeping the first rule for each id.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(rules.len());
        let mut shadowed = Vec::new();
        for rule in rules {
            if seen.insert(rule.id().to_string()) {
                kept.push(rule);
            } else {
                warn!(
                    "Duplicate rule id `{}` in {}; it is shadowed by the first definition and not enforced",
                    rule.id(),
                    rule.origin().map_or_else(|| "<unknown>".into(), |p| p.display().to_string())
                );
                shadowed.push(rule);
            }
        }
        Self {
            rules: kept,
            shadowed,
        }
    }

    /// Rules dropped because an earlier rule already used their id.
    #[must_use]
    pub fn shadowed(&self) -> &[Rule] {
        &self.shadowed
    }

    /// Rules in load order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Looks up a rule by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id() == id)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Owner of the active rule set and its rollback snapshot.
#[derive(Debug, Default)]
pub struct RuleStore {
    active: RwLock<Arc<RuleSet>>,
    last_good: RwLock<Arc<RuleSet>>,
    missing_noticed: AtomicBool,
}

impl RuleStore {
    /// Creates a store with an empty active set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose active set is built from `rules`.
    #[must_use]
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let store = Self::default();
        store.swap(Arc::new(RuleSet::new(rules)));
        store
    }

    /// Current active set.
    #[must_use]
    pub fn active_rules(&self) -> Arc<RuleSet> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Loads every rule file under `root` and swaps in the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if traversal, reading or parsing of any file
    /// fails. The previous good set stays active in that case.
    pub fn load(&self, root: &Path) -> Result<LoadOutcome, StoreError> {
        if !root.is_dir() {
            self.swap(Arc::new(RuleSet::default()));
            let first_notice = !self.missing_noticed.swap(true, Ordering::SeqCst);
            info!("Rules directory {} not found; no rules active", root.display());
            return Ok(LoadOutcome::MissingDirectory { first_notice });
        }

        match collect_rules(root) {
            Ok((rules, file_count)) => {
                let set = Arc::new(RuleSet::new(rules));
                let rule_count = set.len();
                self.swap(set);
                info!(
                    "Loaded {rule_count} rule(s) from {file_count} file(s) in {}",
                    root.display()
                );
                Ok(LoadOutcome::Loaded {
                    rule_count,
                    file_count,
                })
            }
            Err(e) => {
                self.rollback();
                error!("Rule load aborted, keeping previous rules: {e}");
                Err(e)
            }
        }
    }

    fn swap(&self, set: Arc<RuleSet>) {
        *self.last_good.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&set);
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = set;
    }

    fn rollback(&self) {
        let snapshot = Arc::clone(&self.last_good.read().unwrap_or_else(PoisonError::into_inner));
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

/// Walks `root` in file-name order and parses every recognized rule file.
fn collect_rules(root: &Path) -> Result<(Vec<Rule>, usize), StoreError> {
    let mut rules = Vec::new();
    let mut file_count = 0;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| StoreError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(format) = RuleFormat::from_path(path) else {
            debug!("Skipping non-rule file: {}", path.display());
            continue;
        };

        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = parse_rules(&content, format, path).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("{}: {} rule(s)", path.display(), parsed.len());
        rules.extend(parsed);
        file_count += 1;
    }

    Ok((rules, file_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchSpec;
    use crate::types::Severity;
    use std::fs;
    use tempfile::TempDir;

    fn ids(store: &RuleStore) -> Vec<String> {
        store
            .active_rules()
            .rules()
            .iter()
            .map(|r| r.id().to_string())
            .collect()
    }

    #[test]
    fn rule_set_keeps_first_duplicate() {
        let set = RuleSet::new(vec![
            Rule::new("a", Severity::Error, "first", MatchSpec::new("x")),
            Rule::new("b", Severity::Warn, "b", MatchSpec::new("y")),
            Rule::new("a", Severity::Info, "second", MatchSpec::new("z")),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a").unwrap().message(), "first");
        assert_eq!(set.shadowed().len(), 1);
        assert_eq!(set.shadowed()[0].message(), "second");
    }

    #[test]
    fn same_named_line_files_report_shadowed_rules() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/style.txt"), "error: no TODO :: TODO\n").unwrap();
        fs::write(dir.path().join("b/style.txt"), "error: no FIXME :: FIXME\n").unwrap();

        let store = RuleStore::new();
        store.load(dir.path()).unwrap();
        let rules = store.active_rules();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get("style.txt-line1").unwrap().message(), "no TODO");
        let shadowed = rules.shadowed();
        assert_eq!(shadowed.len(), 1);
        assert_eq!(shadowed[0].message(), "no FIXME");
        assert_eq!(shadowed[0].origin(), Some(dir.path().join("b/style.txt").as_path()));
    }

    #[test]
    fn loads_all_formats_recursively() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            "rules:\n  - id: y1\n    message: m\n    match:\n      pattern: foo\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/b.json"),
            r#"{"rules":[{"id":"j1","message":"m","match":{"pattern":"bar"}}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("c.txt"), "error: No TODO :: TODO\n").unwrap();
        fs::write(dir.path().join("README.md"), "not a rule file").unwrap();

        let store = RuleStore::new();
        let outcome = store.load(dir.path()).unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                rule_count: 3,
                file_count: 3
            }
        );
        assert_eq!(ids(&store), vec!["y1", "c.txt-line1", "j1"]);
    }

    #[test]
    fn broken_file_rolls_back_to_previous_set() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("rules.json");
        fs::write(&file, r#"{"rules":[{"id":"keep","message":"m","match":{"pattern":"x"}}]}"#).unwrap();

        let store = RuleStore::new();
        store.load(dir.path()).unwrap();
        assert_eq!(ids(&store), vec!["keep"]);

        fs::write(dir.path().join("other.json"), "{ not json").unwrap();
        let err = store.load(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert_eq!(ids(&store), vec!["keep"]);
    }

    #[test]
    fn missing_directory_notices_once() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let store = RuleStore::new();

        assert_eq!(
            store.load(&missing).unwrap(),
            LoadOutcome::MissingDirectory { first_notice: true }
        );
        assert_eq!(
            store.load(&missing).unwrap(),
            LoadOutcome::MissingDirectory { first_notice: false }
        );
        assert!(store.active_rules().is_empty());
    }

    #[test]
    fn active_set_survives_a_later_swap() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.txt"), "warn: one :: one\n").unwrap();
        let store = RuleStore::new();
        store.load(dir.path()).unwrap();

        let held = store.active_rules();
        fs::write(dir.path().join("r.txt"), "warn: two :: two\nwarn: three :: three\n").unwrap();
        store.load(dir.path()).unwrap();

        assert_eq!(held.len(), 1);
        assert_eq!(store.active_rules().len(), 2);
    }
}
