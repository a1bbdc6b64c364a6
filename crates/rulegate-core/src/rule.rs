//! Canonical in-memory rule model.
//!
//! Rules are built only through the parsers, which validate every field, so
//! a [`Rule`] value always carries a non-empty pattern and compiled globs.

use crate::types::Severity;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Flags applied when a rule does not declare any.
pub const DEFAULT_FLAGS: &str = "g";

/// A validated glob pattern for file path matching.
///
/// The glob is compiled once at construction and reused for all match calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    raw: String,
    compiled: glob::Pattern,
}

impl GlobPattern {
    /// Creates a new glob pattern.
    ///
    /// # Errors
    ///
    /// Returns the reason if the pattern is empty or has invalid glob syntax.
    pub fn new(pattern: &str) -> Result<Self, String> {
        if pattern.is_empty() {
            return Err("glob pattern must not be empty".to_string());
        }
        let compiled = glob::Pattern::new(pattern).map_err(|e| e.to_string())?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a file path matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        if self.compiled.matches(&path_str) {
            return true;
        }
        // `glob::Pattern` needs `dir/**` to match at least one more segment;
        // treat it as a prefix with a separator boundary instead.
        if let Some(prefix) = self.raw.strip_suffix("/**") {
            let normalized = prefix.trim_end_matches('/');
            if path_str.starts_with(normalized)
                && path_str
                    .as_bytes()
                    .get(normalized.len())
                    .is_some_and(|&b| b == b'/')
            {
                return true;
            }
        }
        false
    }

    /// Returns the pattern as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// What a rule matches and where it applies.
#[derive(Debug, Clone)]
pub struct MatchSpec {
    pattern: String,
    flags: String,
    languages: BTreeSet<String>,
    path_include: Vec<GlobPattern>,
    path_exclude: Vec<GlobPattern>,
    compiled: OnceLock<Result<Regex, String>>,
}

impl MatchSpec {
    /// Creates a match spec with default flags and no filters.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: DEFAULT_FLAGS.to_string(),
            languages: BTreeSet::new(),
            path_include: Vec::new(),
            path_exclude: Vec::new(),
            compiled: OnceLock::new(),
        }
    }

    /// Sets the regex flags. An empty string falls back to [`DEFAULT_FLAGS`].
    #[must_use]
    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        let flags = flags.into();
        self.flags = if flags.is_empty() {
            DEFAULT_FLAGS.to_string()
        } else {
            flags
        };
        self
    }

    /// Restricts the rule to the given language ids.
    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the include globs.
    #[must_use]
    pub fn with_path_include(mut self, globs: Vec<GlobPattern>) -> Self {
        self.path_include = globs;
        self
    }

    /// Sets the exclude globs.
    #[must_use]
    pub fn with_path_exclude(mut self, globs: Vec<GlobPattern>) -> Self {
        self.path_exclude = globs;
        self
    }

    /// Regex source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Regex flags.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Language ids the rule is limited to; empty means all.
    #[must_use]
    pub fn languages(&self) -> &BTreeSet<String> {
        &self.languages
    }

    /// Include globs; empty means all paths.
    #[must_use]
    pub fn path_include(&self) -> &[GlobPattern] {
        &self.path_include
    }

    /// Exclude globs; these always win over includes.
    #[must_use]
    pub fn path_exclude(&self) -> &[GlobPattern] {
        &self.path_exclude
    }

    /// Whether matching reports every match (`g`) or only the first.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    /// Returns the compiled regex, compiling it on first use.
    ///
    /// The outcome, including a compile error, is cached for the lifetime of
    /// the rule.
    pub(crate) fn compiled(&self) -> &Result<Regex, String> {
        self.compiled.get_or_init(|| {
            let compiled = crate::matcher::compile(&self.pattern, &self.flags);
            if let Err(reason) = &compiled {
                tracing::warn!("Pattern `{}` does not compile: {reason}", self.pattern);
            }
            compiled
        })
    }
}

/// Where an [`Fix::Insert`] places its text relative to the finding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertPosition {
    /// Before the matched text.
    #[default]
    Start,
    /// After the matched text.
    End,
}

/// A rule's declared quick fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fix {
    /// Replace the whole span. `None` yields no edit.
    Replace {
        /// Replacement text.
        replacement: Option<String>,
    },
    /// Insert text next to the span.
    Insert {
        /// Text to insert. `None` inserts nothing.
        text: Option<String>,
        /// Which end of the span to insert at.
        position: InsertPosition,
    },
    /// Delete the whole span.
    Delete,
}

/// A loaded rule. Immutable once admitted to a rule set.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    severity: Severity,
    message: String,
    matcher: MatchSpec,
    fix: Option<Fix>,
    origin: Option<PathBuf>,
}

impl Rule {
    /// Creates a new rule without a fix.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        matcher: MatchSpec,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            matcher,
            fix: None,
            origin: None,
        }
    }

    /// Attaches a quick fix.
    #[must_use]
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Records the file this rule was loaded from.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Unique id within the active set.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Severity of findings produced by this rule.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Pattern and filters.
    #[must_use]
    pub fn matcher(&self) -> &MatchSpec {
        &self.matcher
    }

    /// Declared quick fix, if any.
    #[must_use]
    pub fn fix(&self) -> Option<&Fix> {
        self.fix.as_ref()
    }

    /// Source file of this rule.
    #[must_use]
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}
