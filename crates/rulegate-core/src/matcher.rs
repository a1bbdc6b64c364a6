//! Applies rule filters and regex evaluation to one unit of text.

use crate::rule::Rule;
use crate::types::{Finding, Span};
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on findings a single rule may produce in one pass.
pub const MAX_FINDINGS_PER_RULE: usize = 10_000;

/// Upper bound on the compiled size of a rule's regex, in bytes.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A unit of text to match: its path, language id and full contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path identifying the document.
    pub path: PathBuf,
    /// Language id (e.g. `rust`, `typescript`).
    pub language_id: String,
    /// Full text.
    pub text: String,
}

impl Document {
    /// Creates a document with an explicit language id.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language_id: language_id.into(),
            text: text.into(),
        }
    }

    /// Creates a document whose language id is derived from its extension.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let language_id = language_for_path(&path).to_string();
        Self {
            path,
            language_id,
            text: text.into(),
        }
    }

    /// Runs [`match_rules`] against this document.
    #[must_use]
    pub fn match_rules(&self, rules: &[Rule]) -> Vec<Finding> {
        match_rules(&self.text, &self.path, &self.language_id, rules)
    }
}

/// Maps a file extension to an editor-style language id.
///
/// Unknown extensions map to `plaintext`.
#[must_use]
pub fn language_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "rs" => "rust",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" | "pyi" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "sh" | "bash" | "zsh" => "shellscript",
        "md" | "markdown" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sql" => "sql",
        _ => "plaintext",
    }
}

/// Compiles a rule pattern with JavaScript-style flags.
///
/// Supported flags: `g` (all matches), `i`, `m`, `s`, `u`, `d` (ignored).
///
/// # Errors
///
/// Returns a description of the unknown flag or the regex syntax error.
pub fn compile(pattern: &str, flags: &str) -> Result<Regex, String> {
    let mut builder = RegexBuilder::new(pattern);
    builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            'g' | 'u' | 'd' => {}
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            other => return Err(format!("unsupported regex flag `{other}`")),
        }
    }
    builder.build().map_err(|e| e.to_string())
}

/// Returns whether a rule applies to a file, checking languages, then
/// excludes, then includes.
#[must_use]
pub fn applies_to(rule: &Rule, file_path: &Path, language_id: &str) -> bool {
    let spec = rule.matcher();
    if !spec.languages().is_empty() && !spec.languages().contains(language_id) {
        return false;
    }
    if spec.path_exclude().iter().any(|g| g.matches(file_path)) {
        return false;
    }
    if !spec.path_include().is_empty() && !spec.path_include().iter().any(|g| g.matches(file_path)) {
        return false;
    }
    true
}

/// Matches `rules` against `text` and returns findings in rule order, then
/// left-to-right.
///
/// A rule whose regex fails to compile contributes nothing; other rules still
/// run.
#[must_use]
pub fn match_rules(text: &str, file_path: &Path, language_id: &str, rules: &[Rule]) -> Vec<Finding> {
    let lines = LineIndex::new(text);
    let mut findings = Vec::new();

    for rule in rules {
        if !applies_to(rule, file_path, language_id) {
            continue;
        }

        let regex = match rule.matcher().compiled() {
            Ok(regex) => regex,
            Err(_) => continue,
        };

        let limit = if rule.matcher().is_global() {
            MAX_FINDINGS_PER_RULE
        } else {
            1
        };

        let before = findings.len();
        for m in regex.find_iter(text).take(limit) {
            let (line, column) = lines.line_col(text, m.start());
            findings.push(Finding {
                rule_id: rule.id().to_string(),
                severity: rule.severity(),
                message: rule.message().to_string(),
                span: Span::new(m.start(), m.end()),
                source: file_path.to_path_buf(),
                line,
                column,
            });
        }

        let produced = findings.len() - before;
        if produced == MAX_FINDINGS_PER_RULE {
            warn!(
                "Rule {} hit the cap of {MAX_FINDINGS_PER_RULE} findings in {}",
                rule.id(),
                file_path.display()
            );
        } else if produced > 0 {
            debug!("Rule {}: {produced} finding(s) in {}", rule.id(), file_path.display());
        }
    }

    findings
}

/// Byte offsets of line starts, for offset → line/column conversion.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// 1-indexed line and character column of a byte offset.
    fn line_col(&self, text: &str, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset);
        let line_start = self.starts[line.saturating_sub(1)];
        let column = text
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        (line, column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{GlobPattern, MatchSpec};
    use crate::types::Severity;

    fn rule(id: &str, spec: MatchSpec) -> Rule {
        Rule::new(id, Severity::Error, format!("{id} matched"), spec)
    }

    fn globs(raw: &[&str]) -> Vec<GlobPattern> {
        raw.iter().map(|g| GlobPattern::new(g).unwrap()).collect()
    }

    #[test]
    fn todo_finding_spans_first_four_bytes() {
        let rules = vec![rule("no-todo", MatchSpec::new("TODO"))];
        let findings = match_rules("TODO fix this", Path::new("a.rs"), "rust", &rules);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].span, Span::new(0, 4));
        assert_eq!((findings[0].line, findings[0].column), (1, 1));
    }

    #[test]
    fn global_flag_reports_all_matches_in_order() {
        let rules = vec![rule("x", MatchSpec::new("x"))];
        let findings = match_rules("x\nax\n", Path::new("a.txt"), "plaintext", &rules);
        let spans: Vec<Span> = findings.iter().map(|f| f.span).collect();
        assert_eq!(spans, vec![Span::new(0, 1), Span::new(3, 4)]);
        assert_eq!((findings[1].line, findings[1].column), (2, 2));
    }

    #[test]
    fn without_global_flag_only_first_match() {
        let rules = vec![rule("x", MatchSpec::new("x").with_flags("i"))];
        let findings = match_rules("X x x", Path::new("a.txt"), "plaintext", &rules);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].span, Span::new(0, 1));
    }

    #[test]
    fn flags_map_to_regex_options() {
        assert!(compile("^b", "gm").unwrap().is_match("a\nb"));
        assert!(!compile("^b", "g").unwrap().is_match("a\nb"));
        assert!(compile("a.b", "gs").unwrap().is_match("a\nb"));
        assert!(compile("abc", "gi").unwrap().is_match("ABC"));
        assert!(compile("abc", "gy").is_err());
    }

    #[test]
    fn language_filter_skips_other_languages() {
        let rules = vec![rule("ts-only", MatchSpec::new("any").with_languages(["typescript"]))];
        assert!(match_rules("any", Path::new("a.rs"), "rust", &rules).is_empty());
        assert_eq!(match_rules("any", Path::new("a.ts"), "typescript", &rules).len(), 1);
    }

    #[test]
    fn exclude_wins_over_include() {
        let spec = MatchSpec::new("secret")
            .with_path_include(globs(&["src/**"]))
            .with_path_exclude(globs(&["src/fixtures/**"]));
        let rules = vec![rule("no-secret", spec)];

        let included = match_rules("secret", Path::new("src/app.ts"), "typescript", &rules);
        assert_eq!(included.len(), 1);

        let excluded = match_rules("secret", Path::new("src/fixtures/a.ts"), "typescript", &rules);
        assert!(excluded.is_empty());

        let outside = match_rules("secret", Path::new("lib/a.ts"), "typescript", &rules);
        assert!(outside.is_empty());
    }

    #[test]
    fn bad_pattern_does_not_stop_other_rules() {
        let rules = vec![
            rule("broken", MatchSpec::new("(unclosed")),
            rule("ok", MatchSpec::new("fine")),
        ];
        let findings = match_rules("fine", Path::new("a.txt"), "plaintext", &rules);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "ok");
    }

    #[test]
    fn findings_follow_rule_order_then_position() {
        let rules = vec![rule("b", MatchSpec::new("b")), rule("a", MatchSpec::new("a"))];
        let findings = match_rules("ab ab", Path::new("x"), "plaintext", &rules);
        let order: Vec<(&str, usize)> = findings
            .iter()
            .map(|f| (f.rule_id.as_str(), f.span.start))
            .collect();
        assert_eq!(order, vec![("b", 1), ("b", 4), ("a", 0), ("a", 3)]);
    }

    #[test]
    fn matching_is_idempotent() {
        let rules = vec![rule("w", MatchSpec::new(r"\w+"))];
        let doc = Document::from_path("notes.md", "alpha beta\ngamma");
        assert_eq!(doc.match_rules(&rules), doc.match_rules(&rules));
        assert_eq!(doc.language_id, "markdown");
    }

    #[test]
    fn empty_matches_are_capped_per_rule() {
        let rules = vec![rule("empty", MatchSpec::new(""))];
        let text = "a".repeat(MAX_FINDINGS_PER_RULE * 2);
        let findings = match_rules(&text, Path::new("x"), "plaintext", &rules);
        assert_eq!(findings.len(), MAX_FINDINGS_PER_RULE);
    }

    #[test]
    fn columns_count_characters() {
        let rules = vec![rule("x", MatchSpec::new("x"))];
        let findings = match_rules("äöx", Path::new("x"), "plaintext", &rules);
        assert_eq!(findings[0].span, Span::new(4, 5));
        assert_eq!(findings[0].column, 3);
    }
}
