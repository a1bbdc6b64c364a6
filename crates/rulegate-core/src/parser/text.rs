//! Line-based rule files.
//!
//! Grammar, one rule per line:
//!
//! ```text
//! [error|warn|info[:]] message :: pattern
//! ```
//!
//! The severity must be a whole leading word, e.g. `error: msg` or `error msg`.
//!
//! Blank lines and `#` comments are ignored.

use crate::rule::{MatchSpec, Rule};
use crate::types::Severity;
use std::path::Path;

/// Parses line-based rules. Never fails; bad lines are logged and skipped.
///
/// Generated ids are `<filename>-line<N>` with `N` counted from 1.
#[must_use]
pub fn parse_text_rules(content: &str, origin: &Path) -> Vec<Rule> {
    let file_name = origin
        .file_name()
        .map_or_else(|| "rules".to_string(), |n| n.to_string_lossy().into_owned());

    let mut rules = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((head, pattern)) = line.split_once("::") else {
            tracing::warn!(
                "{}:{line_no}: skipping line without `::` separator",
                origin.display()
            );
            continue;
        };

        let pattern = pattern.trim();
        if pattern.is_empty() {
            tracing::warn!("{}:{line_no}: skipping rule with empty pattern", origin.display());
            continue;
        }

        let (severity, message) = split_severity(head.trim());
        let message = if message.is_empty() { pattern } else { message };

        rules.push(
            Rule::new(
                format!("{file_name}-line{line_no}"),
                severity,
                message,
                MatchSpec::new(pattern),
            )
            .with_origin(origin),
        );
    }
    rules
}

/// Splits an optional severity token off the message part of a line.
///
/// The token must be a whole word, followed by `:`, whitespace or nothing.
fn split_severity(head: &str) -> (Severity, &str) {
    if let Some(rest) = head.strip_prefix(':') {
        return (Severity::Warn, rest.trim());
    }
    let word_end = head
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(head.len());
    let (token, rest) = head.split_at(word_end);
    let at_boundary = rest.is_empty() || rest.starts_with(':') || rest.starts_with(char::is_whitespace);
    match Severity::from_token(token) {
        Some(severity) if at_boundary => {
            let rest = rest.trim_start();
            (severity, rest.strip_prefix(':').unwrap_or(rest).trim())
        }
        _ => (Severity::Warn, head),
    }
}
