//! Quick-fix synthesis: turns a rule's declared fix into a text edit anchored
//! to a finding's span.
//!
//! Edits use the span captured at matching time. If the text changed since,
//! the caller must match again before applying.

use crate::rule::{Fix, InsertPosition, Rule};
use crate::types::{Finding, Span};
use serde::{Deserialize, Serialize};

/// A concrete text edit: replace `span` with `new_text`.
///
/// Insertions are zero-width spans; deletions have empty `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Byte range to replace.
    pub span: Span,
    /// Text to put in its place.
    pub new_text: String,
}

impl TextEdit {
    /// Creates a new edit.
    #[must_use]
    pub fn new(span: Span, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }

    /// Applies the edit to `text`.
    ///
    /// Returns `None` if the span is out of bounds or not on character
    /// boundaries.
    #[must_use]
    pub fn apply(&self, text: &str) -> Option<String> {
        let before = text.get(..self.span.start)?;
        let after = text.get(self.span.end..)?;
        if self.span.start > self.span.end {
            return None;
        }
        Some(format!("{before}{}{after}", self.new_text))
    }
}

/// A titled edit, ready to be offered as a code action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickFix {
    /// Human-readable action title.
    pub title: String,
    /// The edit to apply.
    pub edit: TextEdit,
}

/// Synthesizes the edit for `finding` from `rule`'s declared fix.
///
/// Returns `None` when the rule has no fix, when the finding came from a
/// different rule, or when the fix has nothing to write (a `Replace` or
/// `Insert` without text).
#[must_use]
pub fn synthesize(finding: &Finding, rule: &Rule) -> Option<TextEdit> {
    if finding.rule_id != rule.id() {
        return None;
    }
    let span = finding.span;
    match rule.fix()? {
        Fix::Replace { replacement } => replacement
            .as_ref()
            .map(|text| TextEdit::new(span, text.clone())),
        Fix::Delete => Some(TextEdit::new(span, "")),
        Fix::Insert { text, position } => {
            let at = match position {
                InsertPosition::Start => span.start,
                InsertPosition::End => span.end,
            };
            text.as_ref()
                .map(|text| TextEdit::new(Span::new(at, at), text.clone()))
        }
    }
}

/// Synthesizes a titled quick fix for `finding`.
#[must_use]
pub fn quick_fix(finding: &Finding, rule: &Rule) -> Option<QuickFix> {
    let edit = synthesize(finding, rule)?;
    let title = match rule.fix()? {
        Fix::Replace { .. } => format!("Replace with `{}` ({})", edit.new_text, rule.id()),
        Fix::Delete => format!("Delete match ({})", rule.id()),
        Fix::Insert { .. } => format!("Insert `{}` ({})", edit.new_text, rule.id()),
    };
    Some(QuickFix { title, edit })
}

/// Applies a batch of edits to `text`.
///
/// When edits overlap, the one starting first wins and the others are
/// skipped. Surviving edits are applied back to front so earlier spans stay
/// valid. Returns the new text and the number of edits applied.
#[must_use]
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> (String, usize) {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| (e.span.start, e.span.end));

    let mut selected: Vec<&TextEdit> = Vec::with_capacity(ordered.len());
    let mut last_end = 0;
    for edit in ordered {
        if !selected.is_empty() && edit.span.start < last_end {
            tracing::debug!(
                "Skipping overlapping edit at {}..{}",
                edit.span.start,
                edit.span.end
            );
            continue;
        }
        last_end = edit.span.end;
        selected.push(edit);
    }

    let mut result = text.to_string();
    let mut applied = 0;
    for edit in selected.into_iter().rev() {
        if let Some(next) = edit.apply(&result) {
            result = next;
            applied += 1;
        }
    }
    (result, applied)
}
