//! Structured rule file deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization. Field names follow the
//! camelCase keys used in rule files; they are converted to the domain model
//! by [`super::validate`].

use serde::Deserialize;

/// One element of a structured file's `rules` sequence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    /// Rule id, required.
    #[serde(default)]
    pub id: Option<String>,
    /// `error`, `warn` or `info` (default: `warn`).
    #[serde(default)]
    pub severity: Option<String>,
    /// Diagnostic message, required.
    #[serde(default)]
    pub message: Option<String>,
    /// Match section, required.
    #[serde(default, rename = "match")]
    pub matcher: Option<MatchDto>,
    /// Optional quick fix.
    #[serde(default)]
    pub fix: Option<FixDto>,
}

/// The `match` section of a rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    /// Regex source.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Regex flags (default: `g`).
    #[serde(default)]
    pub flags: Option<String>,
    /// Language ids the rule applies to.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Globs a path must match for the rule to apply.
    #[serde(default)]
    pub path_include: Vec<String>,
    /// Globs that exclude a path from the rule.
    #[serde(default)]
    pub path_exclude: Vec<String>,
}

/// The `fix` section of a rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixDto {
    /// `replace`, `insert` or `delete`.
    #[serde(default)]
    pub kind: Option<String>,
    /// Replacement text for `replace`.
    #[serde(default, alias = "replaceWith")]
    pub replacement: Option<String>,
    /// Text for `insert`.
    #[serde(default)]
    pub insert_text: Option<String>,
    /// `start` (default) or `end` for `insert`.
    #[serde(default)]
    pub insert_position: Option<String>,
}
