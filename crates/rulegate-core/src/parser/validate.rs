//! DTO → domain rule conversion with validation.

use crate::rule::{Fix, GlobPattern, InsertPosition, MatchSpec, Rule};
use crate::types::Severity;

use super::rule_dto::{FixDto, MatchDto, RuleDto};

/// Why a single structured rule was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleRejection {
    /// The element did not have the shape of a rule object.
    #[error("malformed rule: {0}")]
    Malformed(String),

    /// `id` is missing or empty.
    #[error("missing `id`")]
    MissingId,

    /// `severity` is not one of `error`, `warn`, `info`.
    #[error("unknown severity `{0}`, expected: error, warn, info")]
    InvalidSeverity(String),

    /// `message` is missing.
    #[error("missing `message`")]
    MissingMessage,

    /// `match.pattern` is missing or empty.
    #[error("missing `match.pattern`")]
    MissingPattern,

    /// A path glob does not compile.
    #[error("{field}: invalid glob `{pattern}`: {reason}")]
    InvalidGlob {
        /// Field the glob came from (e.g. `match.pathInclude[1]`).
        field: String,
        /// The raw glob.
        pattern: String,
        /// Compile error.
        reason: String,
    },
}

/// Validates one element of a `rules` sequence.
///
/// # Errors
///
/// Returns the first problem found with the element.
pub fn validate_rule(value: serde_json::Value) -> Result<Rule, RuleRejection> {
    if !value.is_object() {
        return Err(RuleRejection::Malformed("expected an object".to_string()));
    }
    let dto: RuleDto =
        serde_json::from_value(value).map_err(|e| RuleRejection::Malformed(e.to_string()))?;
    convert_rule(dto)
}

fn convert_rule(dto: RuleDto) -> Result<Rule, RuleRejection> {
    let id = dto
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or(RuleRejection::MissingId)?;

    let severity = match dto.severity {
        Some(raw) => Severity::from_token(&raw).ok_or(RuleRejection::InvalidSeverity(raw))?,
        None => Severity::default(),
    };

    let message = dto.message.ok_or(RuleRejection::MissingMessage)?;
    let matcher = convert_match(dto.matcher.ok_or(RuleRejection::MissingPattern)?)?;

    let mut rule = Rule::new(id, severity, message, matcher);
    if let Some(fix) = dto.fix.and_then(|f| convert_fix(f, rule.id())) {
        rule = rule.with_fix(fix);
    }
    Ok(rule)
}

fn convert_match(dto: MatchDto) -> Result<MatchSpec, RuleRejection> {
    let pattern = dto
        .pattern
        .filter(|p| !p.is_empty())
        .ok_or(RuleRejection::MissingPattern)?;

    let include = convert_globs(&dto.path_include, "match.pathInclude")?;
    let exclude = convert_globs(&dto.path_exclude, "match.pathExclude")?;

    Ok(MatchSpec::new(pattern)
        .with_flags(dto.flags.unwrap_or_default())
        .with_languages(dto.languages)
        .with_path_include(include)
        .with_path_exclude(exclude))
}

fn convert_globs(raw: &[String], field: &str) -> Result<Vec<GlobPattern>, RuleRejection> {
    raw.iter()
        .enumerate()
        .map(|(i, p)| {
            GlobPattern::new(p).map_err(|reason| RuleRejection::InvalidGlob {
                field: format!("{field}[{i}]"),
                pattern: p.clone(),
                reason,
            })
        })
        .collect()
}

/// Unknown fix kinds drop the fix but keep the rule.
fn convert_fix(dto: FixDto, rule_id: &str) -> Option<Fix> {
    let kind = dto.kind.unwrap_or_default().to_ascii_lowercase();
    match kind.as_str() {
        "replace" => Some(Fix::Replace {
            replacement: dto.replacement,
        }),
        "delete" => Some(Fix::Delete),
        "insert" => {
            let position = match dto.insert_position.as_deref() {
                Some(p) if p.eq_ignore_ascii_case("end") => InsertPosition::End,
                _ => InsertPosition::Start,
            };
            Some(Fix::Insert {
                text: dto.insert_text,
                position,
            })
        }
        other => {
            tracing::warn!("Rule {rule_id}: ignoring fix with unknown kind `{other}`");
            None
        }
    }
}
