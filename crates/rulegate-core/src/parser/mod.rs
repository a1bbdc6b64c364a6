//! Rule file parsers.
//!
//! ```text
//! YAML / JSON / TOML text          line-based text
//!   ↓ serde (document level)         ↓ `message :: pattern` grammar
//! `rules` sequence of values         one rule per line
//!   ↓ rule_dto + validate (per element)
//! Vec<Rule>
//! ```
//!
//! A malformed rule never fails a file: it is logged and dropped on its own.
//! Only content that is not parseable as its declared format at all returns
//! a [`ParseError`].

use crate::rule::Rule;
use std::path::Path;

pub mod rule_dto;
pub mod text;
pub mod validate;

pub use text::parse_text_rules;
pub use validate::{validate_rule, RuleRejection};

/// Source format of a rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    /// YAML key-value document with a `rules` sequence.
    Yaml,
    /// JSON object with a `rules` array.
    Json,
    /// TOML document with a `[[rules]]` array of tables.
    Toml,
    /// Line-based `severity: message :: pattern` rules.
    Text,
}

impl RuleFormat {
    /// Selects a format from a file extension.
    ///
    /// Returns `None` for extensions that are not rule files.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "txt" | "rules" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Errors for content that is not parseable as its declared format.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// YAML syntax error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON syntax error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML syntax error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The document parsed but does not have a `rules` sequence at the top.
    #[error("invalid rule document: {0}")]
    Shape(String),
}

/// Parses a rule file's content in the given format.
///
/// `origin` is recorded on every rule and used for line-based ids.
///
/// # Errors
///
/// Returns an error only if the content as a whole cannot be parsed as
/// `format`; individually invalid rules are skipped.
pub fn parse_rules(content: &str, format: RuleFormat, origin: &Path) -> Result<Vec<Rule>, ParseError> {
    let document: serde_json::Value = match format {
        RuleFormat::Text => return Ok(parse_text_rules(content, origin)),
        RuleFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(Vec::new());
            }
            serde_yaml::from_str(content)?
        }
        RuleFormat::Json => serde_json::from_str(content)?,
        RuleFormat::Toml => toml::from_str(content)?,
    };
    parse_document(document, origin)
}

fn parse_document(document: serde_json::Value, origin: &Path) -> Result<Vec<Rule>, ParseError> {
    let mut top = match document {
        serde_json::Value::Object(top) => top,
        // Comment-only YAML.
        serde_json::Value::Null => return Ok(Vec::new()),
        _ => return Err(ParseError::Shape("expected a top-level object".to_string())),
    };

    let elements = match top.remove("rules") {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(serde_json::Value::Array(elements)) => elements,
        Some(_) => return Err(ParseError::Shape("`rules` must be a sequence".to_string())),
    };

    let mut rules = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match validate_rule(element) {
            Ok(rule) => rules.push(rule.with_origin(origin)),
            Err(rejection) => {
                tracing::warn!("{} rules[{index}]: {rejection}", origin.display());
            }
        }
    }
    tracing::debug!("Parsed {} rule(s) from {}", rules.len(), origin.display());
    Ok(rules)
}
