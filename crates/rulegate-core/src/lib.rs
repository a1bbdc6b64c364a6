//! # rulegate-core
//!
//! Declarative text rules, matched against source documents, with save-time
//! enforcement.
//!
//! This crate provides:
//!
//! - [`parser`] for YAML, JSON, TOML and line-based rule files
//! - [`RuleStore`] holding the active [`RuleSet`] with rollback on failed loads
//! - [`match_rules`] for evaluating rules against one document
//! - [`synthesize`] for turning a rule's fix into a [`TextEdit`]
//! - [`Enforcer`] for deciding whether a write may proceed
//! - [`ScanScheduler`] for debounced, on-save and bulk scans
//!
//! ## Example
//!
//! ```ignore
//! use rulegate_core::{bulk_scan, BulkScanOptions, RuleStore};
//!
//! let store = RuleStore::new();
//! store.load(Path::new(".agent/rules"))?;
//!
//! let report = bulk_scan(Path::new("."), &store.active_rules(), &BulkScanOptions::default());
//! for finding in &report.findings {
//!     println!("{finding}");
//! }
//! if report.has_errors() {
//!     std::process::exit(1);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod enforcement;
mod fix;
mod matcher;
mod rule;
mod scheduler;
mod store;
mod types;

/// Rule file parsers.
pub mod parser;

pub use config::{
    Config, ConfigError, EnforcementConfig, ScanConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_MAX_FILES,
    DEFAULT_RULES_PATH,
};
pub use enforcement::{
    BlockPrompt, EnforcementMode, EnforcementPolicy, EnforcementSettings, Enforcer, Resolution,
    WriteAborted, WriteDecision, WriteOutcome, WritePrompt,
};
pub use fix::{apply_edits, quick_fix, synthesize, QuickFix, TextEdit};
pub use matcher::{
    applies_to, compile, language_for_path, match_rules, Document, MAX_FINDINGS_PER_RULE,
};
pub use parser::{parse_rules, ParseError, RuleFormat, RuleRejection};
pub use rule::{Fix, GlobPattern, InsertPosition, MatchSpec, Rule, DEFAULT_FLAGS};
pub use scheduler::{
    bulk_scan, BulkScanOptions, DiagnosticsSink, DocumentId, Notifier, ScanScheduler,
    SKIPPED_DIRS,
};
pub use store::{LoadOutcome, RuleSet, RuleStore, StoreError};
pub use types::{count_by_severity, Finding, FindingDiagnostic, ScanReport, Severity, Span};
