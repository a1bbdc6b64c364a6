//! Save-time enforcement: decides whether a pending write may proceed.
//!
//! State is `mode × session-disabled`, owned by an [`Enforcer`]. Transitions
//! only happen through explicit operator calls; there are no automatic ones.
//!
//! ```text
//! findings ──decide──▶ Allow
//!                  └─▶ Block(prompt) ──resolve(host)──▶ Allow | AllowWithReason | Abort
//! ```

use crate::config::EnforcementConfig;
use crate::types::{count_by_severity, Finding, Severity};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};

/// Graduated enforcement policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// Never blocks.
    Passive,
    /// Blocks per configuration.
    #[default]
    Active,
    /// Always blocks on errors; overrides need a reason.
    Strict,
    /// Always blocks on errors; no override.
    Draconian,
}

impl std::fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passive => write!(f, "passive"),
            Self::Active => write!(f, "active"),
            Self::Strict => write!(f, "strict"),
            Self::Draconian => write!(f, "draconian"),
        }
    }
}

/// Operator-configurable enforcement switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcementSettings {
    /// Master switch.
    pub enabled: bool,
    /// Block while error findings exist.
    pub block_on_errors: bool,
    /// Block while warning findings exist.
    pub block_on_warnings: bool,
    /// Offer an override path.
    pub allow_override: bool,
    /// Require a reason for overrides.
    pub require_override_reason: bool,
}

impl Default for EnforcementSettings {
    fn default() -> Self {
        EnforcementConfig::default().settings()
    }
}

/// Effective rules for one decision: the mode applied to the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcementPolicy {
    /// Block while error findings exist.
    pub block_on_errors: bool,
    /// Block while warning findings exist.
    pub block_on_warnings: bool,
    /// Offer an override path.
    pub allow_override: bool,
    /// Require a reason for overrides.
    pub require_reason: bool,
}

impl EnforcementMode {
    /// Applies this mode to the configured settings.
    #[must_use]
    pub fn policy(self, settings: &EnforcementSettings) -> EnforcementPolicy {
        match self {
            Self::Passive => EnforcementPolicy {
                block_on_errors: false,
                block_on_warnings: false,
                allow_override: false,
                require_reason: false,
            },
            Self::Active => EnforcementPolicy {
                block_on_errors: settings.block_on_errors,
                block_on_warnings: settings.block_on_warnings,
                allow_override: settings.allow_override,
                require_reason: settings.allow_override && settings.require_override_reason,
            },
            Self::Strict => EnforcementPolicy {
                block_on_errors: true,
                block_on_warnings: settings.block_on_warnings,
                allow_override: true,
                require_reason: true,
            },
            Self::Draconian => EnforcementPolicy {
                block_on_errors: true,
                block_on_warnings: settings.block_on_warnings,
                allow_override: false,
                require_reason: false,
            },
        }
    }
}

/// A way out of a blocked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Abort the write and focus the first finding.
    FixNow,
    /// Write anyway.
    Override,
    /// Abort the write.
    Cancel,
}

/// What the host shows when a write is blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPrompt {
    /// Error findings in the document.
    pub error_count: usize,
    /// Warning findings in the document.
    pub warn_count: usize,
    /// Choices to offer, in display order.
    pub choices: Vec<Resolution>,
    /// Whether an override must carry a non-empty reason.
    pub reason_required: bool,
    /// First blocking finding, for fix-now focus.
    pub first_finding: Option<Finding>,
}

impl BlockPrompt {
    /// Whether an override path is offered.
    #[must_use]
    pub fn allows_override(&self) -> bool {
        self.choices.contains(&Resolution::Override)
    }

    /// Total number of violations shown to the user.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.error_count + self.warn_count
    }

    /// One-line summary for the prompt.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Save blocked: {} error(s), {} warning(s)",
            self.error_count, self.warn_count
        )
    }
}

/// Immediate result of [`Enforcer::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteDecision {
    /// Write may proceed without asking.
    Allow,
    /// Write is suspended until the host resolves the prompt.
    Block(BlockPrompt),
}

/// Final result of a write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Write proceeds.
    Allow,
    /// Write is aborted; the stored content stays untouched.
    Abort {
        /// Finding to focus when the user chose to fix now.
        focus: Option<Finding>,
    },
    /// Write proceeds as an override with the given reason (may be empty when
    /// no reason is required).
    AllowWithReason(String),
}

impl WriteOutcome {
    /// Whether the write may happen.
    #[must_use]
    pub fn permits_write(&self) -> bool {
        !matches!(self, Self::Abort { .. })
    }
}

/// Error returned by [`Enforcer::guard_write`] for an aborted write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("write aborted by enforcement")]
pub struct WriteAborted {
    /// Finding to focus, when the user chose to fix now.
    pub focus: Option<Finding>,
}

/// Host surface that asks the user how to resolve a blocked write.
///
/// `None` from either method means the prompt was dismissed.
pub trait WritePrompt {
    /// Shows the prompt and waits for a choice.
    fn choose(&self, prompt: &BlockPrompt) -> impl Future<Output = Option<Resolution>> + Send;

    /// Asks for an override reason.
    fn ask_reason(&self, prompt: &BlockPrompt) -> impl Future<Output = Option<String>> + Send;
}

/// Owner of the enforcement state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforcer {
    mode: EnforcementMode,
    settings: EnforcementSettings,
    session_disabled: bool,
}

impl Default for Enforcer {
    fn default() -> Self {
        Self::from_config(&EnforcementConfig::default())
    }
}

impl Enforcer {
    /// Creates an enforcer in `mode` with `settings`.
    #[must_use]
    pub fn new(mode: EnforcementMode, settings: EnforcementSettings) -> Self {
        Self {
            mode,
            settings,
            session_disabled: false,
        }
    }

    /// Initializes state from the `[enforcement]` config section.
    #[must_use]
    pub fn from_config(config: &EnforcementConfig) -> Self {
        Self::new(config.mode, config.settings())
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> EnforcementMode {
        self.mode
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &EnforcementSettings {
        &self.settings
    }

    /// Whether enforcement is switched off for this session.
    #[must_use]
    pub fn is_session_disabled(&self) -> bool {
        self.session_disabled
    }

    /// Effective policy for the current mode.
    #[must_use]
    pub fn policy(&self) -> EnforcementPolicy {
        self.mode.policy(&self.settings)
    }

    /// Switches to `mode`.
    pub fn set_mode(&mut self, mode: EnforcementMode) {
        if self.mode != mode {
            info!("Enforcement mode: {} -> {mode}", self.mode);
            self.mode = mode;
        }
    }

    /// Switches to [`EnforcementMode::Strict`].
    pub fn enable_strict(&mut self) {
        self.set_mode(EnforcementMode::Strict);
    }

    /// Leaves strict (or draconian) mode for [`EnforcementMode::Active`].
    pub fn disable_strict(&mut self) {
        self.set_mode(EnforcementMode::Active);
    }

    /// Turns the master switch on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    /// Toggles save blocking and returns whether blocking is now configured.
    ///
    /// Turning off clears both block flags; turning on enables blocking on
    /// errors. Strict and draconian modes still block on errors either way.
    pub fn toggle_save_blocking(&mut self) -> bool {
        let blocking = self.settings.block_on_errors || self.settings.block_on_warnings;
        if blocking {
            self.settings.block_on_errors = false;
            self.settings.block_on_warnings = false;
        } else {
            self.settings.block_on_errors = true;
        }
        info!("Save blocking {}", if blocking { "off" } else { "on" });
        !blocking
    }

    /// Temporarily disables enforcement until [`Self::enable_for_session`].
    pub fn disable_for_session(&mut self) {
        info!("Enforcement disabled for this session");
        self.session_disabled = true;
    }

    /// Ends a temporary disable.
    pub fn enable_for_session(&mut self) {
        self.session_disabled = false;
    }

    /// Decides whether a write of a document with `findings` may proceed.
    #[must_use]
    pub fn decide(&self, findings: &[Finding]) -> WriteDecision {
        if !self.settings.enabled || self.session_disabled {
            return WriteDecision::Allow;
        }

        let policy = self.policy();
        if !policy.block_on_errors && !policy.block_on_warnings {
            return WriteDecision::Allow;
        }

        let (error_count, warn_count, _) = count_by_severity(findings);
        let should_block = (policy.block_on_errors && error_count > 0)
            || (policy.block_on_warnings && warn_count > 0);
        if !should_block {
            return WriteDecision::Allow;
        }

        let choices = if policy.allow_override {
            vec![Resolution::FixNow, Resolution::Override, Resolution::Cancel]
        } else {
            vec![Resolution::FixNow, Resolution::Cancel]
        };

        let first_finding = findings
            .iter()
            .find(|f| {
                (policy.block_on_errors && f.severity == Severity::Error)
                    || (policy.block_on_warnings && f.severity == Severity::Warn)
            })
            .cloned();

        debug!("Blocking write: {error_count} error(s), {warn_count} warning(s)");
        WriteDecision::Block(BlockPrompt {
            error_count,
            warn_count,
            choices,
            reason_required: policy.allow_override && policy.require_reason,
            first_finding,
        })
    }

    /// Waits for the host to resolve a blocked write.
    ///
    /// Dismissal, cancel, a withheld required reason, or a choice that was not
    /// offered all abort the write.
    pub async fn resolve<P: WritePrompt>(&self, prompt: &BlockPrompt, host: &P) -> WriteOutcome {
        let Some(choice) = host.choose(prompt).await else {
            debug!("Write prompt dismissed");
            return WriteOutcome::Abort { focus: None };
        };
        if !prompt.choices.contains(&choice) {
            warn!("Rejected resolution {choice:?}: not offered in {} mode", self.mode);
            return WriteOutcome::Abort { focus: None };
        }

        match choice {
            Resolution::FixNow => WriteOutcome::Abort {
                focus: prompt.first_finding.clone(),
            },
            Resolution::Cancel => WriteOutcome::Abort { focus: None },
            Resolution::Override if prompt.reason_required => {
                match host.ask_reason(prompt).await {
                    Some(reason) if !reason.trim().is_empty() => {
                        WriteOutcome::AllowWithReason(reason.trim().to_string())
                    }
                    _ => {
                        debug!("Override reason withheld");
                        WriteOutcome::Abort { focus: None }
                    }
                }
            }
            Resolution::Override => WriteOutcome::AllowWithReason(String::new()),
        }
    }

    /// Gates `write` on the enforcement decision for `findings`.
    ///
    /// `write` runs at most once, and only when the outcome permits it.
    /// Overrides are logged with their reason and violation count.
    ///
    /// # Errors
    ///
    /// Returns [`WriteAborted`] when the write was blocked and not overridden;
    /// `write` is not called in that case.
    pub async fn guard_write<P, F, T>(
        &self,
        findings: &[Finding],
        host: &P,
        write: F,
    ) -> Result<T, WriteAborted>
    where
        P: WritePrompt,
        F: FnOnce() -> T,
    {
        let outcome = match self.decide(findings) {
            WriteDecision::Allow => WriteOutcome::Allow,
            WriteDecision::Block(prompt) => {
                let outcome = self.resolve(&prompt, host).await;
                if let WriteOutcome::AllowWithReason(reason) = &outcome {
                    warn!(
                        "Write override with {} violation(s): {}",
                        prompt.violation_count(),
                        if reason.is_empty() { "<no reason>" } else { reason }
                    );
                }
                outcome
            }
        };

        match outcome {
            WriteOutcome::Abort { focus } => Err(WriteAborted { focus }),
            WriteOutcome::Allow | WriteOutcome::AllowWithReason(_) => Ok(write()),
        }
    }
}
