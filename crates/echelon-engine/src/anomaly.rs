//! Advisory business-rule evaluation over record payloads.
//!
//! Rules are declarative (kind + parameters) and evaluation is pure: given a
//! payload, produce zero or more flags in rule-declaration order.  Flags are
//! advisory by default; a configuration may promote individual rules to hard
//! blockers, in which case validation fails with the offending rule id.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payload::RecordPayload;

/// Default tolerated gap between financial execution and physical progress.
const DEFAULT_MAX_DIVERGENCE_PCT: f64 = 30.0;

/// Default minimum narrative length in characters.
const DEFAULT_MIN_NARRATIVE_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Severity / AnomalyFlag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// One advisory finding.  Derived transiently, never persisted on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
}

// ---------------------------------------------------------------------------
// AnomalyRule
// ---------------------------------------------------------------------------

/// Declarative rule over a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnomalyRule {
    /// Disbursed amount exceeds the engaged amount (credit-freeze signal).
    DisbursedExceedsEngaged,
    /// |financial execution % − physical progress %| beyond the gap.
    ExecutionDivergence { max_gap_pct: f64 },
    /// Activity narrative shorter than the minimum character count.
    NarrativeTooShort { min_chars: usize },
    /// Strategic-program linkage absent (applies to both record types).
    MissingProgramLink,
}

impl AnomalyRule {
    /// Stable identifier used in flags, events, and hard-blocker sets.
    pub fn id(&self) -> &'static str {
        match self {
            Self::DisbursedExceedsEngaged => "disbursed_exceeds_engaged",
            Self::ExecutionDivergence { .. } => "execution_divergence",
            Self::NarrativeTooShort { .. } => "narrative_too_short",
            Self::MissingProgramLink => "missing_program_link",
        }
    }

    /// Evaluate against a payload.  Report-only rules pass on initiatives.
    fn evaluate(&self, payload: &RecordPayload) -> Option<AnomalyFlag> {
        match self {
            Self::DisbursedExceedsEngaged => {
                let RecordPayload::Report(report) = payload else {
                    return None;
                };
                (report.disbursed > report.engaged).then(|| AnomalyFlag {
                    rule_id: self.id().to_string(),
                    severity: Severity::Critical,
                    message: format!(
                        "disbursement {:.1} exceeds engagement {:.1}",
                        report.disbursed, report.engaged
                    ),
                })
            }
            Self::ExecutionDivergence { max_gap_pct } => {
                let RecordPayload::Report(report) = payload else {
                    return None;
                };
                let gap = (report.financial_execution_pct - report.physical_progress_pct).abs();
                (gap > *max_gap_pct).then(|| AnomalyFlag {
                    rule_id: self.id().to_string(),
                    severity: Severity::Warning,
                    message: format!(
                        "financial execution and physical progress diverge by {gap:.1} points"
                    ),
                })
            }
            Self::NarrativeTooShort { min_chars } => {
                let RecordPayload::Report(report) = payload else {
                    return None;
                };
                let len = report.activity_narrative.trim().chars().count();
                (len < *min_chars).then(|| AnomalyFlag {
                    rule_id: self.id().to_string(),
                    severity: Severity::Info,
                    message: format!(
                        "activity narrative has {len} characters, minimum is {min_chars}"
                    ),
                })
            }
            Self::MissingProgramLink => {
                let missing = payload
                    .program_link()
                    .is_none_or(|link| link.trim().is_empty());
                missing.then(|| AnomalyFlag {
                    rule_id: self.id().to_string(),
                    severity: Severity::Warning,
                    message: "no strategic program linked".to_string(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AnomalyConfig
// ---------------------------------------------------------------------------

/// Rule set plus the subset promoted to hard blockers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    pub rules: Vec<AnomalyRule>,
    /// Rule ids whose flags fail validation instead of merely surfacing.
    pub hard_blockers: BTreeSet<String>,
}

impl AnomalyConfig {
    /// Evaluate all rules in declaration order.  Pure; no side effects.
    pub fn evaluate(&self, payload: &RecordPayload) -> Vec<AnomalyFlag> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(payload))
            .collect()
    }

    /// First hard-blocking flag for this payload, if any.
    pub fn first_hard_block(&self, payload: &RecordPayload) -> Option<AnomalyFlag> {
        self.evaluate(payload)
            .into_iter()
            .find(|flag| self.hard_blockers.contains(&flag.rule_id))
    }

    /// Promote a rule to hard blocker.
    pub fn block_on(mut self, rule_id: &str) -> Self {
        self.hard_blockers.insert(rule_id.to_string());
        self
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                AnomalyRule::DisbursedExceedsEngaged,
                AnomalyRule::ExecutionDivergence {
                    max_gap_pct: DEFAULT_MAX_DIVERGENCE_PCT,
                },
                AnomalyRule::NarrativeTooShort {
                    min_chars: DEFAULT_MIN_NARRATIVE_CHARS,
                },
                AnomalyRule::MissingProgramLink,
            ],
            hard_blockers: BTreeSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
