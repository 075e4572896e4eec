//! Domain payloads carried by workflow records.
//!
//! Two record types flow through the chain: monthly performance reports and
//! planning initiatives.  The workflow core treats payloads as opaque except
//! where named business rules (completeness scoring, anomaly detection, the
//! financial-execution clamp) inspect specific fields.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Report payload
// ---------------------------------------------------------------------------

/// Delivery status reported for the underlying program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgramState {
    InProgress,
    Preparing,
    Late,
    Done,
    Blocked,
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InProgress => "in_progress",
            Self::Preparing => "preparing",
            Self::Late => "late",
            Self::Done => "done",
            Self::Blocked => "blocked",
        };
        f.write_str(name)
    }
}

/// One month of performance data for a strategic program.
///
/// Amounts are in the reporting currency's billions; percentages are 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub activity_narrative: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: f64,
    pub engaged: f64,
    pub disbursed: f64,
    /// Derived from budget/disbursed; kept on the payload because reviewers
    /// see the stored figure, not a recomputation.
    pub financial_execution_pct: f64,
    pub kpi_narrative: String,
    pub physical_progress_pct: f64,
    pub program_state: ProgramState,
    pub legal_framework: String,
    pub observations: String,
    /// Link to the strategic program this report covers.
    pub program_link: Option<String>,
}

impl ReportPayload {
    /// An empty draft with nothing filled in.
    pub fn empty() -> Self {
        Self {
            activity_narrative: String::new(),
            start_date: None,
            end_date: None,
            budget: 0.0,
            engaged: 0.0,
            disbursed: 0.0,
            financial_execution_pct: 0.0,
            kpi_narrative: String::new(),
            physical_progress_pct: 0.0,
            program_state: ProgramState::InProgress,
            legal_framework: String::new(),
            observations: String::new(),
            program_link: None,
        }
    }

    /// Recompute the stored financial-execution percentage from the current
    /// budget and disbursed figures.
    pub fn refresh_execution_pct(&mut self) {
        self.financial_execution_pct = financial_execution_pct(self.budget, self.disbursed);
    }
}

/// `round(disbursed / budget × 1000) / 10`, capped at 100.
///
/// One decimal of precision, matching what reviewers see on the entry form.
/// A zero budget yields 0 rather than a division error.
pub fn financial_execution_pct(budget: f64, disbursed: f64) -> f64 {
    if budget <= 0.0 {
        return 0.0;
    }
    let pct = (disbursed / budget * 1000.0).round() / 10.0;
    pct.min(100.0)
}

// ---------------------------------------------------------------------------
// Initiative payload
// ---------------------------------------------------------------------------

/// Which planning rubric an initiative is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rubric {
    LegislativeText,
    GeneralPolicy,
    MissionsConferences,
}

impl fmt::Display for Rubric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LegislativeText => "legislative_text",
            Self::GeneralPolicy => "general_policy",
            Self::MissionsConferences => "missions_conferences",
        };
        f.write_str(name)
    }
}

/// Strategic frame an initiative claims alignment with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrategicFrame {
    PresidentialPriorities,
    GovernmentActionPlan,
    NationalGrowthPlan,
    PriorityActionPlan,
}

/// One planning item (draft law, policy, mission) moving up the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativePayload {
    pub rubric: Rubric,
    pub order_number: u32,
    pub title: String,
    pub frame: StrategicFrame,
    pub frame_detail: String,
    pub financial_impact: bool,
    pub finance_law: bool,
    /// Entities carrying the initiative besides the originator.
    pub carrier_services: Vec<String>,
    pub observations: String,
    /// Link to the strategic program this initiative serves.
    pub program_link: Option<String>,
}

impl InitiativePayload {
    pub fn empty(rubric: Rubric, order_number: u32) -> Self {
        Self {
            rubric,
            order_number,
            title: String::new(),
            frame: StrategicFrame::GovernmentActionPlan,
            frame_detail: String::new(),
            financial_impact: false,
            finance_law: false,
            carrier_services: Vec::new(),
            observations: String::new(),
            program_link: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordPayload
// ---------------------------------------------------------------------------

/// Payload of a workflow record: one of the two record types the platform
/// carries.  Both move through the identical state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordPayload {
    Report(ReportPayload),
    Initiative(InitiativePayload),
}

impl RecordPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Report(_) => PayloadKind::Report,
            Self::Initiative(_) => PayloadKind::Initiative,
        }
    }

    /// SHA-256 over the canonical JSON encoding.
    ///
    /// Stamped into history entries so the audit trail is tamper-evident and
    /// so a rejection can be shown to leave the payload untouched.
    pub fn digest(&self) -> String {
        // Serialization of these enums cannot fail; the fallback keeps the
        // digest total without panicking in release builds.
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        let out = hasher.finalize();
        out.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn program_link(&self) -> Option<&str> {
        match self {
            Self::Report(r) => r.program_link.as_deref(),
            Self::Initiative(i) => i.program_link.as_deref(),
        }
    }
}

/// Discriminant for payload-type-specific configuration (checklists, rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Report,
    Initiative,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Report => "report",
            Self::Initiative => "initiative",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
