//! Fill-rate scoring used to gate submission.
//!
//! A checklist enumerates the required fields for a record type with a
//! weight per field (uniform by default).  The score is
//! `round(100 × Σ weight(filled) / Σ weight)`.  "Filled" means non-blank
//! after trimming for text, strictly positive for amounts and percentages,
//! and `Some` for selections.  Pure and deterministic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payload::{PayloadKind, RecordPayload};

/// Submission is refused below this score unless reconfigured.
pub const DEFAULT_SUBMISSION_THRESHOLD: u8 = 50;

// ---------------------------------------------------------------------------
// FieldKey
// ---------------------------------------------------------------------------

/// A scoreable field.  Keys not present on a payload type count as unfilled,
/// so a checklist only makes sense paired with the matching record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    // Report fields.
    ActivityNarrative,
    StartDate,
    Budget,
    Engaged,
    Disbursed,
    KpiNarrative,
    PhysicalProgress,
    Observations,
    // Initiative fields.
    Title,
    FrameDetail,
    CarrierServices,
    // Shared.
    ProgramLink,
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ActivityNarrative => "activity_narrative",
            Self::StartDate => "start_date",
            Self::Budget => "budget",
            Self::Engaged => "engaged",
            Self::Disbursed => "disbursed",
            Self::KpiNarrative => "kpi_narrative",
            Self::PhysicalProgress => "physical_progress",
            Self::Observations => "observations",
            Self::Title => "title",
            Self::FrameDetail => "frame_detail",
            Self::CarrierServices => "carrier_services",
            Self::ProgramLink => "program_link",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Checklist
// ---------------------------------------------------------------------------

/// One required field and its weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub field: FieldKey,
    pub weight: u32,
}

/// Weighted field checklist for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
}

impl Checklist {
    /// Checklist with uniform weight 1 per field.
    pub fn uniform(fields: &[FieldKey]) -> Self {
        Self {
            items: fields
                .iter()
                .map(|&field| ChecklistItem { field, weight: 1 })
                .collect(),
        }
    }

    pub fn weighted(items: Vec<ChecklistItem>) -> Self {
        Self { items }
    }

    /// The eight fields the monthly entry form tracks.
    pub fn default_report() -> Self {
        Self::uniform(&[
            FieldKey::ActivityNarrative,
            FieldKey::StartDate,
            FieldKey::Budget,
            FieldKey::Engaged,
            FieldKey::Disbursed,
            FieldKey::KpiNarrative,
            FieldKey::PhysicalProgress,
            FieldKey::Observations,
        ])
    }

    pub fn default_initiative() -> Self {
        Self::uniform(&[
            FieldKey::Title,
            FieldKey::FrameDetail,
            FieldKey::CarrierServices,
            FieldKey::Observations,
            FieldKey::ProgramLink,
        ])
    }

    pub fn default_for(kind: PayloadKind) -> Self {
        match kind {
            PayloadKind::Report => Self::default_report(),
            PayloadKind::Initiative => Self::default_initiative(),
        }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    /// 0-100 fill-rate of `payload` against this checklist.
    pub fn score(&self, payload: &RecordPayload) -> u8 {
        let total: u64 = self.items.iter().map(|item| u64::from(item.weight)).sum();
        if total == 0 {
            // Nothing is required.
            return 100;
        }
        let filled: u64 = self
            .items
            .iter()
            .filter(|item| is_filled(payload, item.field))
            .map(|item| u64::from(item.weight))
            .sum();
        ((filled as f64 / total as f64) * 100.0).round() as u8
    }
}

fn text_filled(value: &str) -> bool {
    !value.trim().is_empty()
}

fn is_filled(payload: &RecordPayload, field: FieldKey) -> bool {
    match payload {
        RecordPayload::Report(report) => match field {
            FieldKey::ActivityNarrative => text_filled(&report.activity_narrative),
            FieldKey::StartDate => report.start_date.is_some(),
            FieldKey::Budget => report.budget > 0.0,
            FieldKey::Engaged => report.engaged > 0.0,
            FieldKey::Disbursed => report.disbursed > 0.0,
            FieldKey::KpiNarrative => text_filled(&report.kpi_narrative),
            FieldKey::PhysicalProgress => report.physical_progress_pct > 0.0,
            FieldKey::Observations => text_filled(&report.observations),
            FieldKey::ProgramLink => report.program_link.as_deref().is_some_and(text_filled),
            _ => false,
        },
        RecordPayload::Initiative(initiative) => match field {
            FieldKey::Title => text_filled(&initiative.title),
            FieldKey::FrameDetail => text_filled(&initiative.frame_detail),
            FieldKey::CarrierServices => !initiative.carrier_services.is_empty(),
            FieldKey::Observations => text_filled(&initiative.observations),
            FieldKey::ProgramLink => initiative.program_link.as_deref().is_some_and(text_filled),
            _ => false,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{InitiativePayload, ReportPayload, Rubric};

    fn report_with_n_filled(n: usize) -> RecordPayload {
        let mut report = ReportPayload::empty();
        let fillers: [&mut dyn FnMut(&mut ReportPayload); 8] = [
            &mut |r| r.activity_narrative = "activities".to_string(),
            &mut |r| r.start_date = chrono::NaiveDate::from_ymd_opt(2026, 1, 1),
            &mut |r| r.budget = 10.0,
            &mut |r| r.engaged = 5.0,
            &mut |r| r.disbursed = 2.0,
            &mut |r| r.kpi_narrative = "kpi".to_string(),
            &mut |r| r.physical_progress_pct = 40.0,
            &mut |r| r.observations = "obs".to_string(),
        ];
        for filler in fillers.into_iter().take(n) {
            filler(&mut report);
        }
        RecordPayload::Report(report)
    }

    // -- Scoring --

    #[test]
    fn six_of_eight_uniform_fields_scores_75() {
        let checklist = Checklist::default_report();
        assert_eq!(checklist.score(&report_with_n_filled(6)), 75);
    }

    #[test]
    fn empty_report_scores_0_full_scores_100() {
        let checklist = Checklist::default_report();
        assert_eq!(checklist.score(&report_with_n_filled(0)), 0);
        assert_eq!(checklist.score(&report_with_n_filled(8)), 100);
    }

    #[test]
    fn score_rounds_to_nearest() {
        // 1 of 3 fields: 33.33 -> 33; 2 of 3: 66.67 -> 67.
        let checklist = Checklist::uniform(&[
            FieldKey::ActivityNarrative,
            FieldKey::Budget,
            FieldKey::KpiNarrative,
        ]);
        let mut report = ReportPayload::empty();
        report.activity_narrative = "a".to_string();
        assert_eq!(checklist.score(&RecordPayload::Report(report.clone())), 33);
        report.budget = 1.0;
        assert_eq!(checklist.score(&RecordPayload::Report(report)), 67);
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let checklist = Checklist::uniform(&[FieldKey::ActivityNarrative]);
        let mut report = ReportPayload::empty();
        report.activity_narrative = "   \t\n ".to_string();
        assert_eq!(checklist.score(&RecordPayload::Report(report)), 0);
    }

    #[test]
    fn weights_shift_the_score() {
        let checklist = Checklist::weighted(vec![
            ChecklistItem {
                field: FieldKey::Budget,
                weight: 3,
            },
            ChecklistItem {
                field: FieldKey::Observations,
                weight: 1,
            },
        ]);
        let mut report = ReportPayload::empty();
        report.budget = 10.0;
        assert_eq!(checklist.score(&RecordPayload::Report(report)), 75);
    }

    #[test]
    fn empty_checklist_requires_nothing() {
        let checklist = Checklist::uniform(&[]);
        assert_eq!(checklist.score(&report_with_n_filled(0)), 100);
    }

    // -- Initiative checklist --

    #[test]
    fn initiative_defaults_score_their_own_fields() {
        let checklist = Checklist::default_initiative();
        let mut initiative = InitiativePayload::empty(Rubric::GeneralPolicy, 3);
        assert_eq!(checklist.score(&RecordPayload::Initiative(initiative.clone())), 0);
        initiative.title = "digital id act".to_string();
        initiative.frame_detail = "pillar 2".to_string();
        initiative.carrier_services = vec!["min-interior".to_string()];
        initiative.observations = "joint carry".to_string();
        initiative.program_link = Some("prog-11".to_string());
        assert_eq!(checklist.score(&RecordPayload::Initiative(initiative)), 100);
    }

    #[test]
    fn report_fields_never_fill_on_initiatives() {
        let checklist = Checklist::uniform(&[FieldKey::Budget]);
        let initiative = InitiativePayload::empty(Rubric::LegislativeText, 1);
        assert_eq!(checklist.score(&RecordPayload::Initiative(initiative)), 0);
    }

    // -- Determinism / serde --

    #[test]
    fn score_is_deterministic() {
        let checklist = Checklist::default_report();
        let payload = report_with_n_filled(5);
        assert_eq!(checklist.score(&payload), checklist.score(&payload));
    }

    #[test]
    fn checklist_serde_round_trip() {
        let checklist = Checklist::default_report();
        let json = serde_json::to_string(&checklist).expect("serialize");
        let restored: Checklist = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(checklist, restored);
    }
}
