#![forbid(unsafe_code)]
//! Integration tests for deadline tracking, escalation, and fill-rate
//! reporting through the engine API.

use chrono::{DateTime, NaiveDate, Utc};

use echelon_engine::deadline::DeadlineStage;
use echelon_engine::engine::{Actor, WorkflowEngine};
use echelon_engine::event::WorkflowEventKind;
use echelon_engine::hierarchy::{EscalationTier, Hierarchy, HierarchyLevel, LevelId};
use echelon_engine::payload::{RecordPayload, ReportPayload};
use echelon_engine::permission::{PermissionGate, ProfileKind, RoleAssignment};
use echelon_engine::record::{EntityId, Period, RecordId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First review level due on the 28th so month-boundary arithmetic is
/// exercised.
fn engine_due_28() -> WorkflowEngine {
    let hierarchy = Hierarchy::new(vec![
        HierarchyLevel::new(LevelId(0), "directorate", 5),
        HierarchyLevel::new(LevelId(1), "secretariat", 28),
        HierarchyLevel::new(LevelId(2), "apex-office", 5),
    ])
    .expect("valid chain");
    let gate = PermissionGate::from_assignments(vec![
        RoleAssignment::with_profile("focal-point", LevelId(0), ProfileKind::OriginSubmitter),
        RoleAssignment::with_profile("sg-reviewer", LevelId(1), ProfileKind::LevelReviewer),
        RoleAssignment::with_profile("apex-office", LevelId(2), ProfileKind::ApexReviewer),
    ]);
    let mut engine = WorkflowEngine::new(hierarchy, gate);
    engine.set_now(
        DateTime::parse_from_rfc3339("2026-02-20T08:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc),
    );
    engine
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn filled_report() -> RecordPayload {
    let mut report = ReportPayload::empty();
    report.activity_narrative =
        "completed the census enumeration training for all regional teams".repeat(2);
    report.start_date = NaiveDate::from_ymd_opt(2026, 1, 5);
    report.budget = 10.0;
    report.engaged = 8.0;
    report.disbursed = 6.0;
    report.kpi_narrative = "training completion at 96 percent".to_string();
    report.physical_progress_pct = 62.0;
    report.observations = "venue costs under budget".to_string();
    report.program_link = Some("prog-census".to_string());
    RecordPayload::Report(report)
}

fn submit_for(engine: &mut WorkflowEngine, entity: &str, id: &str, period: Period) {
    let actor = Actor::new("u-1", "focal-point", entity, LevelId(0));
    engine
        .create_draft(&actor, RecordId::new(id), period, filled_report())
        .expect("create");
    engine.submit(&actor, &RecordId::new(id), 0).expect("submit");
}

// ---------------------------------------------------------------------------
// Deadline checks
// ---------------------------------------------------------------------------

#[test]
fn three_days_before_a_day_28_due_date_is_warning() {
    let engine = engine_due_28();
    // January 2026 is due at the secretariat on February 28.
    let check = engine
        .check_deadline(LevelId(1), Period::monthly(2026, 1), date(2026, 2, 25))
        .expect("check");
    assert_eq!(check.due_date, date(2026, 2, 28));
    assert_eq!(check.days_remaining, 3);
    assert_eq!(check.stage, DeadlineStage::Warning);
}

#[test]
fn two_days_after_a_day_28_due_date_is_overdue() {
    let engine = engine_due_28();
    let check = engine
        .check_deadline(LevelId(1), Period::monthly(2026, 1), date(2026, 3, 2))
        .expect("check");
    assert_eq!(check.days_remaining, -2);
    assert_eq!(
        check.stage,
        DeadlineStage::Overdue {
            days_overdue: 2,
            tier: None
        }
    );
}

#[test]
fn unknown_level_is_not_found() {
    let engine = engine_due_28();
    let err = engine
        .check_deadline(LevelId(9), Period::monthly(2026, 1), date(2026, 2, 25))
        .unwrap_err();
    assert_eq!(echelon_engine::error_code(&err), "WF_NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Event sweeps
// ---------------------------------------------------------------------------

#[test]
fn sweep_warns_only_entities_that_have_not_submitted() {
    let mut engine = engine_due_28();
    let period = Period::monthly(2026, 1);
    submit_for(&mut engine, "dir-census", "rec-1", period);
    let expected = [
        EntityId::new("dir-census"),
        EntityId::new("dir-statistics"),
    ];
    let emitted = engine
        .deadline_events(period, &expected, date(2026, 2, 25))
        .expect("sweep");
    assert_eq!(emitted.len(), 1);
    assert!(matches!(
        &emitted[0].kind,
        WorkflowEventKind::DeadlineWarning { entity, days_remaining: 3, .. }
            if *entity == EntityId::new("dir-statistics")
    ));
}

#[test]
fn sweep_escalates_through_the_tiers() {
    let mut engine = engine_due_28();
    let period = Period::monthly(2026, 1);
    let expected = [EntityId::new("dir-statistics")];
    let cases = [
        (date(2026, 3, 5), Some(EscalationTier::NotifyOwner)),
        (date(2026, 3, 10), Some(EscalationTier::NotifySupervisor)),
        (date(2026, 3, 15), Some(EscalationTier::NotifyCoordination)),
        (date(2026, 3, 30), Some(EscalationTier::SanctionReview)),
    ];
    for (today, expected_tier) in cases {
        let emitted = engine
            .deadline_events(period, &expected, today)
            .expect("sweep");
        let raised = emitted.iter().find_map(|e| match &e.kind {
            WorkflowEventKind::EscalationRaised { tier, .. } => Some(*tier),
            _ => None,
        });
        assert_eq!(raised, expected_tier, "as of {today}");
    }
}

#[test]
fn sweep_emits_nothing_while_on_track() {
    let mut engine = engine_due_28();
    let emitted = engine
        .deadline_events(
            Period::monthly(2026, 1),
            &[EntityId::new("dir-statistics")],
            date(2026, 2, 1),
        )
        .expect("sweep");
    assert!(emitted.is_empty());
}

// ---------------------------------------------------------------------------
// Fill rate
// ---------------------------------------------------------------------------

#[test]
fn fill_rate_reports_one_decimal_percentages() {
    let mut engine = engine_due_28();
    let period = Period::monthly(2026, 1);
    submit_for(&mut engine, "dir-census", "rec-1", period);
    let expected = [
        EntityId::new("dir-census"),
        EntityId::new("dir-statistics"),
        EntityId::new("dir-archives"),
    ];
    let fill = engine
        .fill_rate(period, &expected, date(2026, 2, 25))
        .expect("fill rate");
    assert_eq!(fill.expected, 3);
    assert_eq!(fill.submitted, 1);
    assert_eq!(fill.pct, 33.3);
    // Not yet past due: nobody is late.
    assert!(fill.rows.iter().all(|row| row.days_late.is_none()));
}

#[test]
fn fill_rate_carries_days_late_once_overdue() {
    let mut engine = engine_due_28();
    let period = Period::monthly(2026, 1);
    submit_for(&mut engine, "dir-census", "rec-1", period);
    let expected = [
        EntityId::new("dir-census"),
        EntityId::new("dir-statistics"),
    ];
    let fill = engine
        .fill_rate(period, &expected, date(2026, 3, 10))
        .expect("fill rate");
    assert_eq!(fill.pct, 50.0);
    let row = fill
        .rows
        .iter()
        .find(|row| row.entity == EntityId::new("dir-statistics"))
        .expect("row");
    assert!(!row.submitted);
    assert_eq!(row.days_late, Some(10));
}

#[test]
fn drafts_do_not_count_as_submitted() {
    let mut engine = engine_due_28();
    let period = Period::monthly(2026, 1);
    let actor = Actor::new("u-1", "focal-point", "dir-census", LevelId(0));
    engine
        .create_draft(&actor, RecordId::new("rec-1"), period, filled_report())
        .expect("create");
    let fill = engine
        .fill_rate(period, &[EntityId::new("dir-census")], date(2026, 2, 25))
        .expect("fill rate");
    assert_eq!(fill.submitted, 0);
    assert_eq!(fill.pct, 0.0);
}
