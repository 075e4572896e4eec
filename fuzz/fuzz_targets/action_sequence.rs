#![no_main]

use chrono::{DateTime, NaiveDate};
use echelon_engine::engine::{Actor, WorkflowEngine};
use echelon_engine::hierarchy::{Hierarchy, HierarchyLevel, LevelId};
use echelon_engine::payload::{RecordPayload, ReportPayload};
use echelon_engine::permission::{PermissionGate, ProfileKind, RoleAssignment};
use echelon_engine::record::{EntityId, Period, RecordId};
use libfuzzer_sys::fuzz_target;

const MAX_STEPS: usize = 64;
const MAX_RECORDS: usize = 8;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    run_action_program(data);
});

/// Interpret the input as a program of workflow actions with adversarial
/// versions, periods, and payloads.  Operations may fail; record invariants
/// must hold after every step and the engine must never panic.
fn run_action_program(data: &[u8]) {
    let hierarchy = match Hierarchy::new(vec![
        HierarchyLevel::new(LevelId(0), "origin", 5),
        HierarchyLevel::new(LevelId(1), "review", 5),
        HierarchyLevel::new(LevelId(2), "apex", 5),
    ]) {
        Ok(h) => h,
        Err(_) => return,
    };
    let gate = PermissionGate::from_assignments(vec![
        RoleAssignment::with_profile("author", LevelId(0), ProfileKind::OriginSubmitter),
        RoleAssignment::with_profile("reviewer", LevelId(1), ProfileKind::LevelReviewer),
        RoleAssignment::with_profile("approver", LevelId(2), ProfileKind::ApexReviewer),
    ]);
    let mut engine = WorkflowEngine::new(hierarchy, gate);
    if let Some(now) = DateTime::from_timestamp(1_770_000_000 + i64::from(byte(data, 0)), 0) {
        engine.set_now(now);
    }

    let period = Period::monthly(2026, 3);
    let entity = entity_for(byte(data, 1));
    let author = Actor::new("u-author", "author", entity.as_str(), LevelId(0));
    let reviewer = Actor::new("u-reviewer", "reviewer", "review-office", LevelId(1));
    let approver = Actor::new("u-approver", "approver", "apex-office", LevelId(2));

    let mut cursor = 2usize;
    for _ in 0..MAX_STEPS {
        let opcode = byte(data, cursor);
        cursor = cursor.saturating_add(1);
        let arg = byte(data, cursor);
        cursor = cursor.saturating_add(1);
        let id = record_id(arg);

        match opcode % 9 {
            0 => {
                // Sometimes an invalid month to exercise input rejection.
                let month = if arg & 0x10 == 0 { 3 } else { u32::from(arg % 16) };
                let _ = engine.create_draft(
                    &author,
                    id,
                    Period::monthly(2026, month),
                    payload_for(arg),
                );
            }
            1 => {
                let version = claimed_version(&engine, &id, arg);
                let _ = engine.update_draft(&author, &id, version, payload_for(arg >> 2));
            }
            2 => {
                let version = claimed_version(&engine, &id, arg);
                let _ = engine.submit(&author, &id, version);
            }
            3 => {
                let _ = engine.consolidate(&reviewer, LevelId(1), period, &entity);
            }
            4 => {
                let batch_id = engine
                    .batches()
                    .nth(usize::from(arg) % 4)
                    .map(|batch| batch.id.clone());
                if let Some(batch_id) = batch_id {
                    let actor = if arg & 1 == 0 { &reviewer } else { &approver };
                    let _ = engine.transmit(actor, &batch_id);
                }
            }
            5 => {
                let version = claimed_version(&engine, &id, arg);
                let _ = engine.validate(&approver, &id, version);
            }
            6 => {
                let version = claimed_version(&engine, &id, arg);
                let _ = engine.publish(&approver, &id, version);
            }
            7 => {
                let version = claimed_version(&engine, &id, arg);
                let actor = if arg & 1 == 0 { &reviewer } else { &approver };
                let reason = if arg & 2 == 0 { "figures disputed" } else { " " };
                let _ = engine.reject(actor, &id, version, reason);
            }
            _ => {
                let today = NaiveDate::from_ymd_opt(2026, 1 + u32::from(arg % 12), 15);
                if let Some(today) = today {
                    let _ = engine.deadline_events(period, &[entity.clone()], today);
                    let _ = engine.fill_rate(period, &[entity.clone()], today);
                }
                let _ = engine.score_completeness(&id);
                let _ = engine.evaluate_anomalies(&id);
            }
        }

        for index in 0..MAX_RECORDS {
            if let Ok(record) = engine.record(&record_id(index as u8)) {
                assert!(record.invariants_hold(), "invariants broken for {}", record.id);
            }
        }
    }
}

fn record_id(arg: u8) -> RecordId {
    RecordId::new(&format!("rec-{}", usize::from(arg) % MAX_RECORDS))
}

fn entity_for(arg: u8) -> EntityId {
    if arg % 2 == 0 {
        EntityId::new("dir-alpha")
    } else {
        EntityId::new("dir-beta")
    }
}

/// Half the time the record's true version, half the time a guess.
fn claimed_version(engine: &WorkflowEngine, id: &RecordId, arg: u8) -> u64 {
    if arg & 1 == 0 {
        engine.record(id).map(|record| record.version).unwrap_or(0)
    } else {
        u64::from(arg >> 4)
    }
}

fn payload_for(arg: u8) -> RecordPayload {
    let mut report = ReportPayload::empty();
    if arg & 1 != 0 {
        report.activity_narrative = "field activity narrative ".repeat(usize::from(arg % 8) + 1);
    }
    if arg & 2 != 0 {
        report.start_date = NaiveDate::from_ymd_opt(2026, 1, 1);
        report.budget = f64::from(arg) + 1.0;
        report.engaged = f64::from(arg / 2);
        report.disbursed = f64::from(arg / 3);
    }
    if arg & 4 != 0 {
        report.kpi_narrative = "indicator movement".to_string();
        report.physical_progress_pct = f64::from(arg % 101);
    }
    if arg & 8 != 0 {
        report.observations = "noted".to_string();
        report.program_link = Some("prog-fuzz".to_string());
    }
    RecordPayload::Report(report)
}

fn byte(data: &[u8], index: usize) -> u8 {
    if data.is_empty() {
        return 0;
    }
    data[index % data.len()]
}
