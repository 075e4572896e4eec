//! Append-only event log kept by the engine.
//!
//! Every state change and advisory finding appends one event; the log is a
//! sequence (monotonic `seq`, engine-supplied timestamp) that external
//! notification and audit layers can drain.  The engine never reads its own
//! log back to make decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anomaly::Severity;
use crate::consolidation::BatchId;
use crate::hierarchy::{EscalationTier, LevelId};
use crate::record::{EntityId, Period, RecordId};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowEventKind {
    RecordCreated {
        record: RecordId,
        entity: EntityId,
    },
    DraftUpdated {
        record: RecordId,
    },
    RecordSubmitted {
        record: RecordId,
        to_level: LevelId,
        batch: BatchId,
    },
    RecordConsolidated {
        record: RecordId,
        level: LevelId,
        batch: BatchId,
    },
    BatchTransmitted {
        batch: BatchId,
        from_level: LevelId,
        to_level: LevelId,
        record_count: usize,
    },
    RecordValidated {
        record: RecordId,
    },
    RecordPublished {
        record: RecordId,
    },
    RecordRejected {
        record: RecordId,
        /// Rendered state the record was rejected from.
        from: String,
        reason: String,
    },
    AnomalyFlagged {
        record: RecordId,
        rule_id: String,
        severity: Severity,
    },
    DeadlineWarning {
        entity: EntityId,
        period: Period,
        days_remaining: i64,
    },
    DeadlineOverdue {
        entity: EntityId,
        period: Period,
        days_overdue: u32,
    },
    EscalationRaised {
        entity: EntityId,
        period: Period,
        tier: EscalationTier,
    },
}

/// One entry of the engine's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Monotonic position in the log, starting at 0.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: WorkflowEventKind,
}
