//! Workflow records and their append-only transition history.
//!
//! A record is one reportable unit: a monthly report or a planning
//! initiative.  Its `status` is the state-machine position, its `version` a
//! monotonic counter used for optimistic concurrency, and its `history` an
//! append-only audit trail.  Invariant: `status` always equals the `to`
//! field of the last history entry (a record with empty history is a fresh
//! `Draft`); history is never rewritten.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hierarchy::LevelId;
use crate::payload::RecordPayload;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: &str) -> Self {
                Self(value.to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a workflow record.
    RecordId
);
string_id!(
    /// Identifier of an institutional entity (ministry, directorate, office).
    EntityId
);
string_id!(
    /// Identifier of an authenticated user acting on the workflow.
    ActorId
);
string_id!(
    /// Role name carried by an actor, resolved through the permission gate.
    RoleId
);

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Reporting period a record covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Month 1-12 of a calendar year.
    Monthly { year: i32, month: u32 },
    /// Whole calendar year (planning initiatives).
    Annual { year: i32 },
}

impl Period {
    pub fn monthly(year: i32, month: u32) -> Self {
        Self::Monthly { year, month }
    }

    pub fn annual(year: i32) -> Self {
        Self::Annual { year }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Self::Monthly { month, .. } => (1..=12).contains(month),
            Self::Annual { .. } => true,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly { year, month } => write!(f, "{year}-{month:02}"),
            Self::Annual { year } => write!(f, "{year}"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStatus
// ---------------------------------------------------------------------------

/// State-machine position of a record.
///
/// Rejection is transient: a rejected record lands straight back in `Draft`
/// with the reason recorded in history, so `Draft` is the only state an
/// origin entity ever edits in.  `Published` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Editable at the origin entity.
    Draft,
    /// Received and awaiting review at the given level.
    Submitted(LevelId),
    /// Marked ready to move upward as part of a batch at the given level.
    Consolidated(LevelId),
    /// Approved at the apex, awaiting publication.
    Validated,
    /// Published.  Terminal.
    Published,
}

impl RecordStatus {
    /// The review level currently holding the record, if any.
    pub fn holding_level(&self) -> Option<LevelId> {
        match self {
            Self::Submitted(level) | Self::Consolidated(level) => Some(*level),
            Self::Draft | Self::Validated | Self::Published => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => f.write_str("draft"),
            Self::Submitted(level) => write!(f, "submitted:{level}"),
            Self::Consolidated(level) => write!(f, "consolidated:{level}"),
            Self::Validated => f.write_str("validated"),
            Self::Published => f.write_str("published"),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// One transition in a record's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_role: RoleId,
    pub actor_id: ActorId,
    pub from: RecordStatus,
    pub to: RecordStatus,
    /// Mandatory for rejections, absent otherwise.
    pub reason: Option<String>,
    /// Payload digest observed when the transition was stamped.
    pub payload_digest: String,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One reportable unit moving through the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub origin_entity: EntityId,
    pub period: Period,
    pub status: RecordStatus,
    pub payload: RecordPayload,
    pub history: Vec<HistoryEntry>,
    /// Monotonic counter, incremented exactly once per mutation.
    pub version: u64,
}

impl Record {
    /// Fresh draft at version 0 with empty history.
    pub fn new_draft(
        id: RecordId,
        origin_entity: EntityId,
        period: Period,
        payload: RecordPayload,
    ) -> Self {
        Self {
            id,
            origin_entity,
            period,
            status: RecordStatus::Draft,
            payload,
            history: Vec::new(),
            version: 0,
        }
    }

    /// Apply a checked transition: append one history entry, move `status`,
    /// bump `version`.  Callers are responsible for having verified
    /// legality; this only maintains the record's own invariants.
    pub fn apply_transition(
        &mut self,
        to: RecordStatus,
        actor_role: &RoleId,
        actor_id: &ActorId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) {
        let entry = HistoryEntry {
            timestamp: now,
            actor_role: actor_role.clone(),
            actor_id: actor_id.clone(),
            from: self.status,
            to,
            reason,
            payload_digest: self.payload.digest(),
        };
        self.history.push(entry);
        self.status = to;
        self.version += 1;
    }

    /// Register a draft edit: version bump plus a Draft->Draft history entry
    /// so the audit trail shows who touched the payload and when.
    pub fn touch_draft(&mut self, actor_role: &RoleId, actor_id: &ActorId, now: DateTime<Utc>) {
        self.apply_transition(RecordStatus::Draft, actor_role, actor_id, None, now);
    }

    /// `status` must match the last history entry (or be `Draft` with no
    /// history).  Checked by tests and debug assertions, never silently
    /// repaired.
    pub fn invariants_hold(&self) -> bool {
        match self.history.last() {
            Some(entry) => self.status == entry.to && self.history.len() as u64 <= self.version,
            None => self.status == RecordStatus::Draft && self.version == 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ReportPayload;

    fn draft() -> Record {
        Record::new_draft(
            RecordId::new("rec-1"),
            EntityId::new("min-health"),
            Period::monthly(2026, 3),
            RecordPayload::Report(ReportPayload::empty()),
        )
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-10T09:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    // -- Construction --

    #[test]
    fn new_draft_starts_clean() {
        let record = draft();
        assert_eq!(record.status, RecordStatus::Draft);
        assert_eq!(record.version, 0);
        assert!(record.history.is_empty());
        assert!(record.invariants_hold());
    }

    // -- Transitions --

    #[test]
    fn apply_transition_appends_and_bumps() {
        let mut record = draft();
        let digest_before = record.payload.digest();
        record.apply_transition(
            RecordStatus::Submitted(LevelId(1)),
            &RoleId::new("focal-point"),
            &ActorId::new("u-12"),
            None,
            t0(),
        );
        assert_eq!(record.status, RecordStatus::Submitted(LevelId(1)));
        assert_eq!(record.version, 1);
        assert_eq!(record.history.len(), 1);
        let entry = &record.history[0];
        assert_eq!(entry.from, RecordStatus::Draft);
        assert_eq!(entry.to, RecordStatus::Submitted(LevelId(1)));
        assert_eq!(entry.payload_digest, digest_before);
        assert!(entry.reason.is_none());
        assert!(record.invariants_hold());
    }

    #[test]
    fn touch_draft_keeps_status_but_bumps_version() {
        let mut record = draft();
        record.touch_draft(&RoleId::new("focal-point"), &ActorId::new("u-12"), t0());
        assert_eq!(record.status, RecordStatus::Draft);
        assert_eq!(record.version, 1);
        assert_eq!(record.history.len(), 1);
        assert_eq!(record.history[0].from, RecordStatus::Draft);
        assert_eq!(record.history[0].to, RecordStatus::Draft);
        assert!(record.invariants_hold());
    }

    #[test]
    fn invariants_detect_tampered_status() {
        let mut record = draft();
        record.apply_transition(
            RecordStatus::Submitted(LevelId(1)),
            &RoleId::new("focal-point"),
            &ActorId::new("u-12"),
            None,
            t0(),
        );
        record.status = RecordStatus::Validated;
        assert!(!record.invariants_hold());
    }

    // -- Status helpers --

    #[test]
    fn holding_level_only_for_review_states() {
        assert_eq!(RecordStatus::Draft.holding_level(), None);
        assert_eq!(
            RecordStatus::Submitted(LevelId(2)).holding_level(),
            Some(LevelId(2))
        );
        assert_eq!(
            RecordStatus::Consolidated(LevelId(1)).holding_level(),
            Some(LevelId(1))
        );
        assert_eq!(RecordStatus::Validated.holding_level(), None);
        assert_eq!(RecordStatus::Published.holding_level(), None);
    }

    #[test]
    fn only_published_is_terminal() {
        assert!(RecordStatus::Published.is_terminal());
        assert!(!RecordStatus::Validated.is_terminal());
        assert!(!RecordStatus::Draft.is_terminal());
    }

    // -- Period --

    #[test]
    fn period_validity_and_display() {
        assert!(Period::monthly(2026, 12).is_valid());
        assert!(!Period::monthly(2026, 13).is_valid());
        assert!(!Period::monthly(2026, 0).is_valid());
        assert!(Period::annual(2026).is_valid());
        assert_eq!(Period::monthly(2026, 3).to_string(), "2026-03");
        assert_eq!(Period::annual(2026).to_string(), "2026");
    }

    // -- Serde --

    #[test]
    fn record_serde_round_trip() {
        let mut record = draft();
        record.apply_transition(
            RecordStatus::Submitted(LevelId(1)),
            &RoleId::new("focal-point"),
            &ActorId::new("u-12"),
            None,
            t0(),
        );
        let json = serde_json::to_string(&record).expect("serialize");
        let restored: Record = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(record, restored);
    }

    #[test]
    fn status_display_forms() {
        assert_eq!(RecordStatus::Draft.to_string(), "draft");
        assert_eq!(RecordStatus::Submitted(LevelId(1)).to_string(), "submitted:L1");
        assert_eq!(
            RecordStatus::Consolidated(LevelId(2)).to_string(),
            "consolidated:L2"
        );
        assert_eq!(RecordStatus::Published.to_string(), "published");
    }
}
