//! Consolidation batches: the unit a review level moves upward.
//!
//! A batch groups the records one child entity submitted to one level for
//! one period.  Batches are created implicitly when the first record
//! arrives, consolidated atomically (every member validated before any is
//! moved), and transmitted idempotently.  Membership is a `BTreeSet` so
//! iteration order is stable.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hierarchy::LevelId;
use crate::record::{EntityId, Period, RecordId};

// ---------------------------------------------------------------------------
// BatchId / BatchStatus
// ---------------------------------------------------------------------------

/// Stable identifier of a consolidation batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a batch at its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Accepting arriving records.
    Open,
    /// Members validated and marked ready to move upward.
    Consolidated,
    /// Pushed to the next level.  Terminal for this batch.
    Transmitted,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Consolidated => "consolidated",
            Self::Transmitted => "transmitted",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// ConsolidationBatch
// ---------------------------------------------------------------------------

/// Records from one child entity awaiting review at one level for one
/// period.  The engine owns all status legality; this type only maintains
/// membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationBatch {
    pub id: BatchId,
    pub level: LevelId,
    pub period: Period,
    /// Entity whose submissions this batch groups.
    pub child_entity: EntityId,
    pub status: BatchStatus,
    pub members: BTreeSet<RecordId>,
    pub created_at: DateTime<Utc>,
    /// Batch at the next level that received the members on transmit.
    /// Makes repeated transmits idempotent.
    pub forwarded_to: Option<BatchId>,
}

impl ConsolidationBatch {
    pub fn open(
        id: BatchId,
        level: LevelId,
        period: Period,
        child_entity: EntityId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            level,
            period,
            child_entity,
            status: BatchStatus::Open,
            members: BTreeSet::new(),
            created_at,
            forwarded_to: None,
        }
    }

    /// Add a record; returns false if it was already a member.
    pub fn insert_member(&mut self, record: RecordId) -> bool {
        self.members.insert(record)
    }

    /// Drop a record (rejection or validation pulls it out of its batch).
    pub fn remove_member(&mut self, record: &RecordId) -> bool {
        self.members.remove(record)
    }

    pub fn contains(&self, record: &RecordId) -> bool {
        self.members.contains(record)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-04-01T08:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn batch() -> ConsolidationBatch {
        ConsolidationBatch::open(
            BatchId::new("b0001-L1-2026-03-min-health"),
            LevelId(1),
            Period::monthly(2026, 3),
            EntityId::new("min-health"),
            t0(),
        )
    }

    #[test]
    fn opens_empty() {
        let batch = batch();
        assert_eq!(batch.status, BatchStatus::Open);
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn membership_is_a_set() {
        let mut batch = batch();
        assert!(batch.insert_member(RecordId::new("rec-1")));
        assert!(!batch.insert_member(RecordId::new("rec-1")));
        assert!(batch.insert_member(RecordId::new("rec-2")));
        assert_eq!(batch.len(), 2);
        assert!(batch.contains(&RecordId::new("rec-1")));
        assert!(batch.remove_member(&RecordId::new("rec-1")));
        assert!(!batch.remove_member(&RecordId::new("rec-1")));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn member_iteration_is_sorted() {
        let mut batch = batch();
        batch.insert_member(RecordId::new("rec-9"));
        batch.insert_member(RecordId::new("rec-1"));
        batch.insert_member(RecordId::new("rec-5"));
        let ids: Vec<&str> = batch.members.iter().map(|r| r.as_str()).collect();
        assert_eq!(ids, ["rec-1", "rec-5", "rec-9"]);
    }

    #[test]
    fn batch_serde_round_trip() {
        let mut batch = batch();
        batch.insert_member(RecordId::new("rec-1"));
        let json = serde_json::to_string(&batch).expect("serialize");
        let restored: ConsolidationBatch = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(batch, restored);
    }
}
