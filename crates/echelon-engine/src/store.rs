//! In-memory record store with deterministic iteration.
//!
//! Single-writer by construction: the engine owns the store and serializes
//! mutations.  `BTreeMap` keying gives stable iteration order for sweeps
//! (deadline checks, fill-rate queries) without any sorting at query time.

use std::collections::BTreeMap;

use crate::error::WorkflowError;
use crate::record::{EntityId, Period, Record, RecordId};

/// All records known to the engine, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: BTreeMap<RecordId, Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record.  Ids are caller-supplied, so collisions are a
    /// caller error, not an overwrite.
    pub fn insert(&mut self, record: Record) -> Result<(), WorkflowError> {
        if self.records.contains_key(&record.id) {
            return Err(WorkflowError::InvalidInput {
                detail: format!("record '{}' already exists", record.id),
            });
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn get(&self, id: &RecordId) -> Result<&Record, WorkflowError> {
        self.records.get(id).ok_or_else(|| WorkflowError::NotFound {
            id: id.as_str().to_string(),
        })
    }

    pub fn get_mut(&mut self, id: &RecordId) -> Result<&mut Record, WorkflowError> {
        self.records
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound {
                id: id.as_str().to_string(),
            })
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    /// All records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Records authored by `entity` for `period`, in id order.
    pub fn by_entity_period<'a>(
        &'a self,
        entity: &'a EntityId,
        period: Period,
    ) -> impl Iterator<Item = &'a Record> {
        self.records
            .values()
            .filter(move |record| record.origin_entity == *entity && record.period == period)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_code;
    use crate::payload::{RecordPayload, ReportPayload};

    fn record(id: &str, entity: &str, period: Period) -> Record {
        Record::new_draft(
            RecordId::new(id),
            EntityId::new(entity),
            period,
            RecordPayload::Report(ReportPayload::empty()),
        )
    }

    #[test]
    fn insert_then_get() {
        let mut store = RecordStore::new();
        store
            .insert(record("rec-1", "min-health", Period::monthly(2026, 3)))
            .expect("insert");
        assert!(store.contains(&RecordId::new("rec-1")));
        assert_eq!(store.len(), 1);
        let fetched = store.get(&RecordId::new("rec-1")).expect("get");
        assert_eq!(fetched.origin_entity, EntityId::new("min-health"));
    }

    #[test]
    fn duplicate_id_is_rejected_not_overwritten() {
        let mut store = RecordStore::new();
        store
            .insert(record("rec-1", "min-health", Period::monthly(2026, 3)))
            .expect("insert");
        let err = store
            .insert(record("rec-1", "min-finance", Period::monthly(2026, 4)))
            .unwrap_err();
        assert_eq!(error_code(&err), "WF_INVALID_INPUT");
        // Original untouched.
        let kept = store.get(&RecordId::new("rec-1")).expect("get");
        assert_eq!(kept.origin_entity, EntityId::new("min-health"));
    }

    #[test]
    fn missing_id_is_not_found() {
        let store = RecordStore::new();
        let err = store.get(&RecordId::new("rec-9")).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::NotFound {
                id: "rec-9".to_string()
            }
        );
    }

    #[test]
    fn iteration_is_id_ordered() {
        let mut store = RecordStore::new();
        for id in ["rec-3", "rec-1", "rec-2"] {
            store
                .insert(record(id, "min-health", Period::monthly(2026, 3)))
                .expect("insert");
        }
        let ids: Vec<&str> = store.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["rec-1", "rec-2", "rec-3"]);
    }

    #[test]
    fn entity_period_filter() {
        let mut store = RecordStore::new();
        store
            .insert(record("rec-1", "min-health", Period::monthly(2026, 3)))
            .expect("insert");
        store
            .insert(record("rec-2", "min-health", Period::monthly(2026, 4)))
            .expect("insert");
        store
            .insert(record("rec-3", "min-finance", Period::monthly(2026, 3)))
            .expect("insert");
        let entity = EntityId::new("min-health");
        let ids: Vec<&str> = store
            .by_entity_period(&entity, Period::monthly(2026, 3))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["rec-1"]);
    }
}
