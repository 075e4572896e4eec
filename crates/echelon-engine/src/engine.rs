//! The workflow engine: the single writer over records and batches.
//!
//! Composes the store, the permission gate, the transition table, the
//! completeness checklists, and the anomaly rules.  Every mutating
//! operation runs the same fixed check order: permission gate, existence,
//! version, state legality, operation-specific validation.  A failure at
//! any stage performs no mutation; a success appends exactly one history
//! entry per touched record and bumps its version by one.
//!
//! Time never comes from the clock inside an operation: `now` is engine
//! state set via [`WorkflowEngine::set_now`], so sequences replay
//! deterministically in tests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::anomaly::{AnomalyConfig, AnomalyFlag};
use crate::completeness::{Checklist, DEFAULT_SUBMISSION_THRESHOLD};
use crate::consolidation::{BatchId, BatchStatus, ConsolidationBatch};
use crate::deadline::{self, DeadlineCheck, DeadlineStage};
use crate::error::WorkflowError;
use crate::event::{WorkflowEvent, WorkflowEventKind};
use crate::hierarchy::{Hierarchy, LevelId};
use crate::payload::{PayloadKind, RecordPayload};
use crate::permission::{Capability, PermissionGate};
use crate::record::{ActorId, EntityId, Period, Record, RecordId, RecordStatus, RoleId};
use crate::store::RecordStore;
use crate::transition::{self, WorkflowAction};

// ---------------------------------------------------------------------------
// Actor / fill-rate views
// ---------------------------------------------------------------------------

/// Who is acting: an authenticated user with a role, home entity, and the
/// hierarchy level they act at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: RoleId,
    pub entity: EntityId,
    pub level: LevelId,
}

impl Actor {
    pub fn new(id: &str, role: &str, entity: &str, level: LevelId) -> Self {
        Self {
            id: ActorId::new(id),
            role: RoleId::new(role),
            entity: EntityId::new(entity),
            level,
        }
    }
}

/// Per-entity submission status for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRow {
    pub entity: EntityId,
    pub submitted: bool,
    /// Days past due, only for entities that have not submitted.
    pub days_late: Option<u32>,
}

/// Fill-rate of expected reporters for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRate {
    pub period: Period,
    pub expected: usize,
    pub submitted: usize,
    /// 0-100 with one decimal, 100 when nothing is expected.
    pub pct: f64,
    pub rows: Vec<FillRow>,
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Single-writer workflow core.  `&mut self` methods are the critical
/// section; wrap the engine in a lock to share it.
#[derive(Debug)]
pub struct WorkflowEngine {
    hierarchy: Hierarchy,
    gate: PermissionGate,
    anomalies: AnomalyConfig,
    report_checklist: Checklist,
    initiative_checklist: Checklist,
    submission_threshold: u8,
    store: RecordStore,
    batches: BTreeMap<BatchId, ConsolidationBatch>,
    events: Vec<WorkflowEvent>,
    now: DateTime<Utc>,
    batch_seq: u64,
}

impl WorkflowEngine {
    pub fn new(hierarchy: Hierarchy, gate: PermissionGate) -> Self {
        Self {
            hierarchy,
            gate,
            anomalies: AnomalyConfig::default(),
            report_checklist: Checklist::default_report(),
            initiative_checklist: Checklist::default_initiative(),
            submission_threshold: DEFAULT_SUBMISSION_THRESHOLD,
            store: RecordStore::new(),
            batches: BTreeMap::new(),
            events: Vec::new(),
            now: Utc::now(),
            batch_seq: 0,
        }
    }

    pub fn with_anomaly_config(mut self, config: AnomalyConfig) -> Self {
        self.anomalies = config;
        self
    }

    pub fn with_checklist(mut self, kind: PayloadKind, checklist: Checklist) -> Self {
        match kind {
            PayloadKind::Report => self.report_checklist = checklist,
            PayloadKind::Initiative => self.initiative_checklist = checklist,
        }
        self
    }

    pub fn with_submission_threshold(mut self, threshold: u8) -> Self {
        self.submission_threshold = threshold;
        self
    }

    /// Swap the anomaly rule set, e.g. when rules are tightened mid-period.
    pub fn set_anomaly_config(&mut self, config: AnomalyConfig) {
        self.anomalies = config;
    }

    /// Inject the timestamp stamped on subsequent history entries and
    /// events.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    // -----------------------------------------------------------------------
    // Drafting
    // -----------------------------------------------------------------------

    /// Create a draft owned by the actor's entity.
    pub fn create_draft(
        &mut self,
        actor: &Actor,
        id: RecordId,
        period: Period,
        mut payload: RecordPayload,
    ) -> Result<&Record, WorkflowError> {
        self.gate
            .require(&actor.role, self.hierarchy.origin(), Capability::Submit)?;
        if !period.is_valid() {
            return Err(WorkflowError::InvalidInput {
                detail: format!("invalid period '{period}'"),
            });
        }
        if let RecordPayload::Report(report) = &mut payload {
            report.refresh_execution_pct();
        }
        let record = Record::new_draft(id.clone(), actor.entity.clone(), period, payload);
        self.store.insert(record)?;
        info!(record = %id, entity = %actor.entity, %period, "draft created");
        self.push_event(WorkflowEventKind::RecordCreated {
            record: id.clone(),
            entity: actor.entity.clone(),
        });
        self.store.get(&id)
    }

    /// Replace a draft's payload.  One history entry, one version bump.
    pub fn update_draft(
        &mut self,
        actor: &Actor,
        id: &RecordId,
        expected_version: u64,
        mut payload: RecordPayload,
    ) -> Result<&Record, WorkflowError> {
        self.gate
            .require(&actor.role, self.hierarchy.origin(), Capability::Submit)?;
        let record = self.store.get(id)?;
        self.require_owner(actor, record)?;
        Self::require_version(record, expected_version)?;
        if record.status != RecordStatus::Draft {
            return Err(WorkflowError::InvalidTransition {
                from: record.status.to_string(),
                action: "update_draft".to_string(),
            });
        }
        if payload.kind() != record.payload.kind() {
            return Err(WorkflowError::InvalidInput {
                detail: format!(
                    "payload kind '{}' does not match record kind '{}'",
                    payload.kind(),
                    record.payload.kind()
                ),
            });
        }
        if let RecordPayload::Report(report) = &mut payload {
            report.refresh_execution_pct();
        }
        let now = self.now;
        let record = self.store.get_mut(id)?;
        record.payload = payload;
        record.touch_draft(&actor.role, &actor.id, now);
        self.push_event(WorkflowEventKind::DraftUpdated { record: id.clone() });
        self.store.get(id)
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Submit a draft to the first review level.  Gated on the completeness
    /// threshold and hard-blocking anomaly rules; advisory flags surface as
    /// events without blocking.  Returns the receiving batch.
    pub fn submit(
        &mut self,
        actor: &Actor,
        id: &RecordId,
        expected_version: u64,
    ) -> Result<BatchId, WorkflowError> {
        self.gate
            .require(&actor.role, self.hierarchy.origin(), Capability::Submit)?;
        let record = self.store.get(id)?;
        self.require_owner(actor, record)?;
        Self::require_version(record, expected_version)?;
        let to = Self::require_legal(record.status, WorkflowAction::Submit, &self.hierarchy)?;
        let score = self.checklist_for(record.payload.kind()).score(&record.payload);
        if score < self.submission_threshold {
            return Err(WorkflowError::ValidationFailed {
                rule_id: "completeness".to_string(),
            });
        }
        if let Some(flag) = self.anomalies.first_hard_block(&record.payload) {
            return Err(WorkflowError::ValidationFailed {
                rule_id: flag.rule_id,
            });
        }
        let flags = self.anomalies.evaluate(&record.payload);
        let entity = record.origin_entity.clone();
        let period = record.period;

        let now = self.now;
        let record = self.store.get_mut(id)?;
        record.apply_transition(to, &actor.role, &actor.id, None, now);
        let to_level = self.hierarchy.first_review_level();
        let batch_id = self.open_batch_for(to_level, period, entity);
        if let Some(batch) = self.batches.get_mut(&batch_id) {
            batch.insert_member(id.clone());
        }
        info!(record = %id, batch = %batch_id, %to_level, "record submitted");
        self.push_event(WorkflowEventKind::RecordSubmitted {
            record: id.clone(),
            to_level,
            batch: batch_id.clone(),
        });
        for flag in flags {
            warn!(record = %id, rule = %flag.rule_id, severity = %flag.severity, "anomaly flagged");
            self.push_event(WorkflowEventKind::AnomalyFlagged {
                record: id.clone(),
                rule_id: flag.rule_id,
                severity: flag.severity,
            });
        }
        Ok(batch_id)
    }

    // -----------------------------------------------------------------------
    // Consolidation / transmission
    // -----------------------------------------------------------------------

    /// Consolidate the open batch of `child_entity` at `level` for
    /// `period`.  Atomic: every member is checked before any is moved.
    pub fn consolidate(
        &mut self,
        actor: &Actor,
        level: LevelId,
        period: Period,
        child_entity: &EntityId,
    ) -> Result<BatchId, WorkflowError> {
        self.gate.require(&actor.role, level, Capability::Consolidate)?;
        let batch = self
            .batches
            .values()
            .find(|b| {
                b.status == BatchStatus::Open
                    && b.level == level
                    && b.period == period
                    && b.child_entity == *child_entity
            })
            .ok_or_else(|| WorkflowError::NotFound {
                id: format!("open batch {level}/{period}/{child_entity}"),
            })?;
        let batch_id = batch.id.clone();
        if batch.is_empty() {
            return Err(WorkflowError::InvalidInput {
                detail: format!("batch '{batch_id}' has no members"),
            });
        }
        let members: Vec<RecordId> = batch.members.iter().cloned().collect();

        // Validate every member before touching any.
        for member in &members {
            let record = self.store.get(member)?;
            if record.status != RecordStatus::Submitted(level) {
                return Err(WorkflowError::InvalidTransition {
                    from: record.status.to_string(),
                    action: WorkflowAction::Consolidate.to_string(),
                });
            }
            Self::require_legal(record.status, WorkflowAction::Consolidate, &self.hierarchy)?;
            if let Some(flag) = self.anomalies.first_hard_block(&record.payload) {
                return Err(WorkflowError::ValidationFailed {
                    rule_id: flag.rule_id,
                });
            }
        }

        let now = self.now;
        for member in &members {
            let record = self.store.get_mut(member)?;
            record.apply_transition(
                RecordStatus::Consolidated(level),
                &actor.role,
                &actor.id,
                None,
                now,
            );
        }
        for member in &members {
            self.push_event(WorkflowEventKind::RecordConsolidated {
                record: member.clone(),
                level,
                batch: batch_id.clone(),
            });
        }
        if let Some(batch) = self.batches.get_mut(&batch_id) {
            batch.status = BatchStatus::Consolidated;
        }
        info!(batch = %batch_id, %level, members = members.len(), "batch consolidated");
        Ok(batch_id)
    }

    /// Push a consolidated batch to the next level.  Idempotent: a
    /// transmitted batch returns the batch it already forwarded to, with no
    /// new history entries.
    pub fn transmit(&mut self, actor: &Actor, id: &BatchId) -> Result<BatchId, WorkflowError> {
        self.gate
            .require(&actor.role, actor.level, Capability::Transmit)?;
        let batch = self
            .batches
            .get(id)
            .ok_or_else(|| WorkflowError::NotFound {
                id: id.as_str().to_string(),
            })?;
        if batch.level != actor.level {
            return Err(WorkflowError::PermissionDenied {
                role: actor.role.clone(),
                level: actor.level,
                capability: Capability::Transmit,
            });
        }
        match batch.status {
            BatchStatus::Transmitted => {
                return batch.forwarded_to.clone().ok_or_else(|| {
                    WorkflowError::InvalidInput {
                        detail: format!("batch '{id}' transmitted without a forward target"),
                    }
                });
            }
            BatchStatus::Open => {
                return Err(WorkflowError::InvalidTransition {
                    from: BatchStatus::Open.to_string(),
                    action: WorkflowAction::Transmit.to_string(),
                });
            }
            BatchStatus::Consolidated => {}
        }
        let from_level = batch.level;
        let to_level = self.hierarchy.next_of(from_level).ok_or_else(|| {
            WorkflowError::InvalidTransition {
                from: format!("consolidated:{from_level}"),
                action: WorkflowAction::Transmit.to_string(),
            }
        })?;
        if batch.is_empty() {
            return Err(WorkflowError::InvalidInput {
                detail: format!("batch '{id}' has no members"),
            });
        }
        let period = batch.period;
        let members: Vec<RecordId> = batch.members.iter().cloned().collect();
        for member in &members {
            let record = self.store.get(member)?;
            if record.status != RecordStatus::Consolidated(from_level) {
                return Err(WorkflowError::InvalidTransition {
                    from: record.status.to_string(),
                    action: WorkflowAction::Transmit.to_string(),
                });
            }
        }

        let now = self.now;
        for member in &members {
            let record = self.store.get_mut(member)?;
            record.apply_transition(
                RecordStatus::Submitted(to_level),
                &actor.role,
                &actor.id,
                None,
                now,
            );
        }
        let upstream = self.open_batch_for(to_level, period, actor.entity.clone());
        if let Some(up) = self.batches.get_mut(&upstream) {
            for member in &members {
                up.insert_member(member.clone());
            }
        }
        if let Some(batch) = self.batches.get_mut(id) {
            batch.status = BatchStatus::Transmitted;
            batch.forwarded_to = Some(upstream.clone());
        }
        info!(batch = %id, %from_level, %to_level, members = members.len(), "batch transmitted");
        self.push_event(WorkflowEventKind::BatchTransmitted {
            batch: id.clone(),
            from_level,
            to_level,
            record_count: members.len(),
        });
        Ok(upstream)
    }

    // -----------------------------------------------------------------------
    // Apex decisions
    // -----------------------------------------------------------------------

    /// Approve a record sitting at the apex.
    pub fn validate(
        &mut self,
        actor: &Actor,
        id: &RecordId,
        expected_version: u64,
    ) -> Result<&Record, WorkflowError> {
        self.gate
            .require(&actor.role, self.hierarchy.apex(), Capability::Validate)?;
        let record = self.store.get(id)?;
        Self::require_version(record, expected_version)?;
        let to = Self::require_legal(record.status, WorkflowAction::Validate, &self.hierarchy)?;
        if let Some(flag) = self.anomalies.first_hard_block(&record.payload) {
            return Err(WorkflowError::ValidationFailed {
                rule_id: flag.rule_id,
            });
        }
        let now = self.now;
        let record = self.store.get_mut(id)?;
        record.apply_transition(to, &actor.role, &actor.id, None, now);
        self.detach_from_batch(id);
        info!(record = %id, "record validated");
        self.push_event(WorkflowEventKind::RecordValidated { record: id.clone() });
        self.store.get(id)
    }

    /// Publish a validated record.  Terminal.
    pub fn publish(
        &mut self,
        actor: &Actor,
        id: &RecordId,
        expected_version: u64,
    ) -> Result<&Record, WorkflowError> {
        self.gate
            .require(&actor.role, self.hierarchy.apex(), Capability::Publish)?;
        let record = self.store.get(id)?;
        Self::require_version(record, expected_version)?;
        let to = Self::require_legal(record.status, WorkflowAction::Publish, &self.hierarchy)?;
        let now = self.now;
        let record = self.store.get_mut(id)?;
        record.apply_transition(to, &actor.role, &actor.id, None, now);
        info!(record = %id, "record published");
        self.push_event(WorkflowEventKind::RecordPublished { record: id.clone() });
        self.store.get(id)
    }

    /// Send a record back to draft with a mandatory reason.  The payload is
    /// left untouched; the batch holding the record shrinks.
    pub fn reject(
        &mut self,
        actor: &Actor,
        id: &RecordId,
        expected_version: u64,
        reason: &str,
    ) -> Result<&Record, WorkflowError> {
        self.gate
            .require(&actor.role, actor.level, Capability::Reject)?;
        let record = self.store.get(id)?;
        Self::require_version(record, expected_version)?;
        let to = Self::require_legal(record.status, WorkflowAction::Reject, &self.hierarchy)?;
        let acting =
            transition::acting_level(record.status, WorkflowAction::Reject, &self.hierarchy);
        if acting != Some(actor.level) {
            return Err(WorkflowError::PermissionDenied {
                role: actor.role.clone(),
                level: actor.level,
                capability: Capability::Reject,
            });
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::InvalidInput {
                detail: "rejection reason must not be empty".to_string(),
            });
        }
        let from = record.status.to_string();
        let now = self.now;
        let record = self.store.get_mut(id)?;
        record.apply_transition(to, &actor.role, &actor.id, Some(reason.to_string()), now);
        self.detach_from_batch(id);
        info!(record = %id, %from, %reason, "record rejected");
        self.push_event(WorkflowEventKind::RecordRejected {
            record: id.clone(),
            from,
            reason: reason.to_string(),
        });
        self.store.get(id)
    }

    /// Validate a list of records one by one at their current versions.
    /// Per-record results; no cross-record atomicity.
    pub fn validate_all(
        &mut self,
        actor: &Actor,
        ids: &[RecordId],
    ) -> Vec<(RecordId, Result<(), WorkflowError>)> {
        ids.iter()
            .map(|id| {
                let result = self
                    .store
                    .get(id)
                    .map(|record| record.version)
                    .and_then(|version| self.validate(actor, id, version).map(|_| ()));
                (id.clone(), result)
            })
            .collect()
    }

    /// Publish a list of records one by one at their current versions.
    pub fn publish_all(
        &mut self,
        actor: &Actor,
        ids: &[RecordId],
    ) -> Vec<(RecordId, Result<(), WorkflowError>)> {
        ids.iter()
            .map(|id| {
                let result = self
                    .store
                    .get(id)
                    .map(|record| record.version)
                    .and_then(|version| self.publish(actor, id, version).map(|_| ()));
                (id.clone(), result)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Read-side queries
    // -----------------------------------------------------------------------

    /// Advisory anomaly flags for a record, in rule-declaration order.
    pub fn evaluate_anomalies(&self, id: &RecordId) -> Result<Vec<AnomalyFlag>, WorkflowError> {
        let record = self.store.get(id)?;
        Ok(self.anomalies.evaluate(&record.payload))
    }

    /// 0-100 completeness score of a record against its checklist.
    pub fn score_completeness(&self, id: &RecordId) -> Result<u8, WorkflowError> {
        let record = self.store.get(id)?;
        Ok(self.checklist_for(record.payload.kind()).score(&record.payload))
    }

    /// Deadline standing of `period` at `level` as of `today`.
    pub fn check_deadline(
        &self,
        level: LevelId,
        period: Period,
        today: NaiveDate,
    ) -> Result<DeadlineCheck, WorkflowError> {
        let level = self
            .hierarchy
            .level(level)
            .ok_or_else(|| WorkflowError::NotFound {
                id: level.to_string(),
            })?;
        deadline::check(level, period, today).ok_or_else(|| WorkflowError::InvalidInput {
            detail: format!("invalid period '{period}'"),
        })
    }

    /// Sweep expected reporters against the first-review deadline, emitting
    /// warning/overdue/escalation events for entities that have not
    /// submitted.  Returns the emitted events.
    pub fn deadline_events(
        &mut self,
        period: Period,
        expected: &[EntityId],
        today: NaiveDate,
    ) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        let check = self.check_deadline(self.hierarchy.first_review_level(), period, today)?;
        let start = self.events.len();
        let mut seen = BTreeSet::new();
        for entity in expected {
            if !seen.insert(entity.clone()) {
                continue;
            }
            let has_submitted = self
                .store
                .by_entity_period(entity, period)
                .any(|record| record.status != RecordStatus::Draft);
            if has_submitted {
                continue;
            }
            match check.stage {
                DeadlineStage::OnTrack => {}
                DeadlineStage::Warning => {
                    self.push_event(WorkflowEventKind::DeadlineWarning {
                        entity: entity.clone(),
                        period,
                        days_remaining: check.days_remaining,
                    });
                }
                DeadlineStage::Overdue { days_overdue, tier } => {
                    warn!(%entity, %period, days_overdue, "submission overdue");
                    self.push_event(WorkflowEventKind::DeadlineOverdue {
                        entity: entity.clone(),
                        period,
                        days_overdue,
                    });
                    if let Some(tier) = tier {
                        self.push_event(WorkflowEventKind::EscalationRaised {
                            entity: entity.clone(),
                            period,
                            tier,
                        });
                    }
                }
            }
        }
        Ok(self.events[start..].to_vec())
    }

    /// Which expected reporters have submitted for `period`, with days-late
    /// figures for those that have not.
    pub fn fill_rate(
        &self,
        period: Period,
        expected: &[EntityId],
        today: NaiveDate,
    ) -> Result<FillRate, WorkflowError> {
        let check = self.check_deadline(self.hierarchy.first_review_level(), period, today)?;
        let mut rows = Vec::with_capacity(expected.len());
        let mut submitted_count = 0usize;
        let mut seen = BTreeSet::new();
        for entity in expected {
            if !seen.insert(entity.clone()) {
                continue;
            }
            let submitted = self
                .store
                .by_entity_period(entity, period)
                .any(|record| record.status != RecordStatus::Draft);
            if submitted {
                submitted_count += 1;
            }
            let days_late = match (submitted, check.stage) {
                (false, DeadlineStage::Overdue { days_overdue, .. }) => Some(days_overdue),
                _ => None,
            };
            rows.push(FillRow {
                entity: entity.clone(),
                submitted,
                days_late,
            });
        }
        let expected_count = rows.len();
        let pct = if expected_count == 0 {
            100.0
        } else {
            (submitted_count as f64 / expected_count as f64 * 1000.0).round() / 10.0
        };
        Ok(FillRate {
            period,
            expected: expected_count,
            submitted: submitted_count,
            pct,
            rows,
        })
    }

    pub fn record(&self, id: &RecordId) -> Result<&Record, WorkflowError> {
        self.store.get(id)
    }

    pub fn batch(&self, id: &BatchId) -> Result<&ConsolidationBatch, WorkflowError> {
        self.batches.get(id).ok_or_else(|| WorkflowError::NotFound {
            id: id.as_str().to_string(),
        })
    }

    pub fn records_by_status(&self, status: RecordStatus) -> Vec<&Record> {
        self.store
            .iter()
            .filter(|record| record.status == status)
            .collect()
    }

    pub fn batches(&self) -> impl Iterator<Item = &ConsolidationBatch> {
        self.batches.values()
    }

    /// The append-only event log, oldest first.
    pub fn events(&self) -> &[WorkflowEvent] {
        &self.events
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn checklist_for(&self, kind: PayloadKind) -> &Checklist {
        match kind {
            PayloadKind::Report => &self.report_checklist,
            PayloadKind::Initiative => &self.initiative_checklist,
        }
    }

    fn require_owner(&self, actor: &Actor, record: &Record) -> Result<(), WorkflowError> {
        if actor.entity == record.origin_entity {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied {
                role: actor.role.clone(),
                level: self.hierarchy.origin(),
                capability: Capability::Submit,
            })
        }
    }

    fn require_version(record: &Record, expected: u64) -> Result<(), WorkflowError> {
        if record.version == expected {
            Ok(())
        } else {
            Err(WorkflowError::Conflict {
                expected,
                actual: record.version,
            })
        }
    }

    fn require_legal(
        status: RecordStatus,
        action: WorkflowAction,
        hierarchy: &Hierarchy,
    ) -> Result<RecordStatus, WorkflowError> {
        transition::target_status(status, action, hierarchy).ok_or_else(|| {
            WorkflowError::InvalidTransition {
                from: status.to_string(),
                action: action.to_string(),
            }
        })
    }

    /// Find or create the open batch receiving submissions of
    /// `child_entity` at `level` for `period`.
    fn open_batch_for(&mut self, level: LevelId, period: Period, child_entity: EntityId) -> BatchId {
        if let Some(batch) = self.batches.values().find(|b| {
            b.status == BatchStatus::Open
                && b.level == level
                && b.period == period
                && b.child_entity == child_entity
        }) {
            return batch.id.clone();
        }
        self.batch_seq += 1;
        let id = BatchId::new(&format!(
            "b{:04}-{level}-{period}-{child_entity}",
            self.batch_seq
        ));
        let batch = ConsolidationBatch::open(id.clone(), level, period, child_entity, self.now);
        self.batches.insert(id.clone(), batch);
        id
    }

    /// Pull a record out of whichever non-transmitted batch holds it.
    fn detach_from_batch(&mut self, id: &RecordId) {
        for batch in self.batches.values_mut() {
            if batch.status != BatchStatus::Transmitted && batch.remove_member(id) {
                return;
            }
        }
    }

    fn push_event(&mut self, kind: WorkflowEventKind) {
        let event = WorkflowEvent {
            seq: self.events.len() as u64,
            timestamp: self.now,
            kind,
        };
        self.events.push(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
