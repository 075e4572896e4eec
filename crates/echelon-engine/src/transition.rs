//! The state-machine legality table.
//!
//! Pure functions from (current status, requested action) to the resulting
//! status, parameterized by the hierarchy so the same table serves chains of
//! any depth.  The engine consults this after the permission gate and the
//! version check; anything the table does not name is `InvalidTransition`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hierarchy::{Hierarchy, LevelId};
use crate::permission::Capability;
use crate::record::RecordStatus;

// ---------------------------------------------------------------------------
// WorkflowAction
// ---------------------------------------------------------------------------

/// Action requested against a record or batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowAction {
    Submit,
    Consolidate,
    Transmit,
    Validate,
    Publish,
    Reject,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 6] = [
        Self::Submit,
        Self::Consolidate,
        Self::Transmit,
        Self::Validate,
        Self::Publish,
        Self::Reject,
    ];
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submit => "submit",
            Self::Consolidate => "consolidate",
            Self::Transmit => "transmit",
            Self::Validate => "validate",
            Self::Publish => "publish",
            Self::Reject => "reject",
        };
        f.write_str(name)
    }
}

/// Capability the permission gate demands for an action.
pub fn required_capability(action: WorkflowAction) -> Capability {
    match action {
        WorkflowAction::Submit => Capability::Submit,
        WorkflowAction::Consolidate => Capability::Consolidate,
        WorkflowAction::Transmit => Capability::Transmit,
        WorkflowAction::Validate => Capability::Validate,
        WorkflowAction::Publish => Capability::Publish,
        WorkflowAction::Reject => Capability::Reject,
    }
}

// ---------------------------------------------------------------------------
// Legality table
// ---------------------------------------------------------------------------

/// Resulting status if `action` is legal from `status`, else `None`.
///
/// The table, spelled out:
/// submit       Draft            -> Submitted(first review level)
/// consolidate  Submitted(l)     -> Consolidated(l)
/// transmit     Consolidated(l)  -> Submitted(l+1)
/// validate     Submitted(apex)  -> Validated
/// publish      Validated        -> Published
/// reject       Submitted(l) | Consolidated(l) | Validated -> Draft
pub fn target_status(
    status: RecordStatus,
    action: WorkflowAction,
    hierarchy: &Hierarchy,
) -> Option<RecordStatus> {
    match (status, action) {
        (RecordStatus::Draft, WorkflowAction::Submit) => {
            Some(RecordStatus::Submitted(hierarchy.first_review_level()))
        }
        (RecordStatus::Submitted(level), WorkflowAction::Consolidate)
            if hierarchy.contains(level) && level != hierarchy.origin() =>
        {
            Some(RecordStatus::Consolidated(level))
        }
        (RecordStatus::Consolidated(level), WorkflowAction::Transmit) => {
            hierarchy.next_of(level).map(RecordStatus::Submitted)
        }
        (RecordStatus::Submitted(level), WorkflowAction::Validate)
            if hierarchy.is_apex(level) =>
        {
            Some(RecordStatus::Validated)
        }
        (RecordStatus::Validated, WorkflowAction::Publish) => Some(RecordStatus::Published),
        (
            RecordStatus::Submitted(level) | RecordStatus::Consolidated(level),
            WorkflowAction::Reject,
        ) if hierarchy.contains(level) => Some(RecordStatus::Draft),
        (RecordStatus::Validated, WorkflowAction::Reject) => Some(RecordStatus::Draft),
        _ => None,
    }
}

/// Level at which the actor must hold the required capability.
///
/// Submit happens at the origin; consolidate/transmit at the level holding
/// the record; validate/publish/reject-of-validated at the apex.
pub fn acting_level(
    status: RecordStatus,
    action: WorkflowAction,
    hierarchy: &Hierarchy,
) -> Option<LevelId> {
    match action {
        WorkflowAction::Submit => Some(hierarchy.origin()),
        WorkflowAction::Consolidate | WorkflowAction::Transmit => status.holding_level(),
        WorkflowAction::Validate | WorkflowAction::Publish => Some(hierarchy.apex()),
        WorkflowAction::Reject => status.holding_level().or_else(|| {
            matches!(status, RecordStatus::Validated).then(|| hierarchy.apex())
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
