//! Typed workflow errors and their stable codes.
//!
//! Every failure is explicit and observable by the caller; the engine never
//! retries internally and never mutates on the failure path.  `Conflict` is
//! the only kind a caller meaningfully retries (after re-reading).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hierarchy::LevelId;
use crate::permission::Capability;
use crate::record::RoleId;

/// Workflow failure, returned by every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WorkflowError {
    /// Action not legal from the current state.  Both fields are rendered
    /// strings so record states, batch states, and draft edits all fit.
    #[error("action '{action}' not legal from state '{from}'")]
    InvalidTransition { from: String, action: String },

    /// Actor's role lacks the capability at the acting level.
    #[error("role '{role}' lacks capability '{capability}' at {level}")]
    PermissionDenied {
        role: RoleId,
        level: LevelId,
        capability: Capability,
    },

    /// Completeness gate or a hard-blocking anomaly rule failed.
    #[error("validation failed: {rule_id}")]
    ValidationFailed { rule_id: String },

    /// Optimistic-concurrency version mismatch; re-read and retry.
    #[error("version conflict: expected {expected}, current is {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// Record or batch id unknown.
    #[error("not found: {id}")]
    NotFound { id: String },

    /// Malformed request, e.g. an empty rejection reason.
    #[error("invalid input: {detail}")]
    InvalidInput { detail: String },
}

/// Stable error codes for logs and external translation layers.
pub fn error_code(err: &WorkflowError) -> &'static str {
    match err {
        WorkflowError::InvalidTransition { .. } => "WF_INVALID_TRANSITION",
        WorkflowError::PermissionDenied { .. } => "WF_PERMISSION_DENIED",
        WorkflowError::ValidationFailed { .. } => "WF_VALIDATION_FAILED",
        WorkflowError::Conflict { .. } => "WF_CONFLICT",
        WorkflowError::NotFound { .. } => "WF_NOT_FOUND",
        WorkflowError::InvalidInput { .. } => "WF_INVALID_INPUT",
    }
}
