#![forbid(unsafe_code)]

//! Workflow core for multi-level institutional reporting.
//!
//! Records (monthly performance reports, planning initiatives) are authored
//! at origin entities and climb a configured review chain: submitted,
//! consolidated into per-entity batches, transmitted level by level, then
//! validated and published at the apex, or rejected back to draft with a
//! reason.  The crate is the deterministic core of that workflow: state
//! machine, permission gate, completeness scoring, anomaly rules, deadline
//! math, and an append-only audit trail.  Persistence, transport, and
//! notification delivery are external collaborators.
//!
//! [`engine::WorkflowEngine`] is the single entry point for mutations; the
//! remaining modules are pure and individually testable.

pub mod anomaly;
pub mod completeness;
pub mod consolidation;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod payload;
pub mod permission;
pub mod record;
pub mod store;
pub mod transition;

pub use engine::{Actor, WorkflowEngine};
pub use error::{WorkflowError, error_code};
