//! Role/level capability gate consulted before any workflow mutation.
//!
//! Capabilities are atomic permissions.  A declarative assignment table
//! (role, level, capability set) is compiled once into a gate; the engine
//! consults the gate first, so a denied actor sees `PermissionDenied` before
//! any other failure and no partial work happens.  This replaces scattered
//! per-page permission literals with a single source of truth.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::hierarchy::LevelId;
use crate::record::RoleId;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Atomic permission over workflow actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Submit a draft from the origin level.
    Submit,
    /// Mark a received group of records ready to move upward.
    Consolidate,
    /// Push a consolidated batch to the next level.
    Transmit,
    /// Approve a record at the apex.
    Validate,
    /// Publish a validated record.
    Publish,
    /// Send a record back to its origin with a reason.
    Reject,
}

impl fmt::Display for Capability {
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

// ---------------------------------------------------------------------------
// Standard profiles
// ---------------------------------------------------------------------------

/// Named capability profiles matching the three actor shapes of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    /// Origin-entity author: submit only.
    OriginSubmitter,
    /// Intermediate-level reviewer: consolidate, transmit, reject.
    LevelReviewer,
    /// Apex reviewer: everything a reviewer has plus validate and publish.
    ApexReviewer,
}

impl ProfileKind {
    pub fn capabilities(self) -> BTreeSet<Capability> {
        use Capability::*;
        match self {
            Self::OriginSubmitter => BTreeSet::from([Submit]),
            Self::LevelReviewer => BTreeSet::from([Consolidate, Transmit, Reject]),
            Self::ApexReviewer => {
                BTreeSet::from([Consolidate, Transmit, Reject, Validate, Publish])
            }
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OriginSubmitter => "origin_submitter",
            Self::LevelReviewer => "level_reviewer",
            Self::ApexReviewer => "apex_reviewer",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// RoleAssignment / PermissionGate
// ---------------------------------------------------------------------------

/// One row of the declarative permission table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: RoleId,
    pub level: LevelId,
    pub capabilities: BTreeSet<Capability>,
}

impl RoleAssignment {
    pub fn with_profile(role: &str, level: LevelId, profile: ProfileKind) -> Self {
        Self {
            role: RoleId::new(role),
            level,
            capabilities: profile.capabilities(),
        }
    }
}

/// Compiled role -> level -> capability-set mapping.
///
/// Nested maps rather than tuple keys so the gate serializes to plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PermissionGate {
    grants: BTreeMap<RoleId, BTreeMap<LevelId, BTreeSet<Capability>>>,
}

impl PermissionGate {
    /// Compile the assignment table.  Duplicate (role, level) rows merge
    /// their capability sets.
    pub fn from_assignments(assignments: Vec<RoleAssignment>) -> Self {
        let mut grants: BTreeMap<RoleId, BTreeMap<LevelId, BTreeSet<Capability>>> =
            BTreeMap::new();
        for assignment in assignments {
            grants
                .entry(assignment.role)
                .or_default()
                .entry(assignment.level)
                .or_default()
                .extend(assignment.capabilities);
        }
        Self { grants }
    }

    pub fn allows(&self, role: &RoleId, level: LevelId, capability: Capability) -> bool {
        self.grants
            .get(role)
            .and_then(|levels| levels.get(&level))
            .is_some_and(|caps| caps.contains(&capability))
    }

    /// Gate check used by the engine; failure carries the denied tuple.
    pub fn require(
        &self,
        role: &RoleId,
        level: LevelId,
        capability: Capability,
    ) -> Result<(), WorkflowError> {
        if self.allows(role, level, capability) {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied {
                role: role.clone(),
                level,
                capability,
            })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
