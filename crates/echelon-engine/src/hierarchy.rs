//! Static configuration of the institutional review chain.
//!
//! A hierarchy is an ordered list of levels: origin (where records are
//! authored), zero or more intermediate review levels, and the apex where
//! final validation and publication happen.  Each level carries its own
//! submission due-day and escalation policy; the workflow engine treats the
//! chain as immutable configuration.
//!
//! `BTreeMap`/`BTreeSet` are used throughout the crate for deterministic
//! ordering; levels here are a plain `Vec` because their order *is* the
//! hierarchy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default overdue day-offsets for the four escalation tiers.
const DEFAULT_ESCALATION_OFFSETS: [u32; 4] = [5, 10, 15, 30];

/// Highest configurable due day.  Capped at 28 so the deadline exists in
/// every month.
const MAX_DUE_DAY: u32 = 28;

// ---------------------------------------------------------------------------
// LevelId
// ---------------------------------------------------------------------------

/// Position of a level in the chain.  `0` is always the origin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct LevelId(pub u8);

impl LevelId {
    pub const ORIGIN: LevelId = LevelId(0);

    /// The level directly above this one.
    pub fn next(self) -> LevelId {
        LevelId(self.0 + 1)
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EscalationPolicy
// ---------------------------------------------------------------------------

/// Day-offset thresholds applied once a level's submission is overdue.
///
/// Offsets are measured in whole days past the due day and must be strictly
/// increasing.  Crossing a threshold raises the corresponding
/// [`EscalationTier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub notify_owner_after: u32,
    pub notify_supervisor_after: u32,
    pub notify_coordination_after: u32,
    pub sanction_review_after: u32,
}

impl EscalationPolicy {
    /// Tier reached after `days_overdue` days, if any.
    pub fn tier_for(&self, days_overdue: u32) -> Option<EscalationTier> {
        if days_overdue >= self.sanction_review_after {
            Some(EscalationTier::SanctionReview)
        } else if days_overdue >= self.notify_coordination_after {
            Some(EscalationTier::NotifyCoordination)
        } else if days_overdue >= self.notify_supervisor_after {
            Some(EscalationTier::NotifySupervisor)
        } else if days_overdue >= self.notify_owner_after {
            Some(EscalationTier::NotifyOwner)
        } else {
            None
        }
    }

    fn is_strictly_increasing(&self) -> bool {
        self.notify_owner_after < self.notify_supervisor_after
            && self.notify_supervisor_after < self.notify_coordination_after
            && self.notify_coordination_after < self.sanction_review_after
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            notify_owner_after: DEFAULT_ESCALATION_OFFSETS[0],
            notify_supervisor_after: DEFAULT_ESCALATION_OFFSETS[1],
            notify_coordination_after: DEFAULT_ESCALATION_OFFSETS[2],
            sanction_review_after: DEFAULT_ESCALATION_OFFSETS[3],
        }
    }
}

/// Who gets notified (or what review is triggered) at a given lateness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EscalationTier {
    /// The owning entity is reminded directly.
    NotifyOwner,
    /// The owner's supervising entity is copied in.
    NotifySupervisor,
    /// The top coordination office is alerted.
    NotifyCoordination,
    /// Lateness is flagged for financial-sanction consideration.
    SanctionReview,
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotifyOwner => "notify_owner",
            Self::NotifySupervisor => "notify_supervisor",
            Self::NotifyCoordination => "notify_coordination",
            Self::SanctionReview => "sanction_review",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// HierarchyLevel
// ---------------------------------------------------------------------------

/// One level of the review chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyLevel {
    pub id: LevelId,
    pub name: String,
    /// Day of month (1-28) by which submissions to this level are due.
    pub due_day_of_month: u32,
    pub escalation: EscalationPolicy,
}

impl HierarchyLevel {
    pub fn new(id: LevelId, name: &str, due_day_of_month: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            due_day_of_month,
            escalation: EscalationPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Error raised when a hierarchy configuration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyConfigError {
    /// Fewer than two levels: there is nowhere to submit to.
    TooFewLevels { count: usize },
    /// Level ids must be contiguous from zero, in order.
    NonContiguousLevels { position: usize },
    /// Due day outside 1-28.
    InvalidDueDay { level: LevelId, due_day: u32 },
    /// Escalation offsets must be strictly increasing.
    InvalidEscalation { level: LevelId },
}

impl fmt::Display for HierarchyConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewLevels { count } => {
                write!(f, "hierarchy needs at least 2 levels, got {count}")
            }
            Self::NonContiguousLevels { position } => {
                write!(f, "level ids must be contiguous from 0; broken at {position}")
            }
            Self::InvalidDueDay { level, due_day } => {
                write!(f, "level {level} due day {due_day} outside 1-{MAX_DUE_DAY}")
            }
            Self::InvalidEscalation { level } => {
                write!(f, "level {level} escalation offsets not strictly increasing")
            }
        }
    }
}

impl std::error::Error for HierarchyConfigError {}

/// Validated, ordered review chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    levels: Vec<HierarchyLevel>,
}

impl Hierarchy {
    /// Build a hierarchy from ordered levels, rejecting inconsistent
    /// configuration up front so the engine never has to re-check it.
    pub fn new(levels: Vec<HierarchyLevel>) -> Result<Self, HierarchyConfigError> {
        if levels.len() < 2 {
            return Err(HierarchyConfigError::TooFewLevels {
                count: levels.len(),
            });
        }
        for (position, level) in levels.iter().enumerate() {
            if usize::from(level.id.0) != position {
                return Err(HierarchyConfigError::NonContiguousLevels { position });
            }
            if level.due_day_of_month == 0 || level.due_day_of_month > MAX_DUE_DAY {
                return Err(HierarchyConfigError::InvalidDueDay {
                    level: level.id,
                    due_day: level.due_day_of_month,
                });
            }
            if !level.escalation.is_strictly_increasing() {
                return Err(HierarchyConfigError::InvalidEscalation { level: level.id });
            }
        }
        Ok(Self { levels })
    }

    pub fn origin(&self) -> LevelId {
        LevelId::ORIGIN
    }

    pub fn apex(&self) -> LevelId {
        LevelId((self.levels.len() - 1) as u8)
    }

    pub fn is_apex(&self, level: LevelId) -> bool {
        level == self.apex()
    }

    pub fn contains(&self, level: LevelId) -> bool {
        usize::from(level.0) < self.levels.len()
    }

    /// The level above `level`, or `None` at the apex.
    pub fn next_of(&self, level: LevelId) -> Option<LevelId> {
        let next = level.next();
        self.contains(next).then_some(next)
    }

    pub fn level(&self, id: LevelId) -> Option<&HierarchyLevel> {
        self.levels.get(usize::from(id.0))
    }

    pub fn levels(&self) -> &[HierarchyLevel] {
        &self.levels
    }

    /// First level that reviews origin submissions.
    pub fn first_review_level(&self) -> LevelId {
        LevelId(1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: u8) -> Hierarchy {
        let levels = (0..n)
            .map(|i| HierarchyLevel::new(LevelId(i), &format!("level-{i}"), 5))
            .collect();
        Hierarchy::new(levels).expect("valid chain")
    }

    // -- Construction --

    #[test]
    fn rejects_single_level() {
        let err = Hierarchy::new(vec![HierarchyLevel::new(LevelId(0), "only", 5)]).unwrap_err();
        assert_eq!(err, HierarchyConfigError::TooFewLevels { count: 1 });
    }

    #[test]
    fn rejects_non_contiguous_ids() {
        let levels = vec![
            HierarchyLevel::new(LevelId(0), "origin", 5),
            HierarchyLevel::new(LevelId(2), "skipped", 5),
        ];
        let err = Hierarchy::new(levels).unwrap_err();
        assert_eq!(err, HierarchyConfigError::NonContiguousLevels { position: 1 });
    }

    #[test]
    fn rejects_due_day_zero_and_over_28() {
        for bad in [0, 29, 31] {
            let levels = vec![
                HierarchyLevel::new(LevelId(0), "origin", bad),
                HierarchyLevel::new(LevelId(1), "review", 5),
            ];
            let err = Hierarchy::new(levels).unwrap_err();
            assert_eq!(
                err,
                HierarchyConfigError::InvalidDueDay {
                    level: LevelId(0),
                    due_day: bad
                }
            );
        }
    }

    #[test]
    fn rejects_non_increasing_escalation() {
        let mut level = HierarchyLevel::new(LevelId(1), "review", 5);
        level.escalation.notify_supervisor_after = level.escalation.notify_owner_after;
        let levels = vec![HierarchyLevel::new(LevelId(0), "origin", 5), level];
        let err = Hierarchy::new(levels).unwrap_err();
        assert_eq!(err, HierarchyConfigError::InvalidEscalation { level: LevelId(1) });
    }

    // -- Navigation --

    #[test]
    fn origin_apex_and_next() {
        let h = chain(4);
        assert_eq!(h.origin(), LevelId(0));
        assert_eq!(h.apex(), LevelId(3));
        assert!(h.is_apex(LevelId(3)));
        assert!(!h.is_apex(LevelId(2)));
        assert_eq!(h.next_of(LevelId(1)), Some(LevelId(2)));
        assert_eq!(h.next_of(LevelId(3)), None);
        assert_eq!(h.first_review_level(), LevelId(1));
    }

    #[test]
    fn contains_and_lookup() {
        let h = chain(3);
        assert!(h.contains(LevelId(2)));
        assert!(!h.contains(LevelId(3)));
        assert_eq!(h.level(LevelId(1)).map(|l| l.name.as_str()), Some("level-1"));
        assert!(h.level(LevelId(9)).is_none());
    }

    // -- Escalation tiers --

    #[test]
    fn default_tiers_at_documented_offsets() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.tier_for(0), None);
        assert_eq!(policy.tier_for(4), None);
        assert_eq!(policy.tier_for(5), Some(EscalationTier::NotifyOwner));
        assert_eq!(policy.tier_for(10), Some(EscalationTier::NotifySupervisor));
        assert_eq!(policy.tier_for(15), Some(EscalationTier::NotifyCoordination));
        assert_eq!(policy.tier_for(29), Some(EscalationTier::NotifyCoordination));
        assert_eq!(policy.tier_for(30), Some(EscalationTier::SanctionReview));
        assert_eq!(policy.tier_for(365), Some(EscalationTier::SanctionReview));
    }

    // -- Display / serde --

    #[test]
    fn display_forms() {
        assert_eq!(LevelId(2).to_string(), "L2");
        assert_eq!(EscalationTier::SanctionReview.to_string(), "sanction_review");
    }

    #[test]
    fn hierarchy_serde_round_trip() {
        let h = chain(3);
        let json = serde_json::to_string(&h).expect("serialize");
        let restored: Hierarchy = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(h, restored);
    }
}
