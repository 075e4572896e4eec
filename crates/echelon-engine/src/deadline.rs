//! Pure calendar math for submission deadlines.
//!
//! A monthly record for period M is due on the holding level's due day of
//! month M+1; an annual record is due in January of the following year.
//! Everything here is a function of (level, period, today): no clock is
//! read, so the engine can replay any date deterministically.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hierarchy::{EscalationTier, HierarchyLevel};
use crate::record::Period;

/// Days before the due date during which a deadline counts as `Warning`.
pub const WARNING_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// DeadlineStage / DeadlineCheck
// ---------------------------------------------------------------------------

/// Where a submission stands relative to its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlineStage {
    /// More than the warning window remains.
    OnTrack,
    /// Due within the warning window (including the due day itself).
    Warning,
    /// Past due.  `tier` is the escalation reached, if any threshold has
    /// been crossed.
    Overdue {
        days_overdue: u32,
        tier: Option<EscalationTier>,
    },
}

impl fmt::Display for DeadlineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnTrack => f.write_str("on_track"),
            Self::Warning => f.write_str("warning"),
            Self::Overdue { days_overdue, .. } => write!(f, "overdue:{days_overdue}"),
        }
    }
}

/// Result of one deadline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineCheck {
    pub due_date: NaiveDate,
    /// Negative once past due.
    pub days_remaining: i64,
    pub stage: DeadlineStage,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Due date for submitting `period` to `level`.  `None` if the period is
/// malformed (month outside 1-12).
pub fn due_date(level: &HierarchyLevel, period: Period) -> Option<NaiveDate> {
    if !period.is_valid() {
        return None;
    }
    let (year, month) = match period {
        Period::Monthly { year, month } if month == 12 => (year + 1, 1),
        Period::Monthly { year, month } => (year, month + 1),
        Period::Annual { year } => (year + 1, 1),
    };
    // Due days are capped at 28 at hierarchy construction, so the date
    // exists in every month.
    NaiveDate::from_ymd_opt(year, month, level.due_day_of_month)
}

/// Evaluate the deadline for `period` at `level` as of `today`.
pub fn check(level: &HierarchyLevel, period: Period, today: NaiveDate) -> Option<DeadlineCheck> {
    let due = due_date(level, period)?;
    let days_remaining = (due - today).num_days();
    let stage = if days_remaining < 0 {
        let days_overdue = days_remaining.unsigned_abs().min(u64::from(u32::MAX)) as u32;
        DeadlineStage::Overdue {
            days_overdue,
            tier: level.escalation.tier_for(days_overdue),
        }
    } else if days_remaining <= WARNING_WINDOW_DAYS {
        DeadlineStage::Warning
    } else {
        DeadlineStage::OnTrack
    };
    Some(DeadlineCheck {
        due_date: due,
        days_remaining,
        stage,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
