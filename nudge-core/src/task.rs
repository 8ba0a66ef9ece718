//! Task model consumed by the reminder scheduler.
//!
//! Tasks are owned by the host application; the scheduler only reads them,
//! except for the completion flag which an external collaborator flips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Additive lead-time adjustment in minutes. Higher priority means a
    /// larger lead, i.e. the reminder fires earlier relative to the due date.
    pub fn lead_adjust_minutes(&self) -> f64 {
        match self {
            Priority::Low => -2.0,
            Priority::Medium => 0.0,
            Priority::High => 2.0,
            Priority::Urgent => 5.0,
        }
    }

    /// Coarse 1-4 weight used when ranking notification payloads.
    pub fn score(&self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

/// Core task type.
///
/// Kept small + serializable; storage belongs to the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub user_id: String,

    /// Hard due timestamp (UTC). Tasks without one cannot be scheduled.
    pub due: Option<DateTime<Utc>>,

    pub priority: Priority,

    /// 1-5 subjective difficulty.
    pub difficulty: Option<i32>,

    /// User-fixed reminder lead in minutes before due. Overrides the
    /// lead-time template when set.
    pub fixed_lead_minutes: Option<f64>,

    pub completed: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            user_id: user_id.into(),
            due: None,
            priority: Priority::Medium,
            difficulty: None,
            fixed_lead_minutes: None,
            completed: false,
        }
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_difficulty(mut self, difficulty: i32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_fixed_lead(mut self, minutes: f64) -> Self {
        self.fixed_lead_minutes = Some(minutes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_adjust_is_monotonic() {
        let levels = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];
        for pair in levels.windows(2) {
            assert!(pair[0].lead_adjust_minutes() < pair[1].lead_adjust_minutes());
        }
    }

    #[test]
    fn test_builder_defaults() {
        let t = Task::new("t1", "write lab report", "u1");
        assert_eq!(t.priority, Priority::Medium);
        assert!(t.due.is_none());
        assert!(!t.completed);
    }
}
