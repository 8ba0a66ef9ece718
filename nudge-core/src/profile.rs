//! Per-user behavior profile biasing reminder timing.
//!
//! The scheduler only reads profiles. They are lazily created with defaults
//! on first use; a separate collaborator updates them as completion history
//! accumulates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderFrequency {
    #[serde(rename = "minimal")]
    Minimal,
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "frequent")]
    Frequent,
}

/// Daily do-not-disturb window in the user's local time, "HH:MM" bounds.
/// The window may wrap midnight (e.g. 22:00-08:00).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: String,
    pub end: String,
}

impl QuietHours {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    /// Preferred study windows, "HH:MM-HH:MM" local time. Stringly typed
    /// until the profiler formalizes them.
    pub preferred_study_windows: Vec<String>,

    /// Minutes.
    pub avg_task_duration_minutes: i32,

    /// 0-1 share of past tasks finished on time.
    pub completion_rate: f64,

    /// 0-1, higher means the user starts later.
    pub procrastination: f64,

    /// 0-10 self-reported.
    pub stress_level: i32,

    pub frequency: ReminderFrequency,

    pub quiet_hours: Option<QuietHours>,

    /// IANA timezone identifier.
    pub timezone: String,
}

impl Default for BehaviorProfile {
    fn default() -> Self {
        Self {
            preferred_study_windows: vec!["09:00-11:00".to_string(), "19:00-21:00".to_string()],
            avg_task_duration_minutes: 45,
            completion_rate: 0.7,
            procrastination: 0.5,
            stress_level: 3,
            frequency: ReminderFrequency::Normal,
            quiet_hours: None,
            timezone: "America/Chicago".to_string(),
        }
    }
}

impl BehaviorProfile {
    pub fn with_frequency(mut self, frequency: ReminderFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_quiet_hours(mut self, quiet: QuietHours) -> Self {
        self.quiet_hours = Some(quiet);
        self
    }

    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = tz.into();
        self
    }

    pub fn with_procrastination(mut self, score: f64) -> Self {
        self.procrastination = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_completion_rate(mut self, rate: f64) -> Self {
        self.completion_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_stress_level(mut self, level: i32) -> Self {
        self.stress_level = level.clamp(0, 10);
        self
    }
}
