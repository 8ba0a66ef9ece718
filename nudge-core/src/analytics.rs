//! Write-only analytics records, one per delivery attempt.
//!
//! A reporting collaborator reads these; the scheduler never does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sequence::UrgencyTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderResponse {
    #[serde(rename = "ignored")]
    Ignored,
    #[serde(rename = "snoozed")]
    Snoozed,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "rescheduled")]
    Rescheduled,
}

impl ReminderResponse {
    fn base_effectiveness(&self) -> f64 {
        match self {
            ReminderResponse::Completed => 1.0,
            ReminderResponse::Rescheduled => 0.6,
            ReminderResponse::Snoozed => 0.4,
            ReminderResponse::Ignored => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderAnalyticsRecord {
    pub task_id: String,
    pub user_id: String,
    pub fire_at: DateTime<Utc>,
    pub tier: UrgencyTier,
    /// Which delivery path accepted the attempt ("pushgate", "relay",
    /// "offline-queue", "dropped").
    pub backend: String,
    pub sent_at: DateTime<Utc>,
    pub response: Option<ReminderResponse>,
    pub response_minutes: Option<f64>,
    /// 0-1; stays 0 until a response is recorded.
    pub effectiveness: f64,
}

impl ReminderAnalyticsRecord {
    pub fn new(
        task_id: impl Into<String>,
        user_id: impl Into<String>,
        fire_at: DateTime<Utc>,
        tier: UrgencyTier,
        backend: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            user_id: user_id.into(),
            fire_at,
            tier,
            backend: backend.into(),
            sent_at,
            response: None,
            response_minutes: None,
            effectiveness: 0.0,
        }
    }

    /// Record the user's eventual reaction. Effectiveness decays with
    /// response time: a completion after half an hour scores half of an
    /// immediate one.
    pub fn with_response(mut self, response: ReminderResponse, response_minutes: f64) -> Self {
        let minutes = response_minutes.max(0.0);
        self.response = Some(response);
        self.response_minutes = Some(minutes);
        self.effectiveness = response.base_effectiveness() * (30.0 / (30.0 + minutes));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> ReminderAnalyticsRecord {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        ReminderAnalyticsRecord::new("t1", "u1", at, UrgencyTier::Urgent, "pushgate", at)
    }

    #[test]
    fn test_effectiveness_orders_by_response_kind() {
        let completed = record().with_response(ReminderResponse::Completed, 10.0);
        let snoozed = record().with_response(ReminderResponse::Snoozed, 10.0);
        let ignored = record().with_response(ReminderResponse::Ignored, 10.0);

        assert!(completed.effectiveness > snoozed.effectiveness);
        assert!(snoozed.effectiveness > ignored.effectiveness);
        assert_eq!(ignored.effectiveness, 0.0);
    }

    #[test]
    fn test_effectiveness_decays_with_response_time() {
        let fast = record().with_response(ReminderResponse::Completed, 0.0);
        let slow = record().with_response(ReminderResponse::Completed, 30.0);

        assert_eq!(fast.effectiveness, 1.0);
        assert_eq!(slow.effectiveness, 0.5);
    }
}
