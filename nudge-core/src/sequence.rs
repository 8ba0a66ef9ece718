//! Offset sequence generator: maps (task, profile, now) to an ordered list
//! of reminder instructions, furthest-from-due first.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::{BehaviorProfile, ReminderFrequency};
use crate::task::Task;
use crate::time::{in_quiet_hours, next_quiet_end};

/// Smallest lead a reminder may carry, in minutes.
const MIN_LEAD_MINUTES: f64 = 0.5;

/// A hard task gets this much extra advance notice on its earliest reminder.
const DIFFICULTY_BONUS_MINUTES: f64 = 5.0;

/// Lead multiplier for chronic procrastinators (score >= 0.7).
const PROCRASTINATION_SCALE: f64 = 1.25;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("task has no due date")]
    MissingDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrgencyTier {
    #[serde(rename = "gentle")]
    Gentle,
    #[serde(rename = "encouraging")]
    Encouraging,
    #[serde(rename = "urgent")]
    Urgent,
}

impl UrgencyTier {
    /// Vendor notification priority bucket.
    pub fn notification_priority(&self) -> i32 {
        match self {
            UrgencyTier::Gentle => 1,
            UrgencyTier::Encouraging => 2,
            UrgencyTier::Urgent => 3,
        }
    }
}

/// One reminder to deliver, `lead_minutes` before the task's due timestamp.
/// Ephemeral: produced fresh per scheduling call, never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderInstruction {
    pub lead_minutes: f64,
    pub tier: UrgencyTier,
    pub message: String,
    pub is_final: bool,
}

impl ReminderInstruction {
    pub fn lead(&self) -> Duration {
        Duration::seconds((self.lead_minutes * 60.0).round() as i64)
    }
}

/// Base lead-time templates keyed by coarse buckets of time-until-due.
/// More advance notice means more reminders; values shrink geometrically as
/// the deadline approaches.
fn base_template(minutes_until_due: f64) -> &'static [f64] {
    if minutes_until_due > 2880.0 {
        &[1440.0, 240.0, 30.0]
    } else if minutes_until_due > 1440.0 {
        &[480.0, 120.0, 15.0]
    } else if minutes_until_due > 120.0 {
        &[120.0, 30.0, 10.0]
    } else if minutes_until_due > 60.0 {
        &[60.0, 15.0, 5.0]
    } else if minutes_until_due > 30.0 {
        &[15.0, 5.0]
    } else if minutes_until_due > 10.0 {
        &[5.0, 2.0]
    } else if minutes_until_due > 3.0 {
        &[2.0]
    } else {
        &[1.0]
    }
}

/// Produce 1-3 reminder instructions for `task`, ordered so that
/// `sequence[0]` fires first. Deterministic for identical inputs.
///
/// Every emitted lead lands strictly inside `(0, time_until_due)` minutes,
/// except the deliberate immediate reminder for due-now or overdue tasks.
pub fn generate_sequence(
    task: &Task,
    profile: &BehaviorProfile,
    now: DateTime<Utc>,
) -> Result<Vec<ReminderInstruction>, SequenceError> {
    let due = task.due.ok_or(SequenceError::MissingDue)?;
    let minutes_until_due = (due - now).num_seconds() as f64 / 60.0;

    if minutes_until_due <= 0.0 {
        return Ok(vec![ReminderInstruction {
            lead_minutes: 0.0,
            tier: UrgencyTier::Urgent,
            message: format!("\"{}\" is due now. Wrap it up!", task.title),
            is_final: true,
        }]);
    }

    let upper = minutes_until_due - 1.0;
    let mut leads = survivors(task, profile, minutes_until_due, upper);

    if leads.is_empty() {
        // Everything clamped away: one reminder roughly half-way to due.
        let mut lead = (minutes_until_due / 2.0).max(0.25);
        if lead >= minutes_until_due {
            lead = minutes_until_due / 2.0;
        }
        leads.push(lead);
    }

    apply_frequency(&mut leads, profile.frequency, minutes_until_due);
    apply_quiet_hours(&mut leads, profile, due, now);

    Ok(assign_tiers(&leads, task, profile))
}

/// Template selection, priority adjustment, clamping, and the strict-decrease
/// dedup. May return an empty vec, which triggers the fallback.
fn survivors(task: &Task, profile: &BehaviorProfile, minutes_until_due: f64, upper: f64) -> Vec<f64> {
    let mut leads: Vec<f64> = Vec::new();

    match task.fixed_lead_minutes {
        // A user-fixed lead is an explicit preference: no adjustment, no
        // scaling, just the usual clamp.
        Some(fixed) => {
            if upper >= MIN_LEAD_MINUTES {
                let clamped = fixed.clamp(MIN_LEAD_MINUTES, upper);
                if clamped < minutes_until_due {
                    leads.push(clamped);
                }
            }
        }
        None => {
            let adjust = task.priority.lead_adjust_minutes();
            let scale = if profile.procrastination >= 0.7 {
                PROCRASTINATION_SCALE
            } else {
                1.0
            };

            for base in base_template(minutes_until_due) {
                if upper < MIN_LEAD_MINUTES {
                    continue;
                }
                let clamped = (base * scale + adjust).clamp(MIN_LEAD_MINUTES, upper);
                if clamped >= MIN_LEAD_MINUTES && clamped < minutes_until_due {
                    leads.push(clamped);
                }
            }

            if let Some(difficulty) = task.difficulty {
                if difficulty >= 4 && !leads.is_empty() {
                    leads[0] = (leads[0] + DIFFICULTY_BONUS_MINUTES).min(upper);
                }
            }
        }
    }

    dedup_strictly_decreasing(&mut leads);
    leads
}

fn apply_frequency(leads: &mut Vec<f64>, frequency: ReminderFrequency, minutes_until_due: f64) {
    match frequency {
        ReminderFrequency::Minimal => {
            // Only the closest-to-due reminder survives.
            if let Some(last) = leads.last().copied() {
                leads.clear();
                leads.push(last);
            }
        }
        ReminderFrequency::Frequent => {
            // Room for a 2-minute last call without breaking the 1-3 cap.
            let wants_last_call = leads.len() == 2
                && minutes_until_due > 3.0
                && leads.iter().all(|l| *l > 2.0);
            if wants_last_call {
                leads.push(2.0);
            }
        }
        ReminderFrequency::Normal => {}
    }
}

/// Move any fire time that lands inside the user's quiet hours to the end of
/// the window, when that instant is still strictly between now and due.
fn apply_quiet_hours(
    leads: &mut Vec<f64>,
    profile: &BehaviorProfile,
    due: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    let Some(quiet) = &profile.quiet_hours else {
        return;
    };
    let Ok(tz) = profile.timezone.parse::<Tz>() else {
        return;
    };

    for lead in leads.iter_mut() {
        let fire_at = due - Duration::seconds((*lead * 60.0).round() as i64);
        if !matches!(in_quiet_hours(fire_at, tz, quiet), Ok(true)) {
            continue;
        }
        let Ok(wake) = next_quiet_end(fire_at, tz, quiet) else {
            continue;
        };
        if wake > now && wake < due {
            *lead = (due - wake).num_seconds() as f64 / 60.0;
        }
    }

    // Shifting can reorder or collide leads.
    leads.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    dedup_strictly_decreasing(leads);
}

fn dedup_strictly_decreasing(leads: &mut Vec<f64>) {
    let mut kept: Vec<f64> = Vec::with_capacity(leads.len());
    for lead in leads.iter() {
        if kept.last().map(|prev| *lead < *prev).unwrap_or(true) {
            kept.push(*lead);
        }
    }
    *leads = kept;
}

fn assign_tiers(leads: &[f64], task: &Task, profile: &BehaviorProfile) -> Vec<ReminderInstruction> {
    let n = leads.len();
    leads
        .iter()
        .enumerate()
        .map(|(i, lead)| {
            let is_final = i + 1 == n;
            let tier = if is_final {
                UrgencyTier::Urgent
            } else if i == 0 {
                first_tier(profile)
            } else {
                UrgencyTier::Encouraging
            };
            ReminderInstruction {
                lead_minutes: *lead,
                tier,
                message: message_for(tier, &task.title, *lead),
                is_final,
            }
        })
        .collect()
}

fn first_tier(profile: &BehaviorProfile) -> UrgencyTier {
    // High stress always gets the soft opener; low completers need a push.
    if profile.stress_level >= 8 {
        UrgencyTier::Gentle
    } else if profile.completion_rate < 0.4 {
        UrgencyTier::Encouraging
    } else {
        UrgencyTier::Gentle
    }
}

fn message_for(tier: UrgencyTier, title: &str, lead_minutes: f64) -> String {
    let when = humanize_lead(lead_minutes);
    match tier {
        UrgencyTier::Gentle => format!("Heads up: \"{title}\" is due in {when}."),
        UrgencyTier::Encouraging => {
            format!("Keep going: \"{title}\" is due in {when}. A focused block now keeps it on track.")
        }
        UrgencyTier::Urgent => format!("Last call: \"{title}\" is due in {when}. Finish it now."),
    }
}

fn humanize_lead(minutes: f64) -> String {
    let m = minutes.round() as i64;
    if m >= 2880 {
        format!("{} days", m / 1440)
    } else if m >= 1440 {
        "1 day".to_string()
    } else if m >= 120 {
        format!("{} hours", m / 60)
    } else if m >= 60 {
        "1 hour".to_string()
    } else if m >= 2 {
        format!("{} minutes", m)
    } else {
        "a minute".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::QuietHours;
    use crate::task::Priority;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn leads(seq: &[ReminderInstruction]) -> Vec<f64> {
        seq.iter().map(|i| i.lead_minutes).collect()
    }

    #[test]
    fn test_three_hours_medium_default_profile() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "finish problem set", "u1").with_due(now + Duration::hours(3));

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        assert_eq!(leads(&seq), vec![120.0, 30.0, 10.0]);
        assert_eq!(
            seq.iter().map(|i| i.tier).collect::<Vec<_>>(),
            vec![UrgencyTier::Gentle, UrgencyTier::Encouraging, UrgencyTier::Urgent]
        );
        assert!(seq[2].is_final);
        assert!(!seq[0].is_final && !seq[1].is_final);
    }

    #[test]
    fn test_beyond_two_days_three_strictly_decreasing() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let minutes_until_due = 3.0 * 1440.0;
        let task = Task::new("t1", "term paper", "u1")
            .with_due(now + Duration::minutes(minutes_until_due as i64));

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        assert_eq!(seq.len(), 3);
        for pair in seq.windows(2) {
            assert!(pair[0].lead_minutes > pair[1].lead_minutes);
        }
        for i in &seq {
            assert!(i.lead_minutes < minutes_until_due);
        }
    }

    #[test]
    fn test_exactly_two_days_lands_in_one_bucket() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "review deck", "u1").with_due(now + Duration::days(2));

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        // 2880 minutes is not "more than 2 days": the 1-day template applies.
        assert_eq!(leads(&seq), vec![480.0, 120.0, 15.0]);
    }

    #[test]
    fn test_overdue_single_immediate_urgent() {
        let now = at(2026, 3, 2, 9, 0, 0);
        for priority in [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent] {
            let task = Task::new("t1", "late quiz", "u1")
                .with_due(now - Duration::hours(1))
                .with_priority(priority);

            let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

            assert_eq!(seq.len(), 1);
            assert_eq!(seq[0].lead_minutes, 0.0);
            assert_eq!(seq[0].tier, UrgencyTier::Urgent);
            assert!(seq[0].is_final);
        }
    }

    #[test]
    fn test_due_within_a_minute_single_near_zero() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "submit form", "u1").with_due(now + Duration::seconds(60));

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        assert_eq!(seq.len(), 1);
        assert!(seq[0].lead_minutes <= 1.0);
        assert!(seq[0].lead_minutes > 0.0);
    }

    #[test]
    fn test_ninety_seconds_urgent_priority() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "join call", "u1")
            .with_due(now + Duration::seconds(90))
            .with_priority(Priority::Urgent);

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        assert_eq!(seq.len(), 1);
        assert!(seq[0].lead_minutes <= 1.5);
        assert_eq!(seq[0].tier, UrgencyTier::Urgent);
    }

    #[test]
    fn test_forty_five_seconds_fallback_path() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "send RSVP", "u1")
            .with_due(now + Duration::seconds(45))
            .with_priority(Priority::Urgent);

        // Clamp window is empty (upper bound below the minimum lead), so the
        // half-way fallback must produce the one instruction.
        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        assert_eq!(seq.len(), 1);
        assert!(seq[0].lead_minutes < 0.75);
        assert!(seq[0].lead_minutes > 0.0);
    }

    #[test]
    fn test_idempotent_for_identical_inputs() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "flashcards", "u1")
            .with_due(now + Duration::hours(26))
            .with_priority(Priority::High);
        let profile = BehaviorProfile::default();

        let a = generate_sequence(&task, &profile, now).unwrap();
        let b = generate_sequence(&task, &profile, now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_priority_never_decreases_leads() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let due = now + Duration::days(3);
        let profile = BehaviorProfile::default();

        let mut prev: Option<Vec<f64>> = None;
        for priority in [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent] {
            let task = Task::new("t1", "essay", "u1").with_due(due).with_priority(priority);
            let cur = leads(&generate_sequence(&task, &profile, now).unwrap());
            if let Some(prev) = &prev {
                assert_eq!(prev.len(), cur.len());
                for (p, c) in prev.iter().zip(&cur) {
                    assert!(c >= p, "priority bump decreased a lead: {p} -> {c}");
                }
            }
            prev = Some(cur);
        }
    }

    #[test]
    fn test_missing_due_is_input_error() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "no deadline", "u1");
        assert_eq!(
            generate_sequence(&task, &BehaviorProfile::default(), now),
            Err(SequenceError::MissingDue)
        );
    }

    #[test]
    fn test_fixed_lead_overrides_template() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "custom lead", "u1")
            .with_due(now + Duration::hours(5))
            .with_fixed_lead(42.0);

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        assert_eq!(leads(&seq), vec![42.0]);
        assert_eq!(seq[0].tier, UrgencyTier::Urgent);
        assert!(seq[0].is_final);
    }

    #[test]
    fn test_minimal_frequency_keeps_only_final() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "reading", "u1").with_due(now + Duration::hours(3));
        let profile = BehaviorProfile::default().with_frequency(ReminderFrequency::Minimal);

        let seq = generate_sequence(&task, &profile, now).unwrap();

        assert_eq!(leads(&seq), vec![10.0]);
        assert!(seq[0].is_final);
    }

    #[test]
    fn test_frequent_adds_last_call_to_short_sequences() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "warmup", "u1").with_due(now + Duration::minutes(45));
        let profile = BehaviorProfile::default().with_frequency(ReminderFrequency::Frequent);

        let seq = generate_sequence(&task, &profile, now).unwrap();

        assert_eq!(leads(&seq), vec![15.0, 5.0, 2.0]);
        assert!(seq[2].is_final);
    }

    #[test]
    fn test_procrastinator_gets_earlier_reminders() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "lab prep", "u1").with_due(now + Duration::hours(3));
        let profile = BehaviorProfile::default().with_procrastination(0.9);

        let seq = generate_sequence(&task, &profile, now).unwrap();

        assert_eq!(leads(&seq), vec![150.0, 37.5, 12.5]);
    }

    #[test]
    fn test_difficulty_bumps_earliest_lead() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "proof homework", "u1")
            .with_due(now + Duration::hours(3))
            .with_difficulty(5);

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        assert_eq!(leads(&seq), vec![125.0, 30.0, 10.0]);
    }

    #[test]
    fn test_low_completion_rate_opens_encouraging() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "journal", "u1").with_due(now + Duration::hours(3));
        let profile = BehaviorProfile::default().with_completion_rate(0.2);

        let seq = generate_sequence(&task, &profile, now).unwrap();
        assert_eq!(seq[0].tier, UrgencyTier::Encouraging);

        // High stress wins over the low-completion push.
        let stressed = profile.with_stress_level(9);
        let seq = generate_sequence(&task, &stressed, now).unwrap();
        assert_eq!(seq[0].tier, UrgencyTier::Gentle);
    }

    #[test]
    fn test_quiet_hours_shift_first_reminder() {
        // Due 2026-03-02 15:00 UTC = 09:00 CST. The 120-minute reminder would
        // fire 07:00 CST, inside 22:00-08:00 quiet hours; it moves to 08:00
        // CST (lead 60). Later reminders are untouched.
        let now = at(2026, 3, 2, 0, 0, 0);
        let task = Task::new("t1", "morning review", "u1").with_due(at(2026, 3, 2, 15, 0, 0));
        let profile = BehaviorProfile::default()
            .with_quiet_hours(QuietHours::new("22:00", "08:00"))
            .with_timezone("America/Chicago");

        let seq = generate_sequence(&task, &profile, now).unwrap();

        assert_eq!(leads(&seq), vec![60.0, 30.0, 10.0]);
        let due = task.due.unwrap();
        for i in &seq {
            let fire_at = due - i.lead();
            assert!(fire_at > now && fire_at < due);
        }
    }

    #[test]
    fn test_quiet_hours_never_push_past_due() {
        // Due 13:30 UTC = 07:30 CST, inside quiet hours; the shifted wake
        // time (08:00 CST = 14:00 UTC) would be after due, so leads stay.
        let now = at(2026, 3, 2, 6, 0, 0);
        let task = Task::new("t1", "early quiz", "u1").with_due(at(2026, 3, 2, 13, 30, 0));
        let profile = BehaviorProfile::default()
            .with_quiet_hours(QuietHours::new("22:00", "08:00"))
            .with_timezone("America/Chicago");

        let seq = generate_sequence(&task, &profile, now).unwrap();

        let due = task.due.unwrap();
        for i in &seq {
            let fire_at = due - i.lead();
            assert!(fire_at > now && fire_at < due);
        }
    }

    #[test]
    fn test_messages_name_the_task() {
        let now = at(2026, 3, 2, 9, 0, 0);
        let task = Task::new("t1", "biology notes", "u1").with_due(now + Duration::hours(3));

        let seq = generate_sequence(&task, &BehaviorProfile::default(), now).unwrap();

        for i in &seq {
            assert!(i.message.contains("biology notes"));
        }
        assert!(seq[0].message.contains("2 hours"));
        assert!(seq[2].message.contains("10 minutes"));
    }
}
