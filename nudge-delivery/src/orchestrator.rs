//! Scheduling orchestrator: profile resolution, sequence generation,
//! parallel dispatch, and cancellation bookkeeping.
//!
//! Built from explicit dependencies so every collaborator is substitutable
//! in tests; there is no global scheduler instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use futures_util::future::join_all;

use nudge_core::{ReminderAnalyticsRecord, SequenceError, Task, UrgencyTier, generate_sequence};

use crate::analytics::{AnalyticsSink, record_best_effort};
use crate::backend::NotificationBackend;
use crate::dispatcher::{DeliveryAttempt, DispatchOutcome, dispatch_attempt};
use crate::error::{QueueError, ScheduleError};
use crate::notify::LocalNotifier;
use crate::profiles::{ProfileStore, resolve_profile};
use crate::queue::OfflineQueue;
use crate::tasks::TaskDirectory;

const DEFAULT_BACKEND_TIMEOUT: StdDuration = StdDuration::from_secs(8);

/// Where a not-yet-fired instruction currently lives.
#[derive(Debug, Clone)]
enum PendingTarget {
    Vendor {
        backend: &'static str,
        delivery_id: String,
    },
    Queue {
        entry_id: String,
    },
}

#[derive(Debug, Clone)]
struct PendingHandle {
    instruction_id: String,
    target: PendingTarget,
}

#[derive(Debug, Clone)]
pub struct SchedulingResult {
    pub task_id: String,
    pub outcomes: Vec<DispatchOutcome>,
}

impl SchedulingResult {
    /// True when nothing needed delivery, or at least one instruction was
    /// delivered or queued. Partial success is success; the per-instruction
    /// detail lives in `outcomes`.
    pub fn succeeded(&self) -> bool {
        self.outcomes.is_empty() || self.outcomes.iter().any(|o| o.is_success())
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DispatchOutcome::Delivered { .. }))
            .count()
    }

    pub fn queued(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DispatchOutcome::Queued { .. }))
            .count()
    }

    pub fn dropped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DispatchOutcome::Dropped { .. }))
            .count()
    }
}

pub struct ReminderScheduler {
    backends: Vec<Arc<dyn NotificationBackend>>,
    queue: OfflineQueue,
    profiles: Arc<dyn ProfileStore>,
    analytics: Arc<dyn AnalyticsSink>,
    tasks: Option<Arc<dyn TaskDirectory>>,
    backend_timeout: StdDuration,
    pending: Mutex<HashMap<String, Vec<PendingHandle>>>,
}

impl ReminderScheduler {
    pub fn new(
        backends: Vec<Arc<dyn NotificationBackend>>,
        queue: OfflineQueue,
        profiles: Arc<dyn ProfileStore>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            backends,
            queue,
            profiles,
            analytics,
            tasks: None,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_task_directory(mut self, tasks: Arc<dyn TaskDirectory>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn with_backend_timeout(mut self, timeout: StdDuration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Generate the reminder sequence for `task` and dispatch every
    /// instruction concurrently. Failure or delay of one instruction never
    /// blocks the others.
    pub async fn schedule_reminders(
        &self,
        task: &Task,
    ) -> Result<SchedulingResult, ScheduleError> {
        if task.completed {
            log::debug!("{} already completed; nothing to schedule", task.id);
            return Ok(SchedulingResult {
                task_id: task.id.clone(),
                outcomes: Vec::new(),
            });
        }

        let due = task
            .due
            .ok_or(ScheduleError::InvalidTask(SequenceError::MissingDue))?;
        let now = Utc::now();
        let profile = resolve_profile(self.profiles.as_ref(), &task.user_id);
        let instructions = generate_sequence(task, &profile, now)?;

        let attempts: Vec<DeliveryAttempt> = instructions
            .iter()
            .enumerate()
            .map(|(i, instruction)| DeliveryAttempt::from_instruction(task, due, instruction, i))
            .collect();

        let outcomes = join_all(attempts.iter().enumerate().map(|(seq, attempt)| {
            dispatch_attempt(
                attempt,
                &self.backends,
                &self.queue,
                self.backend_timeout,
                now,
                seq,
            )
        }))
        .await;

        for (attempt, outcome) in attempts.iter().zip(&outcomes) {
            self.register_pending(attempt, outcome, now);
            record_best_effort(
                &self.analytics,
                ReminderAnalyticsRecord::new(
                    &attempt.task_id,
                    &attempt.user_id,
                    attempt.fire_at,
                    attempt.tier,
                    outcome.backend_label(),
                    now,
                ),
            );
        }

        let result = SchedulingResult {
            task_id: task.id.clone(),
            outcomes,
        };
        log::info!(
            "scheduled {}: {} delivered, {} queued, {} dropped",
            task.id,
            result.delivered(),
            result.queued(),
            result.dropped()
        );
        Ok(result)
    }

    /// Re-enter the pipeline with one synthetic reminder firing
    /// `minutes_from_now` minutes from now.
    pub async fn snooze(
        &self,
        task_id: &str,
        user_id: &str,
        minutes_from_now: i64,
    ) -> SchedulingResult {
        let now = Utc::now();
        let fire_at = now + Duration::minutes(minutes_from_now.max(0));

        let known_task = self
            .tasks
            .as_ref()
            .and_then(|dir| dir.get(task_id).ok().flatten());
        let title = known_task
            .as_ref()
            .map(|t| t.title.clone())
            .unwrap_or_else(|| "Snoozed reminder".to_string());
        let priority_score = known_task
            .as_ref()
            .map(|t| t.priority.score())
            .unwrap_or(2)
            + UrgencyTier::Urgent.notification_priority();

        let attempt = DeliveryAttempt {
            instruction_id: format!("snooze-{}-{}", task_id, fire_at.timestamp()),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            title: title.clone(),
            fire_at,
            tier: UrgencyTier::Urgent,
            message: format!("Snooze is up: back on \"{title}\"."),
            priority_score,
        };

        let outcome = dispatch_attempt(
            &attempt,
            &self.backends,
            &self.queue,
            self.backend_timeout,
            now,
            0,
        )
        .await;

        self.register_pending(&attempt, &outcome, now);
        record_best_effort(
            &self.analytics,
            ReminderAnalyticsRecord::new(
                task_id,
                user_id,
                fire_at,
                UrgencyTier::Urgent,
                outcome.backend_label(),
                now,
            ),
        );

        SchedulingResult {
            task_id: task_id.to_string(),
            outcomes: vec![outcome],
        }
    }

    /// Short-circuit on completion: cancel every not-yet-fired instruction
    /// for the task. Returns how many were cancelled.
    pub async fn mark_completed(&self, task_id: &str, user_id: &str) -> Result<usize, QueueError> {
        let handles = self
            .pending
            .lock()
            .unwrap()
            .remove(task_id)
            .unwrap_or_default();

        let mut cancelled = 0;
        for handle in handles {
            match handle.target {
                PendingTarget::Vendor {
                    backend,
                    delivery_id,
                } => {
                    let Some(client) = self.backends.iter().find(|b| b.name() == backend) else {
                        continue;
                    };
                    match client.cancel(&delivery_id).await {
                        Ok(true) => cancelled += 1,
                        Ok(false) => log::debug!(
                            "{backend} cannot cancel {delivery_id} ({})",
                            handle.instruction_id
                        ),
                        Err(e) => log::warn!(
                            "cancel failed on {backend} for {}: {e}",
                            handle.instruction_id
                        ),
                    }
                }
                PendingTarget::Queue { entry_id } => match self.queue.remove(&entry_id) {
                    Ok(()) => cancelled += 1,
                    // Already fired or replayed; nothing left to cancel.
                    Err(QueueError::NotFound(_)) => {}
                    Err(e) => log::warn!("queue removal failed for {entry_id}: {e}"),
                },
            }
        }

        // Sweep entries the registry does not know about (e.g. from an
        // earlier process lifetime).
        cancelled += self.queue.remove_task(task_id)?;

        log::info!("completed {task_id} for {user_id}: cancelled {cancelled} pending reminders");
        Ok(cancelled)
    }

    /// Retry everything in the offline queue through the network chain.
    /// Hosts call this from their reconnect hook.
    pub async fn replay_offline(&self) -> Result<usize, QueueError> {
        self.queue
            .replay_pending(&self.backends, self.backend_timeout, Utc::now())
            .await
    }

    /// Start the periodic local-delivery check for queued reminders.
    pub fn start_local_fire_loop(
        &self,
        notifier: Arc<dyn LocalNotifier>,
        every: StdDuration,
    ) -> tokio::task::JoinHandle<()> {
        self.queue.spawn_local_fire_loop(notifier, every)
    }

    pub fn pending_count(&self, task_id: &str) -> usize {
        self.pending
            .lock()
            .unwrap()
            .get(task_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    fn register_pending(
        &self,
        attempt: &DeliveryAttempt,
        outcome: &DispatchOutcome,
        now: chrono::DateTime<Utc>,
    ) {
        let target = match outcome {
            // An immediate send is already gone; only future sends are
            // cancellable.
            DispatchOutcome::Delivered {
                backend,
                delivery_id,
                ..
            } if attempt.fire_at > now => Some(PendingTarget::Vendor {
                backend: *backend,
                delivery_id: delivery_id.clone(),
            }),
            DispatchOutcome::Queued { entry_id, .. } => Some(PendingTarget::Queue {
                entry_id: entry_id.clone(),
            }),
            _ => None,
        };

        let Some(target) = target else {
            return;
        };

        self.pending
            .lock()
            .unwrap()
            .entry(attempt.task_id.clone())
            .or_default()
            .push(PendingHandle {
                instruction_id: attempt.instruction_id.clone(),
                target,
            });
    }
}
