//! Per-instruction delivery: network chain first, offline queue as the
//! terminal fallback.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde_json::json;

use nudge_core::{ReminderInstruction, Task, UrgencyTier};

use crate::backend::{NotificationBackend, PushPayload, first_success};
use crate::queue::{OfflineQueue, OfflineQueueEntry, QueueOrigin};

/// One reminder instruction bound to a concrete fire time, ready for the
/// dispatch chain. Fire times are strictly between now and due, except the
/// deliberate immediate case.
#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    pub instruction_id: String,
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub fire_at: DateTime<Utc>,
    pub tier: UrgencyTier,
    pub message: String,
    pub priority_score: i32,
}

impl DeliveryAttempt {
    pub fn from_instruction(
        task: &Task,
        due: DateTime<Utc>,
        instruction: &ReminderInstruction,
        index: usize,
    ) -> Self {
        Self {
            instruction_id: format!("ri-{}-{}", task.id, index),
            task_id: task.id.clone(),
            user_id: task.user_id.clone(),
            title: task.title.clone(),
            fire_at: due - instruction.lead(),
            tier: instruction.tier,
            message: instruction.message.clone(),
            priority_score: task.priority.score() + instruction.tier.notification_priority(),
        }
    }

    pub fn payload(&self) -> PushPayload {
        PushPayload {
            title: self.title.clone(),
            body: self.message.clone(),
            data: json!({
                "task_id": self.task_id,
                "instruction_id": self.instruction_id,
                "tier": self.tier,
            }),
            priority: self.priority_score,
        }
    }

    fn queue_entry(&self, now: DateTime<Utc>, seq: usize) -> OfflineQueueEntry {
        let origin = if self.fire_at <= now {
            QueueOrigin::ScheduledNotification
        } else {
            QueueOrigin::PendingSchedule
        };
        OfflineQueueEntry {
            id: OfflineQueueEntry::entry_id(&self.task_id, self.fire_at, seq),
            task_id: self.task_id.clone(),
            user_id: self.user_id.clone(),
            fire_at: self.fire_at,
            title: self.title.clone(),
            body: self.message.clone(),
            origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A network backend acknowledged the send or the scheduled send.
    Delivered {
        instruction_id: String,
        backend: &'static str,
        delivery_id: String,
    },
    /// Every network backend failed; the reminder sits in the offline queue.
    Queued {
        instruction_id: String,
        entry_id: String,
    },
    /// Even the local queue write failed. This loses one instruction, never
    /// the whole task.
    Dropped {
        instruction_id: String,
        reason: String,
    },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DispatchOutcome::Dropped { .. })
    }

    pub fn instruction_id(&self) -> &str {
        match self {
            DispatchOutcome::Delivered { instruction_id, .. } => instruction_id,
            DispatchOutcome::Queued { instruction_id, .. } => instruction_id,
            DispatchOutcome::Dropped { instruction_id, .. } => instruction_id,
        }
    }

    /// Label for analytics records.
    pub fn backend_label(&self) -> &str {
        match self {
            DispatchOutcome::Delivered { backend, .. } => backend,
            DispatchOutcome::Queued { .. } => "offline-queue",
            DispatchOutcome::Dropped { .. } => "dropped",
        }
    }
}

/// Push one attempt through the chain. Independent per attempt: nothing
/// here blocks or fails sibling attempts for the same task.
pub async fn dispatch_attempt(
    attempt: &DeliveryAttempt,
    backends: &[Arc<dyn NotificationBackend>],
    queue: &OfflineQueue,
    timeout: StdDuration,
    now: DateTime<Utc>,
    seq: usize,
) -> DispatchOutcome {
    let payload = attempt.payload();

    if let Some(receipt) = first_success(
        backends,
        &attempt.user_id,
        &payload,
        attempt.fire_at,
        now,
        timeout,
    )
    .await
    {
        return DispatchOutcome::Delivered {
            instruction_id: attempt.instruction_id.clone(),
            backend: receipt.backend,
            delivery_id: receipt.delivery_id,
        };
    }

    log::warn!(
        "all network backends failed for {}; falling back to offline queue",
        attempt.instruction_id
    );

    match queue.enqueue(attempt.queue_entry(now, seq)) {
        Ok(entry_id) => DispatchOutcome::Queued {
            instruction_id: attempt.instruction_id.clone(),
            entry_id,
        },
        Err(e) => {
            log::error!("offline enqueue failed for {}: {e}", attempt.instruction_id);
            DispatchOutcome::Dropped {
                instruction_id: attempt.instruction_id.clone(),
                reason: e.to_string(),
            }
        }
    }
}
