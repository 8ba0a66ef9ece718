//! Delivery backend contract and the first-success chain combinator.
//!
//! Backends are tried in a fixed order; adding or removing one is a change
//! to the list handed to the orchestrator, not to any control flow here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::BackendError;

/// Request shape shared by every backend: title, body, structured data and
/// a coarse vendor priority.
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub data: Value,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub backend: &'static str,
    pub delivery_id: String,
}

#[async_trait]
pub trait NotificationBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Immediate send. Success is an explicit acknowledgement carrying a
    /// delivery id.
    async fn send(&self, user_id: &str, payload: &PushPayload)
    -> Result<DeliveryReceipt, BackendError>;

    /// Vendor-side scheduled send at `at`.
    async fn schedule_at(
        &self,
        user_id: &str,
        payload: &PushPayload,
        at: DateTime<Utc>,
    ) -> Result<DeliveryReceipt, BackendError>;

    /// Best-effort cancellation of a previously scheduled send.
    /// `Ok(false)` means the backend cannot cancel.
    async fn cancel(&self, _delivery_id: &str) -> Result<bool, BackendError> {
        Ok(false)
    }
}

/// Try `backends` in order, first success wins. Each call is bounded by
/// `timeout`; a timed-out or failed backend is logged and the chain moves on.
/// A fire time at or before `now` means an immediate send, otherwise a
/// vendor-side scheduled send.
pub async fn first_success(
    backends: &[Arc<dyn NotificationBackend>],
    user_id: &str,
    payload: &PushPayload,
    fire_at: DateTime<Utc>,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Option<DeliveryReceipt> {
    for backend in backends {
        let call = async {
            if fire_at <= now {
                backend.send(user_id, payload).await
            } else {
                backend.schedule_at(user_id, payload, fire_at).await
            }
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(receipt)) => {
                log::info!(
                    "delivered via {}: user={} fire_at={} delivery_id={}",
                    backend.name(),
                    user_id,
                    fire_at.to_rfc3339(),
                    receipt.delivery_id
                );
                return Some(receipt);
            }
            Ok(Err(err)) => {
                log::warn!("{} failed for user {}: {}", backend.name(), user_id, err);
            }
            Err(_) => {
                log::warn!(
                    "{} timed out after {:?} for user {}",
                    backend.name(),
                    timeout,
                    user_id
                );
            }
        }
    }

    None
}
