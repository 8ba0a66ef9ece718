//! nudge-delivery: the async delivery layer for the reminder scheduler.
//!
//! Dispatch chain: push gateway, then the legacy relay, then the durable
//! offline queue. The orchestrator fans a task's reminder instructions out
//! in parallel and reports partial success as success.

pub mod analytics;
pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod home;
pub mod notify;
pub mod orchestrator;
pub mod profiles;
pub mod push;
pub mod queue;
pub mod relay;
pub mod tasks;

pub use analytics::{AnalyticsSink, LogSink, MemorySink, record_best_effort};
pub use backend::{DeliveryReceipt, NotificationBackend, PushPayload, first_success};
pub use config::{DeliveryConfig, config_path, load_config, save_config};
pub use dispatcher::{DeliveryAttempt, DispatchOutcome, dispatch_attempt};
pub use error::{BackendError, QueueError, ScheduleError};
pub use notify::{LocalNotifier, LogNotifier, NoopNotifier};
pub use orchestrator::{ReminderScheduler, SchedulingResult};
pub use profiles::{FileProfileStore, MemoryProfileStore, ProfileStore, resolve_profile};
pub use push::PushGateClient;
pub use queue::{FileQueueStore, MemoryQueueStore, OfflineQueue, OfflineQueueEntry, QueueOrigin, QueueStore};
pub use relay::RelayClient;
pub use tasks::{MemoryTaskDirectory, TaskDirectory};
