//! Offline fallback queue: durable local storage for reminders that could
//! not be delivered over the network.
//!
//! Entries are keyed by id; insert and remove are atomic per id, so the
//! periodic local fire check and the reconnect replay can run concurrently
//! with new scheduling calls without corrupting the queue.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::{NotificationBackend, PushPayload, first_success};
use crate::error::QueueError;
use crate::notify::LocalNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueOrigin {
    /// A future-scheduled reminder that never reached a vendor.
    #[serde(rename = "pending_schedule")]
    PendingSchedule,
    /// An already-due notification queued for local display.
    #[serde(rename = "scheduled_notification")]
    ScheduledNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueEntry {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub origin: QueueOrigin,
}

impl OfflineQueueEntry {
    /// Locally-unique id: task, fire instant, and position in the sequence.
    pub fn entry_id(task_id: &str, fire_at: DateTime<Utc>, seq: usize) -> String {
        format!("oq-{}-{}-{}", task_id, fire_at.timestamp(), seq)
    }

    fn payload(&self) -> PushPayload {
        PushPayload {
            title: self.title.clone(),
            body: self.body.clone(),
            data: json!({ "task_id": self.task_id, "queue_entry_id": self.id }),
            priority: 2,
        }
    }
}

pub trait QueueStore: Send + Sync {
    fn insert(&self, entry: OfflineQueueEntry) -> Result<(), QueueError>;

    /// Atomic delete-by-key. `NotFound` means another process claimed the
    /// entry first.
    fn remove(&self, id: &str) -> Result<(), QueueError>;

    fn all(&self) -> Result<Vec<OfflineQueueEntry>, QueueError>;
}

#[derive(Default)]
pub struct MemoryQueueStore {
    entries: Mutex<HashMap<String, OfflineQueueEntry>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for MemoryQueueStore {
    fn insert(&self, entry: OfflineQueueEntry) -> Result<(), QueueError> {
        self.entries.lock().unwrap().insert(entry.id.clone(), entry);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), QueueError> {
        self.entries
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    fn all(&self) -> Result<Vec<OfflineQueueEntry>, QueueError> {
        Ok(self.entries.lock().unwrap().values().cloned().collect())
    }
}

/// One JSON file per entry under `dir`. Insert writes `{id}.json`, remove
/// deletes it; per-id files keep concurrent writers off each other's data.
pub struct FileQueueStore {
    dir: PathBuf,
}

impl FileQueueStore {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl QueueStore for FileQueueStore {
    fn insert(&self, entry: OfflineQueueEntry) -> Result<(), QueueError> {
        let path = self.path_for(&entry.id);
        let write = || -> anyhow::Result<()> {
            let json = serde_json::to_string_pretty(&entry)?;
            fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
            Ok(())
        };
        write().map_err(QueueError::Persistence)
    }

    fn remove(&self, id: &str) -> Result<(), QueueError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(QueueError::NotFound(id.to_string()))
            }
            Err(e) => Err(QueueError::Persistence(
                anyhow::Error::new(e).context(format!("remove {}", path.display())),
            )),
        }
    }

    fn all(&self) -> Result<Vec<OfflineQueueEntry>, QueueError> {
        let read = || -> anyhow::Result<Vec<OfflineQueueEntry>> {
            let mut out = Vec::new();
            for dirent in
                fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))?
            {
                let path = dirent?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let raw = match fs::read_to_string(&path) {
                    Ok(raw) => raw,
                    // Entry removed between the scan and the read.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                };
                match serde_json::from_str::<OfflineQueueEntry>(&raw) {
                    Ok(entry) => out.push(entry),
                    Err(e) => log::warn!("skipping malformed queue entry {}: {e}", path.display()),
                }
            }
            Ok(out)
        };
        read().map_err(QueueError::Persistence)
    }
}

/// The offline queue proper: enqueue on total network failure, periodic
/// local firing, and network replay once connectivity returns.
#[derive(Clone)]
pub struct OfflineQueue {
    store: Arc<dyn QueueStore>,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    pub fn enqueue(&self, entry: OfflineQueueEntry) -> Result<String, QueueError> {
        let id = entry.id.clone();
        self.store.insert(entry)?;
        log::info!("queued offline: {id}");
        Ok(id)
    }

    pub fn pending(&self) -> Result<Vec<OfflineQueueEntry>, QueueError> {
        self.store.all()
    }

    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<OfflineQueueEntry>, QueueError> {
        let mut due: Vec<OfflineQueueEntry> = self
            .store
            .all()?
            .into_iter()
            .filter(|e| e.fire_at <= now)
            .collect();
        due.sort_by_key(|e| e.fire_at);
        Ok(due)
    }

    pub fn remove(&self, id: &str) -> Result<(), QueueError> {
        self.store.remove(id)
    }

    /// Drop every entry belonging to `task_id`. Returns how many went away.
    pub fn remove_task(&self, task_id: &str) -> Result<usize, QueueError> {
        let mut removed = 0;
        for entry in self.store.all()? {
            if entry.task_id != task_id {
                continue;
            }
            match self.store.remove(&entry.id) {
                Ok(()) => removed += 1,
                Err(QueueError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Fire every due entry through the local notifier, removing each first
    /// so a concurrent replay cannot double-deliver. A failed local display
    /// puts the entry back for the next cycle.
    pub fn fire_due(&self, notifier: &dyn LocalNotifier, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let mut fired = 0;
        for entry in self.due(now)? {
            match self.store.remove(&entry.id) {
                Ok(()) => {}
                Err(QueueError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
            match notifier.notify(&entry.title, &entry.body) {
                Ok(()) => {
                    log::info!("fired locally: {} task={}", entry.id, entry.task_id);
                    fired += 1;
                }
                Err(e) => {
                    log::warn!("local display failed for {}: {e:#}; requeueing", entry.id);
                    self.store.insert(entry)?;
                }
            }
        }
        Ok(fired)
    }

    /// Retry every pending entry through the network chain. Successes leave
    /// the queue; failures stay for the next reconnect.
    pub async fn replay_pending(
        &self,
        backends: &[Arc<dyn NotificationBackend>],
        timeout: StdDuration,
        now: DateTime<Utc>,
    ) -> Result<usize, QueueError> {
        let mut replayed = 0;
        for entry in self.store.all()? {
            let payload = entry.payload();
            let receipt =
                first_success(backends, &entry.user_id, &payload, entry.fire_at, now, timeout)
                    .await;
            let Some(receipt) = receipt else {
                continue;
            };
            match self.store.remove(&entry.id) {
                Ok(()) => {
                    log::info!("replayed {} via {}", entry.id, receipt.backend);
                    replayed += 1;
                }
                // Fired locally while we were replaying; nothing to undo.
                Err(QueueError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(replayed)
    }

    /// Background local-delivery check, on the order of once a minute.
    pub fn spawn_local_fire_loop(
        &self,
        notifier: Arc<dyn LocalNotifier>,
        every: StdDuration,
    ) -> tokio::task::JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                match queue.fire_due(notifier.as_ref(), Utc::now()) {
                    Ok(0) => {}
                    Ok(n) => log::info!("local fire check delivered {n} reminders"),
                    Err(e) => log::warn!("local fire check failed: {e}"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier {
        count: AtomicUsize,
    }

    impl CountingNotifier {
        fn new() -> Self {
            Self {
                count: AtomicUsize::new(0),
            }
        }
    }

    impl LocalNotifier for CountingNotifier {
        fn notify(&self, _title: &str, _body: &str) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn entry(id: &str, task_id: &str, fire_at: DateTime<Utc>) -> OfflineQueueEntry {
        OfflineQueueEntry {
            id: id.to_string(),
            task_id: task_id.to_string(),
            user_id: "u1".to_string(),
            fire_at,
            title: "Reminder".to_string(),
            body: "body".to_string(),
            origin: QueueOrigin::PendingSchedule,
        }
    }

    #[test]
    fn test_memory_store_insert_due_remove() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let queue = OfflineQueue::new(Arc::new(MemoryQueueStore::new()));

        queue.enqueue(entry("a", "t1", now - chrono::Duration::minutes(1))).unwrap();
        queue.enqueue(entry("b", "t1", now + chrono::Duration::minutes(5))).unwrap();

        assert_eq!(queue.due(now).unwrap().len(), 1);
        assert_eq!(queue.pending().unwrap().len(), 2);

        queue.remove("a").unwrap();
        assert!(matches!(queue.remove("a"), Err(QueueError::NotFound(_))));
    }

    #[test]
    fn test_fire_due_removes_and_notifies() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let queue = OfflineQueue::new(Arc::new(MemoryQueueStore::new()));
        let notifier = CountingNotifier::new();

        queue.enqueue(entry("a", "t1", now - chrono::Duration::minutes(2))).unwrap();
        queue.enqueue(entry("b", "t1", now + chrono::Duration::minutes(2))).unwrap();

        let fired = queue.fire_due(&notifier, now).unwrap();

        assert_eq!(fired, 1);
        assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_task_sweeps_only_that_task() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let queue = OfflineQueue::new(Arc::new(MemoryQueueStore::new()));

        queue.enqueue(entry("a", "t1", now)).unwrap();
        queue.enqueue(entry("b", "t1", now)).unwrap();
        queue.enqueue(entry("c", "t2", now)).unwrap();

        assert_eq!(queue.remove_task("t1").unwrap(), 2);
        let rest = queue.pending().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].task_id, "t2");
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueueStore::new(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();

        store.insert(entry("a", "t1", now)).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[0].origin, QueueOrigin::PendingSchedule);

        store.remove("a").unwrap();
        assert!(store.all().unwrap().is_empty());
        assert!(matches!(store.remove("a"), Err(QueueError::NotFound(_))));
    }
}
