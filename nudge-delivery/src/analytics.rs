//! Fire-and-forget analytics sink.
//!
//! Absence or failure of the sink must never affect scheduling: writes are
//! spawned off the hot path and errors are swallowed after a warn log.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use nudge_core::ReminderAnalyticsRecord;

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, record: ReminderAnalyticsRecord) -> Result<()>;
}

/// Default sink: the record only reaches the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    async fn record(&self, record: ReminderAnalyticsRecord) -> Result<()> {
        log::debug!(
            "analytics: task={} user={} backend={} fire_at={}",
            record.task_id,
            record.user_id,
            record.backend,
            record.fire_at.to_rfc3339()
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ReminderAnalyticsRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ReminderAnalyticsRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsSink for MemorySink {
    async fn record(&self, record: ReminderAnalyticsRecord) -> Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// Spawn the write and move on; the scheduling result never waits on it.
pub fn record_best_effort(sink: &Arc<dyn AnalyticsSink>, record: ReminderAnalyticsRecord) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.record(record).await {
            log::warn!("analytics write dropped: {e:#}");
        }
    });
}
