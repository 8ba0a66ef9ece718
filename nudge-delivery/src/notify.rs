//! Local notification capability.
//!
//! Hosts with a display plug in a real notifier; headless hosts use the
//! no-op and rely on network replay instead.

use anyhow::Result;

pub trait LocalNotifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Headless hosts: local display is simply absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl LocalNotifier for NoopNotifier {
    fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

/// Writes the notification to the log. Useful as a default and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LocalNotifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        log::info!("local notification: {title} - {body}");
        Ok(())
    }
}
