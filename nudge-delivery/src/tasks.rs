//! Read-only task lookup, owned by the host's task-management side.
//!
//! The orchestrator only needs it to put a real title on snooze reminders.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use nudge_core::Task;

pub trait TaskDirectory: Send + Sync {
    fn get(&self, task_id: &str) -> Result<Option<Task>>;
}

#[derive(Default)]
pub struct MemoryTaskDirectory {
    tasks: Mutex<HashMap<String, Task>>,
}

impl MemoryTaskDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id.clone(), task);
    }
}

impl TaskDirectory for MemoryTaskDirectory {
    fn get(&self, task_id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.lock().unwrap().get(task_id).cloned())
    }
}
