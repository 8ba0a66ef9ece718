//! Behavior-profile store, read-only from the scheduler's perspective.
//!
//! A profiler collaborator owns writes; here we only load, and scheduling
//! must keep working on defaults when a profile is missing or unreadable.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use nudge_core::BehaviorProfile;

pub trait ProfileStore: Send + Sync {
    fn load(&self, user_id: &str) -> Result<Option<BehaviorProfile>>;
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, BehaviorProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, user_id: impl Into<String>, profile: BehaviorProfile) {
        self.profiles.lock().unwrap().insert(user_id.into(), profile);
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, user_id: &str) -> Result<Option<BehaviorProfile>> {
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }
}

/// One `{user_id}.json` per user under the profiles directory.
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(Self { dir })
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self, user_id: &str) -> Result<Option<BehaviorProfile>> {
        let path = self.dir.join(format!("{user_id}.json"));
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

/// Fetch-or-default. Load errors are logged and degrade to defaults; a
/// broken profile file must never take scheduling down with it.
pub fn resolve_profile(store: &dyn ProfileStore, user_id: &str) -> BehaviorProfile {
    match store.load(user_id) {
        Ok(Some(profile)) => profile,
        Ok(None) => BehaviorProfile::default(),
        Err(e) => {
            log::warn!("profile load failed for {user_id}: {e:#}; using defaults");
            BehaviorProfile::default()
        }
    }
}
