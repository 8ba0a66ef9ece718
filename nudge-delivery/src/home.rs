//! Local state helpers: the ~/.nudge layout.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn nudge_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".nudge"))
}

pub fn ensure_nudge_home() -> Result<PathBuf> {
    let dir = nudge_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn queue_dir() -> Result<PathBuf> {
    let dir = ensure_nudge_home()?.join("queue");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn profiles_dir() -> Result<PathBuf> {
    let dir = ensure_nudge_home()?.join("profiles");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
