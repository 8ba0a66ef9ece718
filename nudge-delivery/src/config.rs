//! Host configuration for the delivery layer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::NotificationBackend;
use crate::home::ensure_nudge_home;
use crate::push::PushGateClient;
use crate::relay::RelayClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub push: PushSection,
    pub relay: RelaySection,
    pub dispatch: DispatchSection,
    pub queue: QueueSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSection {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySection {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSection {
    /// Cap on a single backend call; past it the chain moves on.
    pub backend_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSection {
    /// Overrides ~/.nudge/queue when set.
    pub dir: Option<PathBuf>,
    pub fire_scan_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            push: PushSection {
                base_url: "https://push.nudge.app".to_string(),
                api_key: None,
            },
            relay: RelaySection {
                url: "https://relay.nudge.app".to_string(),
            },
            dispatch: DispatchSection {
                backend_timeout_secs: 8,
            },
            queue: QueueSection {
                dir: None,
                fire_scan_secs: 60,
            },
        }
    }
}

impl DeliveryConfig {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.backend_timeout_secs)
    }

    pub fn fire_scan_interval(&self) -> Duration {
        Duration::from_secs(self.queue.fire_scan_secs)
    }

    /// The dispatch chain in order: push gateway, then the legacy relay.
    pub fn backends(&self) -> Vec<Arc<dyn NotificationBackend>> {
        vec![
            Arc::new(PushGateClient::new(
                self.push.base_url.clone(),
                self.push.api_key.clone(),
            )),
            Arc::new(RelayClient::new(self.relay.url.clone())),
        ]
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_nudge_home()?.join("config.toml"))
}

pub fn load_config() -> Result<DeliveryConfig> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(DeliveryConfig::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn save_config(cfg: &DeliveryConfig) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let cfg = DeliveryConfig::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: DeliveryConfig = toml::from_str(&s).unwrap();
        assert_eq!(back.dispatch.backend_timeout_secs, 8);
        assert_eq!(back.queue.fire_scan_secs, 60);
        assert_eq!(back.push.base_url, cfg.push.base_url);
    }

    #[test]
    fn test_partial_file_fails_loudly() {
        // Missing sections are a config error, not a silent default.
        let parsed: Result<DeliveryConfig, _> = toml::from_str("[push]\nbase_url = \"x\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_chain_order_is_push_then_relay() {
        let backends = DeliveryConfig::default().backends();
        assert_eq!(backends.len(), 2);
        assert_eq!(backends[0].name(), "pushgate");
        assert_eq!(backends[1].name(), "relay");
    }
}
