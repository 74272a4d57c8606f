//! Ad player configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdPlayerError, Result};

/// Beacon transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional User-Agent header sent with every beacon.
    pub user_agent: Option<String>,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: None,
        }
    }
}

impl BeaconConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration for [`AdPlayer`](crate::AdPlayer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdPlayerConfig {
    /// Polling interval shared by the tracking sampler, the duration monitor
    /// and the countdown notice (ms)
    pub monitor_rate_ms: u64,
    /// Delay between slot cleanup and the done callback (ms)
    pub done_grace_delay_ms: u64,
    /// Vertical margin of the overlay above the control bar or bottom edge (px)
    pub overlay_margin_px: f64,
    /// Play linear ads on a sibling surface instead of switching the primary source
    pub enable_video_sibling: bool,
    /// Beacon transport
    pub beacon: BeaconConfig,
}

impl Default for AdPlayerConfig {
    fn default() -> Self {
        Self {
            monitor_rate_ms: 250,
            done_grace_delay_ms: 50,
            overlay_margin_px: 10.0,
            enable_video_sibling: false,
            beacon: BeaconConfig::default(),
        }
    }
}

impl AdPlayerConfig {
    /// Parse a configuration document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.overlay_margin_px.is_finite() || self.overlay_margin_px < 0.0 {
            return Err(AdPlayerError::config(format!(
                "overlay_margin_px must be a non-negative number, got {}",
                self.overlay_margin_px
            )));
        }
        if self.beacon.timeout_secs == 0 {
            return Err(AdPlayerError::config("beacon.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn monitor_rate(&self) -> Duration {
        // A zero period would make `tokio::time::interval` panic.
        Duration::from_millis(self.monitor_rate_ms.max(1))
    }

    pub fn done_grace_delay(&self) -> Duration {
        Duration::from_millis(self.done_grace_delay_ms)
    }

    /// Builder-style toggle for sibling-surface playback.
    pub fn with_video_sibling(mut self, enabled: bool) -> Self {
        self.enable_video_sibling = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdPlayerConfig::default();
        assert_eq!(config.monitor_rate(), Duration::from_millis(250));
        assert_eq!(config.done_grace_delay(), Duration::from_millis(50));
        assert!(!config.enable_video_sibling);
        assert_eq!(config.beacon.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config =
            AdPlayerConfig::from_json_str(r#"{"monitor_rate_ms": 100, "beacon": {"user_agent": "adslot"}}"#)
                .unwrap();
        assert_eq!(config.monitor_rate_ms, 100);
        assert_eq!(config.done_grace_delay_ms, 50);
        assert_eq!(config.beacon.user_agent.as_deref(), Some("adslot"));
        assert_eq!(config.beacon.timeout_secs, 10);
    }

    #[test]
    fn test_negative_overlay_margin_is_rejected() {
        let err = AdPlayerConfig::from_json_str(r#"{"overlay_margin_px": -4}"#).unwrap_err();
        assert!(matches!(err, AdPlayerError::Config(_)));
    }

    #[test]
    fn test_zero_monitor_rate_is_clamped() {
        let config = AdPlayerConfig {
            monitor_rate_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.monitor_rate(), Duration::from_millis(1));
    }
}
