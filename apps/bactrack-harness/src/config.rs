//! Harness configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use bactrack_core::{BridgeConfig, DeviceProfile, InitOutcome, Platform};
use serde::Deserialize;

/// Harness configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarnessConfig {
    /// Which SDK flavour the simulator imitates.
    /// Override: `BACTRACK_PLATFORM`
    pub platform: Platform,

    /// When set, `initialize` is issued with this key at startup.
    /// Override: `BACTRACK_API_KEY`
    pub api_key: Option<String>,

    /// Label of the host context the SDK is built against.
    pub host_label: String,

    /// Subscribe to the event stream before reading any input.
    pub listen_on_start: bool,

    /// Play connect and measurement sequences automatically.
    /// Override: `BACTRACK_AUTOPLAY`
    pub autoplay: bool,

    /// How long to keep delivering events after stdin closes.
    /// Override: `BACTRACK_DRAIN_MS`
    pub drain_ms: u64,

    /// Scripted result of `initialize`.
    pub init_outcome: InitOutcome,

    /// What the simulated breathalyzer reports.
    pub device: DeviceProfile,

    pub bridge: BridgeConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Android,
            api_key: None,
            host_label: "bactrack-harness".into(),
            listen_on_start: true,
            autoplay: true,
            drain_ms: 250,
            init_outcome: InitOutcome::default(),
            device: DeviceProfile::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BACTRACK_PLATFORM") {
            match val.parse() {
                Ok(platform) => self.platform = platform,
                Err(e) => log::warn!("Ignoring BACTRACK_PLATFORM: {}", e),
            }
        }

        if let Ok(val) = std::env::var("BACTRACK_AUTOPLAY") {
            if let Ok(autoplay) = val.parse() {
                self.autoplay = autoplay;
            }
        }

        if let Ok(val) = std::env::var("BACTRACK_DRAIN_MS") {
            if let Ok(drain_ms) = val.parse() {
                self.drain_ms = drain_ms;
            }
        }

        if let Ok(val) = std::env::var("BACTRACK_BAC") {
            if let Ok(bac) = val.parse() {
                self.device.bac = bac;
            }
        }

        // Note: BACTRACK_API_KEY is handled by clap via #[arg(env = ...)] in main.rs
    }
}
