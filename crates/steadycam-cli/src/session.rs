//! On-disk session config: stabilization parameters plus the adaptive
//! controller settings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use steadycam_core::adaptive::{AdaptiveConfig, AdaptiveStabilizer};
use steadycam_core::params::{Preset, StabilizationParameters};
use steadycam_core::wrapper::StabilizerWrapper;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub stabilization: StabilizationParameters,
    pub adaptive: AdaptiveSection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveSection {
    pub enabled: bool,
    pub motion_sensitivity: f64,
    pub profiles: AdaptiveConfig,
}

impl Default for AdaptiveSection {
    fn default() -> Self {
        Self {
            enabled: false,
            motion_sensitivity: 1.0,
            profiles: AdaptiveConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            stabilization: preset.parameters(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid stabilization config")
    }

    /// Thread-safe stabilizer for a `width` x `height` stream.
    pub fn build(&self, width: usize, height: usize) -> Result<StabilizerWrapper<AdaptiveStabilizer>> {
        let mut stabilizer = AdaptiveStabilizer::new(self.adaptive.profiles.clone());
        stabilizer.set_adaptive_enabled(self.adaptive.enabled);
        stabilizer.set_motion_sensitivity(self.adaptive.motion_sensitivity);

        let wrapper = StabilizerWrapper::with_stabilizer(stabilizer);
        wrapper
            .initialize(width, height, self.stabilization.clone())
            .with_context(|| format!("Cannot stabilize {width}x{height} frames"))?;
        Ok(wrapper)
    }
}
