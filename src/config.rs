// Configuration - Startup settings loaded from a RON file
//
// Lookup order: the path in TEMPO_PULSE_CONFIG, then
// <config dir>/tempo_pulse/config.ron. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::audio::parameters::ClickVolume;
use crate::sequencer::metronome::SchedulerTiming;
use crate::sequencer::timeline::{StepSize, Subdivision};
use crate::sequencer::transport::TransportState;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "TEMPO_PULSE_CONFIG";

const CONFIG_DIR_NAME: &str = "tempo_pulse";
const CONFIG_FILE_NAME: &str = "config.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub tempo: u32,
    pub range_min: u32,
    pub range_max: u32,
    pub subdivision: Subdivision,
    pub step_size: StepSize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let transport = TransportState::default();
        Self {
            tempo: transport.tempo(),
            range_min: transport.range_min(),
            range_max: transport.range_max(),
            subdivision: transport.subdivision(),
            step_size: transport.step_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub lookahead_ms: u64,
    pub schedule_ahead_secs: f64,
    pub start_latency_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let timing = SchedulerTiming::default();
        Self {
            lookahead_ms: timing.lookahead.as_millis() as u64,
            schedule_ahead_secs: timing.schedule_ahead,
            start_latency_secs: timing.start_latency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name, None for the system default
    pub device: Option<String>,
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            volume: ClickVolume::DEFAULT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// How long the pulse dot stays lit
    pub pulse_ms: u64,
    /// Number of labels under the tempo slider
    pub scale_labels: usize,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            pulse_ms: 90,
            scale_labels: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub transport: TransportConfig,
    pub timing: TimingConfig,
    pub audio: AudioConfig,
    pub visual: VisualConfig,
}

impl MetronomeConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults when no file exists
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::debug!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = ron::from_str(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Initial transport settings, corrected by the same rules as user input
    pub fn transport_state(&self) -> TransportState {
        let mut transport = TransportState::new();
        let t = &self.transport;
        transport.set_range(t.range_min, t.range_max);
        transport.set_step_size(t.step_size);
        transport.set_subdivision(t.subdivision);
        transport.set_tempo(t.tempo);
        transport
    }

    /// Scheduler timing; non-positive or non-finite values fall back to defaults
    pub fn scheduler_timing(&self) -> SchedulerTiming {
        let defaults = SchedulerTiming::default();
        let t = &self.timing;

        let positive = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };

        SchedulerTiming {
            lookahead: if t.lookahead_ms > 0 {
                Duration::from_millis(t.lookahead_ms)
            } else {
                defaults.lookahead
            },
            schedule_ahead: positive(t.schedule_ahead_secs, defaults.schedule_ahead),
            start_latency: if t.start_latency_secs.is_finite() && t.start_latency_secs >= 0.0 {
                t.start_latency_secs
            } else {
                defaults.start_latency
            },
        }
    }

    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.visual.pulse_ms)
    }

    /// At least the two range bounds are labelled
    pub fn scale_label_count(&self) -> usize {
        self.visual.scale_labels.max(2)
    }
}
