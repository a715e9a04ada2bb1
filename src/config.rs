use crate::estimation::noise::{EstimateMode, NoiseSource};
use crate::mood::MoodThresholds;
use crate::queue::QueueInputs;
use crate::simulation::{
    DEFAULT_ALERT_THRESHOLDS, DEFAULT_MAX_TICKS, DEFAULT_TICK_INTERVAL, SimulationSettings,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::INFO;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub calibration: Option<CalibrationSettings>,
    #[serde(default)]
    pub estimator: Option<EstimatorSection>,
    #[serde(default)]
    pub mood: Option<MoodThresholds>,
    #[serde(default)]
    pub simulation: Option<SimulationSection>,
    /// Queue the command-line run estimates and simulates.
    #[serde(default)]
    pub queue: Option<QueueInputs>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EstimatorSection {
    /// "deterministic" (default) or "stochastic"
    pub mode: Option<EstimateMode>,
    /// Seed for stochastic mode; omitted means a fresh seed per run
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationSection {
    /// Milliseconds between live ticks (default: 1000)
    pub tick_interval_ms: Option<u64>,
    /// Tick cap per run (default: 500)
    pub max_ticks: Option<u32>,
    /// People served per staff member per tick (default: 1.0)
    pub speed_factor: Option<f64>,
    /// Queue positions that raise a turn-coming-soon alert (default: [3, 1])
    pub alert_thresholds: Option<Vec<u32>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    pub fn calibration_path(&self) -> Option<&Path> {
        let path = self.calibration.as_ref()?.path.as_deref()?;
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        self.logging
            .level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level: {}", self.logging.level)))
    }

    pub fn estimate_mode(&self) -> EstimateMode {
        self.estimator
            .as_ref()
            .and_then(|e| e.mode)
            .unwrap_or_default()
    }

    /// Builds the noise source for the configured mode and seed.
    pub fn noise_source(&self) -> NoiseSource {
        let seed = self.estimator.as_ref().and_then(|e| e.seed);
        NoiseSource::for_mode(self.estimate_mode(), seed)
    }

    /// Returns validated mood thresholds (default: 15 / 30 minutes)
    pub fn mood_thresholds(&self) -> Result<MoodThresholds, ConfigError> {
        let thresholds = self.mood.unwrap_or_default();
        thresholds.validate().map_err(ConfigError::Invalid)?;
        Ok(thresholds)
    }

    pub fn simulation_settings(&self) -> Result<SimulationSettings, ConfigError> {
        let section = self.simulation.as_ref();
        let settings = SimulationSettings {
            tick_interval: section
                .and_then(|s| s.tick_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
            max_ticks: section
                .and_then(|s| s.max_ticks)
                .unwrap_or(DEFAULT_MAX_TICKS),
            speed_factor: section.and_then(|s| s.speed_factor).unwrap_or(1.0),
            alert_thresholds: section
                .and_then(|s| s.alert_thresholds.clone())
                .unwrap_or_else(|| DEFAULT_ALERT_THRESHOLDS.to_vec()),
            mood_thresholds: self.mood_thresholds()?,
        };
        settings.validate().map_err(ConfigError::Invalid)?;
        Ok(settings)
    }

    /// Returns the configured queue, validated, or the default demo queue.
    pub fn queue_inputs(&self) -> Result<QueueInputs, ConfigError> {
        let inputs = self
            .queue
            .clone()
            .unwrap_or_else(|| QueueInputs::new(20, 5.0, 3));
        inputs
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(inputs)
    }
}
