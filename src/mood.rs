//! Coarse crowd classification of a wait estimate.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_LOW_CEILING: f64 = 15.0;
pub const DEFAULT_MEDIUM_CEILING: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Low,
    Medium,
    Heavy,
}

impl MoodLabel {
    pub fn description(self) -> &'static str {
        match self {
            Self::Low => "Low Crowd",
            Self::Medium => "Medium Crowd",
            Self::Heavy => "Heavy Crowd",
        }
    }

    /// Color name presentation layers use for the label.
    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "orange",
            Self::Heavy => "red",
        }
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Inclusive upper bounds of the Low and Medium tiers, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MoodThresholds {
    pub low_ceiling: f64,
    pub medium_ceiling: f64,
}

impl Default for MoodThresholds {
    fn default() -> Self {
        Self {
            low_ceiling: DEFAULT_LOW_CEILING,
            medium_ceiling: DEFAULT_MEDIUM_CEILING,
        }
    }
}

impl MoodThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !self.low_ceiling.is_finite() || !self.medium_ceiling.is_finite() {
            return Err("mood ceilings must be finite".to_string());
        }
        if self.low_ceiling < 0.0 || self.low_ceiling > self.medium_ceiling {
            return Err(format!(
                "mood ceilings must satisfy 0 <= low ({}) <= medium ({})",
                self.low_ceiling, self.medium_ceiling
            ));
        }
        Ok(())
    }
}

pub fn classify(minutes: f64, thresholds: &MoodThresholds) -> MoodLabel {
    if minutes <= thresholds.low_ceiling {
        MoodLabel::Low
    } else if minutes <= thresholds.medium_ceiling {
        MoodLabel::Medium
    } else {
        MoodLabel::Heavy
    }
}
