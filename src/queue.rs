//! Queue-state inputs shared by every estimation model and the simulator.

use crate::error::EstimateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_PRIORITY_RATIO: f64 = 0.5;
pub const MIN_SERVICE_COMPLEXITY: u8 = 1;
pub const MAX_SERVICE_COMPLEXITY: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffExperience {
    New,
    #[serde(alias = "experienced")]
    Average,
    Expert,
}

impl StaffExperience {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Average => "average",
            Self::Expert => "expert",
        }
    }
}

impl FromStr for StaffExperience {
    type Err = EstimateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "average" | "experienced" => Ok(Self::Average),
            "expert" => Ok(Self::Expert),
            other => Err(EstimateError::invalid(format!(
                "unknown staff experience: {other}"
            ))),
        }
    }
}

impl fmt::Display for StaffExperience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Normal,
    Slow,
    Down,
}

impl SystemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Slow => "slow",
            Self::Down => "down",
        }
    }
}

impl FromStr for SystemStatus {
    type Err = EstimateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "slow" => Ok(Self::Slow),
            "down" => Ok(Self::Down),
            other => Err(EstimateError::invalid(format!(
                "unknown system status: {other}"
            ))),
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the queue a wait estimate is computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInputs {
    pub people_ahead: u32,
    /// Average minutes one staff member spends per person.
    pub service_time_per_person: f64,
    /// Coerced to at least 1 wherever it is used as a divisor.
    pub staff_count: u32,
    pub staff_experience: StaffExperience,
    pub system_status: SystemStatus,
    #[serde(default)]
    pub is_peak_hour: bool,
    /// People joining the queue per time unit (one simulation tick).
    #[serde(default)]
    pub arrival_rate: f64,
    #[serde(default)]
    pub priority_ratio: Option<f64>,
    #[serde(default)]
    pub service_complexity: Option<u8>,
}

impl QueueInputs {
    pub fn new(people_ahead: u32, service_time_per_person: f64, staff_count: u32) -> Self {
        Self {
            people_ahead,
            service_time_per_person,
            staff_count,
            staff_experience: StaffExperience::Average,
            system_status: SystemStatus::Normal,
            is_peak_hour: false,
            arrival_rate: 0.0,
            priority_ratio: None,
            service_complexity: None,
        }
    }

    pub fn effective_staff(&self) -> u32 {
        self.staff_count.max(1)
    }

    pub fn with_people_ahead(&self, people_ahead: u32) -> Self {
        Self {
            people_ahead,
            ..self.clone()
        }
    }

    pub fn with_staff_count(&self, staff_count: u32) -> Self {
        Self {
            staff_count,
            ..self.clone()
        }
    }

    pub fn with_service_time(&self, service_time_per_person: f64) -> Self {
        Self {
            service_time_per_person,
            ..self.clone()
        }
    }

    /// Rejects values no estimation model can work with.
    pub fn validate(&self) -> Result<(), EstimateError> {
        if !self.service_time_per_person.is_finite() || self.service_time_per_person <= 0.0 {
            return Err(EstimateError::invalid(format!(
                "service time per person must be positive, got {}",
                self.service_time_per_person
            )));
        }
        if !self.arrival_rate.is_finite() || self.arrival_rate < 0.0 {
            return Err(EstimateError::invalid(format!(
                "arrival rate must be non-negative, got {}",
                self.arrival_rate
            )));
        }
        if let Some(ratio) = self.priority_ratio
            && !(0.0..=MAX_PRIORITY_RATIO).contains(&ratio)
        {
            return Err(EstimateError::invalid(format!(
                "priority ratio must be within [0, {MAX_PRIORITY_RATIO}], got {ratio}"
            )));
        }
        if let Some(complexity) = self.service_complexity
            && !(MIN_SERVICE_COMPLEXITY..=MAX_SERVICE_COMPLEXITY).contains(&complexity)
        {
            return Err(EstimateError::invalid(format!(
                "service complexity must be within [{MIN_SERVICE_COMPLEXITY}, {MAX_SERVICE_COMPLEXITY}], got {complexity}"
            )));
        }
        Ok(())
    }
}
