//! Regression V1 estimation model using pre-fitted linear coefficients.
//!
//! Formula: `wait = intercept + sum(coefficient_i * feature_i)`, clamped to
//! the optional bounds. Categorical inputs are ordinal-encoded.

use crate::error::EstimateError;
use crate::estimation::model::{EstimationModel, FactorSet, WaitEstimate};
use crate::estimation::noise::NoiseSource;
use crate::queue::{QueueInputs, StaffExperience, SystemStatus};
use serde::Deserialize;
use tracing::debug;

pub const MODEL_NAME: &str = "regression_v1";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegressionCoefficients {
    pub people_ahead: f64,
    pub service_time: f64,
    pub staff_count: f64,
    /// New = 0, Average = 1, Expert = 2.
    pub experience: f64,
    /// Normal = 0, Slow = 1, Down = 2.
    pub system: f64,
    pub peak: f64,
    pub arrival_rate: f64,
}

/// Regression V1 model parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionParams {
    pub intercept: f64,
    pub coefficients: RegressionCoefficients,
    #[serde(default)]
    pub min_wait_minutes: Option<f64>,
    #[serde(default)]
    pub max_wait_minutes: Option<f64>,
}

impl RegressionParams {
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_wait_minutes, self.max_wait_minutes)
            && min > max
        {
            return Err(format!(
                "min_wait_minutes ({min}) exceeds max_wait_minutes ({max})"
            ));
        }
        Ok(())
    }
}

fn experience_code(experience: StaffExperience) -> f64 {
    match experience {
        StaffExperience::New => 0.0,
        StaffExperience::Average => 1.0,
        StaffExperience::Expert => 2.0,
    }
}

fn system_code(status: SystemStatus) -> f64 {
    match status {
        SystemStatus::Normal => 0.0,
        SystemStatus::Slow => 1.0,
        SystemStatus::Down => 2.0,
    }
}

/// Regression V1 estimation model.
///
/// Deterministic by construction; the noise source is left untouched.
#[derive(Debug)]
pub struct RegressionV1Model {
    pub params: RegressionParams,
}

impl RegressionV1Model {
    pub fn new(params: RegressionParams) -> Self {
        Self { params }
    }
}

impl EstimationModel for RegressionV1Model {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn estimate(
        &self,
        inputs: &QueueInputs,
        _noise: &mut NoiseSource,
    ) -> Result<WaitEstimate, EstimateError> {
        inputs.validate()?;

        let c = &self.params.coefficients;
        let contributions = [
            ("people_ahead", c.people_ahead * f64::from(inputs.people_ahead)),
            ("service_time", c.service_time * inputs.service_time_per_person),
            ("staff_count", c.staff_count * f64::from(inputs.effective_staff())),
            ("experience", c.experience * experience_code(inputs.staff_experience)),
            ("system", c.system * system_code(inputs.system_status)),
            ("peak", if inputs.is_peak_hour { c.peak } else { 0.0 }),
            ("arrival_rate", c.arrival_rate * inputs.arrival_rate),
        ];

        let mut factors = FactorSet::neutral(self.params.intercept);
        let mut wait_time = self.params.intercept;
        for (name, minutes) in contributions {
            factors.push_term(name, minutes);
            wait_time += minutes;
        }

        // Apply bounds
        if let Some(min) = self.params.min_wait_minutes {
            wait_time = wait_time.max(min);
        }
        if let Some(max) = self.params.max_wait_minutes {
            wait_time = wait_time.min(max);
        }

        let estimate = WaitEstimate::from_raw(wait_time, factors);
        debug!(
            model = MODEL_NAME,
            people_ahead = inputs.people_ahead,
            minutes = estimate.minutes,
            "Wait time estimated"
        );
        Ok(estimate)
    }
}
