//! Estimation model trait for extensible wait time estimation.
//!
//! Every model maps `QueueInputs` to a `WaitEstimate` carrying the factor
//! breakdown that produced it. Models are selected via the calibration file
//! and loaded at startup.

use crate::error::EstimateError;
use crate::estimation::noise::NoiseSource;
use crate::estimation::formula_v1::ExperiencePolarity;
use crate::queue::{QueueInputs, StaffExperience};
use serde::Serialize;

/// Rounds to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditiveTerm {
    pub name: &'static str,
    pub minutes: f64,
}

/// Terms an estimate was built from, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorSet {
    pub base_minutes: f64,
    pub experience_factor: f64,
    pub system_factor: f64,
    pub peak_factor: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additive: Vec<AdditiveTerm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise: Option<f64>,
}

impl FactorSet {
    /// Base time with every multiplier at 1.0.
    pub fn neutral(base_minutes: f64) -> Self {
        Self {
            base_minutes: round2(base_minutes),
            experience_factor: 1.0,
            system_factor: 1.0,
            peak_factor: 1.0,
            additive: Vec::new(),
            noise: None,
        }
    }

    pub fn push_term(&mut self, name: &'static str, minutes: f64) {
        self.additive.push(AdditiveTerm {
            name,
            minutes: round2(minutes),
        });
    }

    /// Every applied term by name, multipliers first.
    pub fn named_terms(&self) -> Vec<(&'static str, f64)> {
        let mut terms = vec![
            ("base_minutes", self.base_minutes),
            ("experience_factor", self.experience_factor),
            ("system_factor", self.system_factor),
            ("peak_factor", self.peak_factor),
        ];
        terms.extend(self.additive.iter().map(|term| (term.name, term.minutes)));
        if let Some(noise) = self.noise {
            terms.push(("noise", noise));
        }
        terms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitEstimate {
    /// Never negative, rounded to two decimals.
    pub minutes: f64,
    pub factors: FactorSet,
}

impl WaitEstimate {
    /// Clamps and rounds a raw model output.
    pub fn from_raw(raw_minutes: f64, factors: FactorSet) -> Self {
        let minutes = round2(raw_minutes).max(0.0);
        Self {
            // -0.0 shows up when a tiny negative rounds to zero
            minutes: if minutes == 0.0 { 0.0 } else { minutes },
            factors,
        }
    }
}

/// Trait for models that turn queue inputs into a wait estimate.
///
/// Implement this trait to add new estimation models. The model is selected
/// via the `model` field of the calibration file.
pub trait EstimationModel: Send + Sync + std::fmt::Debug {
    /// Short identifier matching the calibration `model` field.
    fn name(&self) -> &'static str;

    /// Estimate wait time in minutes. Deterministic sources must yield
    /// identical results for identical inputs.
    fn estimate(
        &self,
        inputs: &QueueInputs,
        noise: &mut NoiseSource,
    ) -> Result<WaitEstimate, EstimateError>;

    /// Serving speed of one staff member relative to an average one.
    fn service_speed(&self, experience: StaffExperience) -> f64 {
        1.0 / ExperiencePolarity::Standard.factor(experience)
    }
}
