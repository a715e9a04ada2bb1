//! Formula V1 estimation model.
//!
//! Formula:
//! `wait = (people * service_time / staff) * experience * system * peak + additive terms`

use crate::error::EstimateError;
use crate::estimation::model::{EstimationModel, FactorSet, WaitEstimate, round2};
use crate::estimation::noise::NoiseSource;
use crate::queue::{QueueInputs, StaffExperience, SystemStatus};
use serde::Deserialize;
use tracing::debug;

pub const MODEL_NAME: &str = "formula_v1";
pub const DEFAULT_PEAK_FACTOR: f64 = 1.5;
pub const DEFAULT_PRIORITY_WEIGHT: f64 = 10.0;
pub const DEFAULT_COMPLEXITY_WEIGHT: f64 = 2.0;

/// Which end of the experience scale is treated as slower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperiencePolarity {
    /// New staff are slower: New 1.2, Average 1.0, Expert 0.8.
    #[default]
    Standard,
    /// New staff are faster: New 0.8, Average 1.0, Expert 1.3.
    Inverted,
}

impl ExperiencePolarity {
    pub fn factor(self, experience: StaffExperience) -> f64 {
        match (self, experience) {
            (Self::Standard, StaffExperience::New) => 1.2,
            (Self::Standard, StaffExperience::Average) => 1.0,
            (Self::Standard, StaffExperience::Expert) => 0.8,
            (Self::Inverted, StaffExperience::New) => 0.8,
            (Self::Inverted, StaffExperience::Average) => 1.0,
            (Self::Inverted, StaffExperience::Expert) => 1.3,
        }
    }
}

pub fn system_factor(status: SystemStatus) -> f64 {
    match status {
        SystemStatus::Normal => 1.0,
        SystemStatus::Slow => 1.3,
        SystemStatus::Down => 1.6,
    }
}

/// Formula V1 parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormulaParams {
    pub peak_factor: f64,
    /// Minutes added per unit of arrival rate; 0 disables the term.
    pub arrival_weight: f64,
    pub priority_weight: f64,
    pub complexity_weight: f64,
    pub experience_polarity: ExperiencePolarity,
}

impl Default for FormulaParams {
    fn default() -> Self {
        Self {
            peak_factor: DEFAULT_PEAK_FACTOR,
            arrival_weight: 0.0,
            priority_weight: DEFAULT_PRIORITY_WEIGHT,
            complexity_weight: DEFAULT_COMPLEXITY_WEIGHT,
            experience_polarity: ExperiencePolarity::Standard,
        }
    }
}

impl FormulaParams {
    pub fn validate(&self) -> Result<(), String> {
        if !self.peak_factor.is_finite() || self.peak_factor <= 0.0 {
            return Err(format!("peak_factor must be positive, got {}", self.peak_factor));
        }
        for (name, weight) in [
            ("arrival_weight", self.arrival_weight),
            ("priority_weight", self.priority_weight),
            ("complexity_weight", self.complexity_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("{name} must be non-negative, got {weight}"));
            }
        }
        Ok(())
    }
}

/// Formula V1 estimation model.
#[derive(Debug)]
pub struct FormulaV1Model {
    pub params: FormulaParams,
}

impl FormulaV1Model {
    pub fn new(params: FormulaParams) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(FormulaParams::default())
    }
}

impl EstimationModel for FormulaV1Model {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn estimate(
        &self,
        inputs: &QueueInputs,
        noise: &mut NoiseSource,
    ) -> Result<WaitEstimate, EstimateError> {
        inputs.validate()?;

        let base_minutes = f64::from(inputs.people_ahead) * inputs.service_time_per_person
            / f64::from(inputs.effective_staff());

        let experience_factor =
            self.params.experience_polarity.factor(inputs.staff_experience) * noise.jitter();
        let system_factor = system_factor(inputs.system_status) * noise.jitter();
        let peak_base = if inputs.is_peak_hour {
            self.params.peak_factor
        } else {
            1.0
        };
        let peak_factor = peak_base * noise.jitter();

        let mut factors = FactorSet {
            base_minutes: round2(base_minutes),
            experience_factor: round2(experience_factor),
            system_factor: round2(system_factor),
            peak_factor: round2(peak_factor),
            additive: Vec::new(),
            noise: None,
        };

        let mut raw = base_minutes * experience_factor * system_factor * peak_factor;

        if self.params.arrival_weight > 0.0 {
            let term = inputs.arrival_rate * self.params.arrival_weight;
            factors.push_term("arrival_rate", term);
            raw += term;
        }
        if let Some(ratio) = inputs.priority_ratio {
            let term = ratio * self.params.priority_weight;
            factors.push_term("priority_ratio", term);
            raw += term;
        }
        if let Some(complexity) = inputs.service_complexity {
            let term = f64::from(complexity) * self.params.complexity_weight;
            factors.push_term("service_complexity", term);
            raw += term;
        }
        if let Some(sample) = noise.gaussian(base_minutes) {
            factors.noise = Some(round2(sample));
            raw += sample;
        }

        let estimate = WaitEstimate::from_raw(raw, factors);
        debug!(
            model = MODEL_NAME,
            people_ahead = inputs.people_ahead,
            minutes = estimate.minutes,
            "Wait time estimated"
        );
        Ok(estimate)
    }

    fn service_speed(&self, experience: StaffExperience) -> f64 {
        1.0 / self.params.experience_polarity.factor(experience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_inputs() -> QueueInputs {
        QueueInputs::new(20, 5.0, 3)
    }

    fn deterministic(model: &FormulaV1Model, inputs: &QueueInputs) -> f64 {
        model
            .estimate(inputs, &mut NoiseSource::deterministic())
            .expect("valid inputs")
            .minutes
    }

    #[test]
    fn example_without_peak() {
        let model = FormulaV1Model::with_defaults();

        let estimate = model
            .estimate(&example_inputs(), &mut NoiseSource::deterministic())
            .expect("valid inputs");

        assert_eq!(estimate.minutes, 33.33);
        assert_eq!(estimate.factors.base_minutes, 33.33);
        assert_eq!(estimate.factors.peak_factor, 1.0);
        assert!(estimate.factors.additive.is_empty());
        assert_eq!(estimate.factors.noise, None);
    }

    #[test]
    fn example_with_peak() {
        let model = FormulaV1Model::with_defaults();
        let mut inputs = example_inputs();
        inputs.is_peak_hour = true;

        let estimate = model
            .estimate(&inputs, &mut NoiseSource::deterministic())
            .expect("valid inputs");

        assert_eq!(estimate.minutes, 50.0);
        assert_eq!(estimate.factors.peak_factor, 1.5);
    }

    #[test]
    fn experience_and_system_factors_multiply() {
        let model = FormulaV1Model::with_defaults();
        let mut inputs = QueueInputs::new(10, 2.0, 1);
        inputs.staff_experience = StaffExperience::New;
        inputs.system_status = SystemStatus::Down;

        let estimate = model
            .estimate(&inputs, &mut NoiseSource::deterministic())
            .expect("valid inputs");

        // 20 * 1.2 * 1.6
        assert_eq!(estimate.minutes, 38.4);
        assert_eq!(estimate.factors.experience_factor, 1.2);
        assert_eq!(estimate.factors.system_factor, 1.6);
    }

    #[test]
    fn inverted_polarity_swaps_experience_costs() {
        let model = FormulaV1Model::new(FormulaParams {
            experience_polarity: ExperiencePolarity::Inverted,
            ..FormulaParams::default()
        });
        let mut inputs = QueueInputs::new(10, 1.0, 1);
        inputs.staff_experience = StaffExperience::Expert;

        assert_eq!(deterministic(&model, &inputs), 13.0);

        inputs.staff_experience = StaffExperience::New;
        assert_eq!(deterministic(&model, &inputs), 8.0);
    }

    #[test]
    fn additive_terms_are_applied_and_named() {
        let model = FormulaV1Model::new(FormulaParams {
            arrival_weight: 1.5,
            ..FormulaParams::default()
        });
        let mut inputs = QueueInputs::new(6, 2.0, 2);
        inputs.arrival_rate = 4.0;
        inputs.priority_ratio = Some(0.2);
        inputs.service_complexity = Some(3);

        let estimate = model
            .estimate(&inputs, &mut NoiseSource::deterministic())
            .expect("valid inputs");

        // 6 + 6 + 2 + 6
        assert_eq!(estimate.minutes, 20.0);
        let names: Vec<&str> = estimate.factors.additive.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["arrival_rate", "priority_ratio", "service_complexity"]);
    }

    #[test]
    fn zero_people_ahead_yields_zero() {
        let model = FormulaV1Model::with_defaults();
        let mut inputs = QueueInputs::new(0, 5.0, 3);
        inputs.is_peak_hour = true;
        inputs.system_status = SystemStatus::Slow;

        assert_eq!(deterministic(&model, &inputs), 0.0);
    }

    #[test]
    fn zero_staff_is_treated_as_one() {
        let model = FormulaV1Model::with_defaults();

        assert_eq!(deterministic(&model, &QueueInputs::new(4, 3.0, 0)), 12.0);
    }

    #[test]
    fn deterministic_estimates_are_identical() {
        let model = FormulaV1Model::with_defaults();
        let inputs = example_inputs();

        let first = deterministic(&model, &inputs);
        let second = deterministic(&model, &inputs);

        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn more_staff_never_increases_wait() {
        let model = FormulaV1Model::with_defaults();
        let mut previous = f64::MAX;

        for staff in 0..=12 {
            let minutes = deterministic(&model, &QueueInputs::new(37, 4.5, staff));
            assert!(minutes <= previous, "staff {staff}: {minutes} > {previous}");
            previous = minutes;
        }
    }

    #[test]
    fn more_people_never_decreases_wait() {
        let model = FormulaV1Model::with_defaults();
        let mut previous = 0.0;

        for people in 0..=60 {
            let minutes = deterministic(&model, &QueueInputs::new(people, 3.5, 4));
            assert!(minutes >= previous, "people {people}: {minutes} < {previous}");
            previous = minutes;
        }
    }

    #[test]
    fn invalid_service_time_is_rejected() {
        let model = FormulaV1Model::with_defaults();

        let result = model.estimate(
            &QueueInputs::new(5, -1.0, 2),
            &mut NoiseSource::deterministic(),
        );

        assert!(matches!(result, Err(EstimateError::InvalidInput(_))));
    }

    #[test]
    fn stochastic_mean_converges_to_deterministic() {
        let model = FormulaV1Model::with_defaults();
        let inputs = example_inputs();
        let expected = deterministic(&model, &inputs);
        let mut noise = NoiseSource::seeded(2024);
        let n = 2000;

        let mut sum = 0.0;
        for _ in 0..n {
            let estimate = model.estimate(&inputs, &mut noise).expect("valid inputs");
            assert!(estimate.minutes >= 0.0);
            assert!(estimate.factors.noise.is_some());
            sum += estimate.minutes;
        }
        let mean = sum / n as f64;

        assert!(
            (mean - expected).abs() < 0.5,
            "stochastic mean {mean} far from {expected}"
        );
    }

    #[test]
    fn params_validation_rejects_bad_values() {
        let params = FormulaParams {
            peak_factor: 0.0,
            ..FormulaParams::default()
        };
        assert!(params.validate().is_err());

        let params = FormulaParams {
            arrival_weight: -2.0,
            ..FormulaParams::default()
        };
        assert!(params.validate().is_err());
        assert!(FormulaParams::default().validate().is_ok());
    }
}
