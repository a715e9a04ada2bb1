use crate::error::{AppError, EstimateError};
use crate::queue::QueueInputs;
use crate::state::AppState;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

pub mod formula_v1;
pub mod model;
pub mod noise;
pub mod regression_v1;

use formula_v1::{FormulaParams, FormulaV1Model};
use model::{EstimationModel, WaitEstimate};
use noise::{EstimateMode, NoiseSource};
use regression_v1::{RegressionParams, RegressionV1Model};

/// Estimate with the default formula model.
///
/// Stochastic mode draws from a fresh entropy-seeded source; use a model and
/// `NoiseSource::seeded` directly for reproducible stochastic runs.
pub fn estimate(inputs: &QueueInputs, mode: EstimateMode) -> Result<WaitEstimate, EstimateError> {
    let mut noise = NoiseSource::for_mode(mode, None);
    FormulaV1Model::with_defaults().estimate(inputs, &mut noise)
}

// Model Factory
pub fn create_model(
    config: &CalibrationFile,
) -> Result<Box<dyn EstimationModel>, CalibrationError> {
    match config.model.as_str() {
        formula_v1::MODEL_NAME => {
            let params: FormulaParams = serde_json::from_value(config.params.clone())?;
            params.validate().map_err(CalibrationError::Invalid)?;
            Ok(Box::new(FormulaV1Model::new(params)))
        }
        regression_v1::MODEL_NAME => {
            let params: RegressionParams = serde_json::from_value(config.params.clone())?;
            params.validate().map_err(CalibrationError::Invalid)?;
            Ok(Box::new(RegressionV1Model::new(params)))
        }
        other => Err(CalibrationError::Invalid(format!("unknown model: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CalibrationFile {
    pub model: String,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("failed to read calibration file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse calibration file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid calibration: {0}")]
    Invalid(String),
}

pub fn load_calibration_from_path(
    path: impl AsRef<Path>,
) -> Result<Box<dyn EstimationModel>, CalibrationError> {
    let contents = std::fs::read_to_string(path)?;
    let config: CalibrationFile = serde_json::from_str(&contents)?;
    create_model(&config)
}

/// Loads the configured model, falling back to formula defaults on failure.
pub fn load_model_or_default(path: Option<&Path>) -> Box<dyn EstimationModel> {
    match path {
        Some(path) => match load_calibration_from_path(path) {
            Ok(model) => {
                info!(path = %path.display(), model = model.name(), "Estimation model loaded");
                model
            }
            Err(e) => {
                warn!(error = %e, "Failed to load calibration, using default");
                Box::new(FormulaV1Model::with_defaults())
            }
        },
        None => {
            info!("No calibration path configured, using default model");
            Box::new(FormulaV1Model::with_defaults())
        }
    }
}

/// Estimates with the state's model and publishes the result.
pub fn update_wait_time(
    state: &Arc<RwLock<AppState>>,
    inputs: &QueueInputs,
    noise: &mut NoiseSource,
) -> Result<WaitEstimate, AppError> {
    let model = {
        let guard = state.read().map_err(|_| AppError::StateLock)?;
        Arc::clone(guard.model())
    };

    let estimate = model.estimate(inputs, noise)?;

    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.set_wait_time(estimate.clone())?;

    Ok(estimate)
}
