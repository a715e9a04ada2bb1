//! Planning helpers built on top of an estimation model: staffing and
//! what-if comparisons, visiting advice, serving clock time and queue growth.

use crate::error::EstimateError;
use crate::estimation::model::{EstimationModel, WaitEstimate, round2};
use crate::estimation::noise::NoiseSource;
use crate::queue::QueueInputs;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

pub const PEAK_VISIT_WINDOW: &str = "2:30 PM - 4:00 PM";
pub const OFF_PEAK_VISIT_WINDOW: &str = "Any non-peak hour";
pub const PROJECTION_SLOT_MINUTES: u32 = 10;
const CLOCK_FORMAT: &str = "[hour repr:12]:[minute] [period]";
/// Serving times further out than a week are not meaningful.
const MAX_SERVING_MINUTES: f64 = 7.0 * 24.0 * 60.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffingSuggestion {
    pub extra_staff: u32,
    pub current_minutes: f64,
    pub improved_minutes: f64,
    pub minutes_saved: f64,
}

/// Compares the current estimate with one more staff member on duty.
pub fn suggest_extra_staff(
    model: &dyn EstimationModel,
    inputs: &QueueInputs,
    noise: &mut NoiseSource,
) -> Result<StaffingSuggestion, EstimateError> {
    let current = model.estimate(inputs, noise)?;
    let improved_inputs = inputs.with_staff_count(inputs.effective_staff().saturating_add(1));
    let improved = model.estimate(&improved_inputs, noise)?;

    Ok(StaffingSuggestion {
        extra_staff: 1,
        current_minutes: current.minutes,
        improved_minutes: improved.minutes,
        minutes_saved: round2(current.minutes - improved.minutes),
    })
}

/// Re-estimates with staff count and/or service time overridden.
pub fn what_if(
    model: &dyn EstimationModel,
    inputs: &QueueInputs,
    staff_count: Option<u32>,
    service_time_per_person: Option<f64>,
    noise: &mut NoiseSource,
) -> Result<WaitEstimate, EstimateError> {
    let mut scenario = inputs.clone();
    if let Some(staff_count) = staff_count {
        scenario = scenario.with_staff_count(staff_count);
    }
    if let Some(service_time) = service_time_per_person {
        scenario = scenario.with_service_time(service_time);
    }
    model.estimate(&scenario, noise)
}

pub fn best_visit_window(is_peak_hour: bool) -> &'static str {
    if is_peak_hour {
        PEAK_VISIT_WINDOW
    } else {
        OFF_PEAK_VISIT_WINDOW
    }
}

/// Clock time at which someone waiting `minutes` from `now` gets served.
pub fn expected_serving_time(now: OffsetDateTime, minutes: f64) -> Option<OffsetDateTime> {
    let minutes = if minutes.is_finite() {
        minutes.clamp(0.0, MAX_SERVING_MINUTES)
    } else {
        0.0
    };
    now.checked_add(time::Duration::seconds_f64(minutes * 60.0))
}

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("invalid clock format: {0}")]
    Description(#[from] time::error::InvalidFormatDescription),
    #[error("clock formatting failed: {0}")]
    Format(#[from] time::error::Format),
}

/// Formats as a 12-hour clock, e.g. `01:30 PM`.
pub fn format_clock(at: OffsetDateTime) -> Result<String, ClockError> {
    let format = time::format_description::parse(CLOCK_FORMAT)?;
    Ok(at.format(&format)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueProjection {
    pub minutes_from_now: u32,
    pub people_in_queue: u32,
}

/// Queue size over the next `slots` ten-minute slots assuming nobody is served.
pub fn project_queue_growth(
    people_ahead: u32,
    arrivals_per_slot: f64,
    slots: u32,
) -> Vec<QueueProjection> {
    let rate = if arrivals_per_slot.is_finite() {
        arrivals_per_slot.max(0.0)
    } else {
        0.0
    };
    (1..=slots)
        .map(|slot| QueueProjection {
            minutes_from_now: slot * PROJECTION_SLOT_MINUTES,
            people_in_queue: (f64::from(people_ahead) + f64::from(slot) * rate).round() as u32,
        })
        .collect()
}
