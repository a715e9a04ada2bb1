//! Live queue countdown.
//!
//! `LiveQueueSimulator` is a pull-based iterator: the first pull yields the
//! starting snapshot and every further pull advances one tick, serving people,
//! admitting arrivals and re-estimating the wait for whoever is left. It never
//! sleeps; pacing belongs to [`driver`].

use crate::error::EstimateError;
use crate::estimation::model::{EstimationModel, WaitEstimate};
use crate::estimation::noise::NoiseSource;
use crate::mood::{MoodLabel, MoodThresholds, classify};
use crate::queue::QueueInputs;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod driver;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_TICKS: u32 = 500;
pub const DEFAULT_ALERT_THRESHOLDS: [u32; 2] = [3, 1];

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Simulated time covered by one tick; also the pacing used by the driver.
    pub tick_interval: Duration,
    /// Upper bound on ticks, for queues whose arrivals outpace service.
    pub max_ticks: u32,
    /// People one average staff member serves per tick; scaled by the
    /// model's experience speed.
    pub speed_factor: f64,
    pub alert_thresholds: Vec<u32>,
    pub mood_thresholds: MoodThresholds,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_ticks: DEFAULT_MAX_TICKS,
            speed_factor: 1.0,
            alert_thresholds: DEFAULT_ALERT_THRESHOLDS.to_vec(),
            mood_thresholds: MoodThresholds::default(),
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.speed_factor.is_finite() || self.speed_factor <= 0.0 {
            return Err(format!(
                "speed_factor must be positive, got {}",
                self.speed_factor
            ));
        }
        self.mood_thresholds.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The caller stopped the run.
    Cancelled,
    /// `max_ticks` elapsed with people still queued.
    TickLimit,
    /// The estimator rejected the inputs.
    EstimateFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SimulationStatus {
    Idle,
    Running,
    Completed,
    Stopped { reason: StopReason },
}

impl SimulationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped { .. })
    }
}

/// Snapshot emitted after each tick. Read-only to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationState {
    pub tick: u32,
    pub elapsed: Duration,
    pub remaining_in_queue: u32,
    pub served_count: u32,
    pub served_this_tick: u32,
    pub arrived_this_tick: u32,
    pub current_wait_estimate: WaitEstimate,
    pub mood: MoodLabel,
    pub status: SimulationStatus,
    /// Set when `remaining_in_queue` just dropped to an alert threshold.
    pub turn_coming_soon: bool,
    pub alert_threshold: Option<u32>,
}

#[derive(Debug)]
pub struct LiveQueueSimulator {
    model: Arc<dyn EstimationModel>,
    noise: NoiseSource,
    inputs: QueueInputs,
    settings: SimulationSettings,
    status: SimulationStatus,
    capacity: u32,
    tick: u32,
    remaining: u32,
    served: u32,
    arrival_carry: f64,
    last: Option<SimulationState>,
}

/// Starts a new run. Runs cannot be rewound; build another to restart.
pub fn simulate(
    model: Arc<dyn EstimationModel>,
    inputs: QueueInputs,
    settings: SimulationSettings,
    noise: NoiseSource,
) -> Result<LiveQueueSimulator, EstimateError> {
    LiveQueueSimulator::new(model, inputs, settings, noise)
}

impl LiveQueueSimulator {
    pub fn new(
        model: Arc<dyn EstimationModel>,
        inputs: QueueInputs,
        settings: SimulationSettings,
        noise: NoiseSource,
    ) -> Result<Self, EstimateError> {
        inputs.validate()?;
        settings.validate().map_err(EstimateError::InvalidInput)?;

        let speed = model.service_speed(inputs.staff_experience) * settings.speed_factor;
        // epsilon absorbs float error in products like 6 * (1 / 1.2)
        let capacity = (f64::from(inputs.effective_staff()) * speed + 1e-9)
            .floor()
            .max(1.0) as u32;
        let remaining = inputs.people_ahead;

        Ok(Self {
            model,
            noise,
            inputs,
            settings,
            status: SimulationStatus::Idle,
            capacity,
            tick: 0,
            remaining,
            served: 0,
            arrival_carry: 0.0,
            last: None,
        })
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// People served per tick.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Cancels the run. Returns the last emitted snapshot marked as stopped,
    /// or `None` when the run had already finished or never started.
    pub fn stop(&mut self) -> Option<SimulationState> {
        if self.status.is_terminal() {
            return None;
        }
        self.status = SimulationStatus::Stopped {
            reason: StopReason::Cancelled,
        };
        info!(tick = self.tick, remaining = self.remaining, "Simulation cancelled");
        let last = self.last.as_mut()?;
        last.status = self.status;
        Some(last.clone())
    }

    fn start(&mut self) -> Result<SimulationState, EstimateError> {
        self.status = if self.remaining == 0 {
            SimulationStatus::Completed
        } else if self.settings.max_ticks == 0 {
            SimulationStatus::Stopped {
                reason: StopReason::TickLimit,
            }
        } else {
            SimulationStatus::Running
        };
        self.snapshot(0, 0, None)
    }

    fn advance(&mut self) -> Result<SimulationState, EstimateError> {
        let previous = self.remaining;
        let served_this_tick = self.capacity.min(self.remaining);

        self.arrival_carry += self.inputs.arrival_rate;
        let whole_arrivals = self.arrival_carry.floor();
        self.arrival_carry -= whole_arrivals;
        let arrived_this_tick = whole_arrivals as u32;

        self.remaining = (self.remaining - served_this_tick).saturating_add(arrived_this_tick);
        self.served = self.served.saturating_add(served_this_tick);
        self.tick += 1;

        self.status = if self.remaining == 0 {
            info!(ticks = self.tick, served = self.served, "Queue drained");
            SimulationStatus::Completed
        } else if self.tick >= self.settings.max_ticks {
            warn!(
                ticks = self.tick,
                remaining = self.remaining,
                "Tick limit reached before the queue drained"
            );
            SimulationStatus::Stopped {
                reason: StopReason::TickLimit,
            }
        } else {
            SimulationStatus::Running
        };

        self.snapshot(served_this_tick, arrived_this_tick, Some(previous))
    }

    fn snapshot(
        &mut self,
        served_this_tick: u32,
        arrived_this_tick: u32,
        previous: Option<u32>,
    ) -> Result<SimulationState, EstimateError> {
        let inputs = self.inputs.with_people_ahead(self.remaining);
        let estimate = self.model.estimate(&inputs, &mut self.noise)?;
        let mood = classify(estimate.minutes, &self.settings.mood_thresholds);
        let alert_threshold = self.crossed_threshold(previous);

        let snapshot = SimulationState {
            tick: self.tick,
            elapsed: self.settings.tick_interval.saturating_mul(self.tick),
            remaining_in_queue: self.remaining,
            served_count: self.served,
            served_this_tick,
            arrived_this_tick,
            current_wait_estimate: estimate,
            mood,
            status: self.status,
            turn_coming_soon: alert_threshold.is_some(),
            alert_threshold,
        };
        debug!(
            tick = snapshot.tick,
            remaining = snapshot.remaining_in_queue,
            minutes = snapshot.current_wait_estimate.minutes,
            "Simulation tick"
        );
        self.last = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Smallest threshold reached this tick that the previous snapshot was
    /// above. The starting snapshot has no previous one and never alerts.
    fn crossed_threshold(&self, previous: Option<u32>) -> Option<u32> {
        let previous = previous?;
        if self.remaining == 0 {
            return None;
        }
        self.settings
            .alert_thresholds
            .iter()
            .copied()
            .filter(|threshold| self.remaining <= *threshold && previous > *threshold)
            .min()
    }
}

impl Iterator for LiveQueueSimulator {
    type Item = Result<SimulationState, EstimateError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.status {
            SimulationStatus::Completed | SimulationStatus::Stopped { .. } => return None,
            SimulationStatus::Idle => self.start(),
            SimulationStatus::Running => self.advance(),
        };
        if let Err(err) = &result {
            warn!(error = %err, tick = self.tick, "Simulation aborted");
            self.status = SimulationStatus::Stopped {
                reason: StopReason::EstimateFailed,
            };
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::formula_v1::{ExperiencePolarity, FormulaParams, FormulaV1Model};
    use crate::queue::{QueueInputs, StaffExperience};

    fn formula() -> Arc<dyn EstimationModel> {
        Arc::new(FormulaV1Model::with_defaults())
    }

    fn run(inputs: QueueInputs, settings: SimulationSettings) -> Vec<SimulationState> {
        simulate(formula(), inputs, settings, NoiseSource::deterministic())
            .expect("valid simulation")
            .collect::<Result<Vec<_>, _>>()
            .expect("estimates succeed")
    }

    #[test]
    fn drains_queue_in_three_ticks() {
        let snapshots = run(QueueInputs::new(5, 3.0, 2), SimulationSettings::default());

        let remaining: Vec<u32> = snapshots.iter().map(|s| s.remaining_in_queue).collect();
        let served: Vec<u32> = snapshots.iter().map(|s| s.served_count).collect();
        assert_eq!(remaining, vec![5, 3, 1, 0]);
        assert_eq!(served, vec![0, 2, 4, 5]);

        let last = snapshots.last().expect("final snapshot");
        assert_eq!(last.tick, 3);
        assert_eq!(last.served_this_tick, 1);
        assert_eq!(last.status, SimulationStatus::Completed);
        assert_eq!(last.current_wait_estimate.minutes, 0.0);
        assert!(
            snapshots[..3]
                .iter()
                .all(|s| s.status == SimulationStatus::Running)
        );
    }

    #[test]
    fn each_tick_re_estimates_remaining_queue() {
        let snapshots = run(QueueInputs::new(5, 3.0, 2), SimulationSettings::default());

        let minutes: Vec<f64> = snapshots
            .iter()
            .map(|s| s.current_wait_estimate.minutes)
            .collect();
        // remaining * 3.0 / 2
        assert_eq!(minutes, vec![7.5, 4.5, 1.5, 0.0]);
        assert!(snapshots.iter().all(|s| s.mood == MoodLabel::Low));
    }

    #[test]
    fn empty_queue_completes_immediately() {
        let snapshots = run(QueueInputs::new(0, 3.0, 2), SimulationSettings::default());

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].tick, 0);
        assert_eq!(snapshots[0].status, SimulationStatus::Completed);
    }

    #[test]
    fn arrivals_outpacing_service_hit_tick_limit() {
        let mut inputs = QueueInputs::new(4, 2.0, 1);
        inputs.arrival_rate = 2.0;
        let settings = SimulationSettings {
            max_ticks: 10,
            ..SimulationSettings::default()
        };

        let snapshots = run(inputs, settings);

        assert_eq!(snapshots.len(), 11);
        let last = snapshots.last().expect("final snapshot");
        assert_eq!(last.tick, 10);
        assert_eq!(last.remaining_in_queue, 14);
        assert_eq!(
            last.status,
            SimulationStatus::Stopped {
                reason: StopReason::TickLimit
            }
        );
    }

    #[test]
    fn fractional_arrivals_carry_over() {
        let mut inputs = QueueInputs::new(10, 1.0, 1);
        inputs.arrival_rate = 0.5;

        let snapshots = run(inputs, SimulationSettings::default());

        let arrived: Vec<u32> = snapshots
            .iter()
            .skip(1)
            .take(4)
            .map(|s| s.arrived_this_tick)
            .collect();
        assert_eq!(arrived, vec![0, 1, 0, 1]);
        // net drain of half a person per tick
        assert_eq!(snapshots.last().map(|s| s.tick), Some(19));
    }

    #[test]
    fn speed_factor_scales_capacity_with_floor_of_one() {
        let fast = simulate(
            formula(),
            QueueInputs::new(9, 1.0, 3),
            SimulationSettings {
                speed_factor: 1.5,
                ..SimulationSettings::default()
            },
            NoiseSource::deterministic(),
        )
        .expect("valid simulation");
        let slow = simulate(
            formula(),
            QueueInputs::new(9, 1.0, 1),
            SimulationSettings {
                speed_factor: 0.4,
                ..SimulationSettings::default()
            },
            NoiseSource::deterministic(),
        )
        .expect("valid simulation");

        assert_eq!(fast.capacity(), 4);
        assert_eq!(slow.capacity(), 1);
    }

    #[test]
    fn alert_flags_threshold_crossings() {
        let snapshots = run(QueueInputs::new(5, 3.0, 2), SimulationSettings::default());

        let alerts: Vec<Option<u32>> = snapshots.iter().map(|s| s.alert_threshold).collect();
        assert_eq!(alerts, vec![None, Some(3), Some(1), None]);
        assert!(snapshots[1].turn_coming_soon);
        assert!(!snapshots[3].turn_coming_soon);
    }

    #[test]
    fn alert_reports_smallest_threshold_when_skipping_several() {
        let settings = SimulationSettings {
            alert_thresholds: vec![5, 3, 1],
            ..SimulationSettings::default()
        };

        let snapshots = run(QueueInputs::new(8, 1.0, 6), settings);

        assert_eq!(snapshots[1].remaining_in_queue, 2);
        assert_eq!(snapshots[1].alert_threshold, Some(3));
    }

    #[test]
    fn stop_ends_the_sequence_and_keeps_last_snapshot() {
        let mut sim = simulate(
            formula(),
            QueueInputs::new(10, 2.0, 1),
            SimulationSettings::default(),
            NoiseSource::deterministic(),
        )
        .expect("valid simulation");

        assert_eq!(sim.status(), SimulationStatus::Idle);
        let first = sim.next().expect("initial").expect("estimate");
        let second = sim.next().expect("tick").expect("estimate");
        assert_eq!(first.remaining_in_queue, 10);

        let stopped = sim.stop().expect("last snapshot");

        assert_eq!(stopped.remaining_in_queue, second.remaining_in_queue);
        assert_eq!(
            stopped.status,
            SimulationStatus::Stopped {
                reason: StopReason::Cancelled
            }
        );
        assert!(sim.next().is_none());
        assert!(sim.stop().is_none());
    }

    #[test]
    fn invalid_inputs_fail_at_construction() {
        let result = simulate(
            formula(),
            QueueInputs::new(3, 0.0, 1),
            SimulationSettings::default(),
            NoiseSource::deterministic(),
        );

        assert!(matches!(result, Err(EstimateError::InvalidInput(_))));
    }

    #[test]
    fn invalid_speed_factor_is_rejected() {
        let result = simulate(
            formula(),
            QueueInputs::new(3, 1.0, 1),
            SimulationSettings {
                speed_factor: 0.0,
                ..SimulationSettings::default()
            },
            NoiseSource::deterministic(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn elapsed_tracks_tick_interval() {
        let settings = SimulationSettings {
            tick_interval: Duration::from_millis(250),
            ..SimulationSettings::default()
        };

        let snapshots = run(QueueInputs::new(5, 3.0, 2), settings);

        assert_eq!(
            snapshots.last().map(|s| s.elapsed),
            Some(Duration::from_millis(750))
        );
    }

    #[test]
    fn elapsed_saturates_for_huge_intervals() {
        let mut inputs = QueueInputs::new(4, 2.0, 1);
        inputs.arrival_rate = 1.0;
        let settings = SimulationSettings {
            tick_interval: Duration::from_secs(u64::MAX / 2),
            max_ticks: 5,
            ..SimulationSettings::default()
        };

        let snapshots = run(inputs, settings);

        assert_eq!(snapshots.len(), 6);
        assert_eq!(snapshots[1].elapsed, Duration::from_secs(u64::MAX / 2));
        assert_eq!(snapshots.last().map(|s| s.elapsed), Some(Duration::MAX));
    }

    #[test]
    fn expert_crew_drains_faster_than_new_crew() {
        let mut new_crew = QueueInputs::new(12, 2.0, 4);
        new_crew.staff_experience = StaffExperience::New;
        let mut expert_crew = QueueInputs::new(12, 2.0, 4);
        expert_crew.staff_experience = StaffExperience::Expert;

        let new_run = run(new_crew, SimulationSettings::default());
        let expert_run = run(expert_crew, SimulationSettings::default());

        let new_remaining: Vec<u32> = new_run.iter().map(|s| s.remaining_in_queue).collect();
        let expert_remaining: Vec<u32> =
            expert_run.iter().map(|s| s.remaining_in_queue).collect();
        assert_eq!(new_remaining, vec![12, 9, 6, 3, 0]);
        assert_eq!(expert_remaining, vec![12, 7, 2, 0]);
    }

    #[test]
    fn service_speed_follows_model_polarity() {
        let inverted: Arc<dyn EstimationModel> = Arc::new(FormulaV1Model::new(FormulaParams {
            experience_polarity: ExperiencePolarity::Inverted,
            ..FormulaParams::default()
        }));
        let mut inputs = QueueInputs::new(12, 2.0, 4);
        inputs.staff_experience = StaffExperience::New;

        let sim = simulate(
            inverted,
            inputs,
            SimulationSettings::default(),
            NoiseSource::deterministic(),
        )
        .expect("valid simulation");

        // 4 staff / 0.8
        assert_eq!(sim.capacity(), 5);
    }

    #[test]
    fn starting_snapshot_never_alerts() {
        let snapshots = run(QueueInputs::new(2, 1.0, 1), SimulationSettings::default());

        let alerts: Vec<(u32, u32, Option<u32>)> = snapshots
            .iter()
            .map(|s| (s.tick, s.remaining_in_queue, s.alert_threshold))
            .collect();
        assert_eq!(alerts, vec![(0, 2, None), (1, 1, Some(1)), (2, 0, None)]);
        assert!(!snapshots[0].turn_coming_soon);
    }

    #[test]
    fn status_serializes_with_tag() -> Result<(), Box<dyn std::error::Error>> {
        let value = serde_json::to_value(SimulationStatus::Stopped {
            reason: StopReason::TickLimit,
        })?;

        assert_eq!(
            value,
            serde_json::json!({ "state": "stopped", "reason": "tick_limit" })
        );
        Ok(())
    }
}
