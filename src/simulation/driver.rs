//! Paced execution of a simulation run, publishing each snapshot to `AppState`.

use crate::error::AppError;
use crate::simulation::{LiveQueueSimulator, SimulationState, SimulationStatus};
use crate::state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const SLEEP_STEP: Duration = Duration::from_millis(100);

/// Runs `sim` to a terminal state, waiting the configured tick interval
/// between snapshots. Setting `stop` cancels the run between ticks; the last
/// snapshot is then republished with a stopped status.
pub fn run_paced(
    sim: &mut LiveQueueSimulator,
    state: &Arc<RwLock<AppState>>,
    stop: &AtomicBool,
) -> Result<SimulationStatus, AppError> {
    let interval = sim.settings().tick_interval;
    info!(
        interval_ms = interval.as_millis(),
        capacity = sim.capacity(),
        "Starting live queue simulation"
    );

    while let Some(result) = sim.next() {
        let cycle_start = Instant::now();
        let snapshot = result?;
        let terminal = snapshot.status.is_terminal();
        publish(state, snapshot)?;
        if terminal {
            break;
        }

        sleep_with_stop(interval, stop, cycle_start);

        if stop.load(Ordering::Relaxed) {
            if let Some(stopped) = sim.stop() {
                publish(state, stopped)?;
            }
            break;
        }
    }

    Ok(sim.status())
}

fn publish(state: &Arc<RwLock<AppState>>, snapshot: SimulationState) -> Result<(), AppError> {
    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    if let Err(e) = guard.set_snapshot(snapshot) {
        warn!("No subscribers for simulation snapshot: {}", e);
    }
    Ok(())
}

fn sleep_with_stop(duration: Duration, stop: &AtomicBool, start: Instant) {
    let elapsed = start.elapsed();
    if elapsed >= duration {
        return;
    }
    let remaining = duration - elapsed;
    let mut slept = Duration::ZERO;

    while slept < remaining {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let step = SLEEP_STEP.min(remaining - slept);
        std::thread::sleep(step);
        slept += step;
    }
}
