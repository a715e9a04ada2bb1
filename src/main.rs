use queuecast::advice;
use queuecast::config;
use queuecast::error::AppError;
use queuecast::estimation;
use queuecast::mood::classify;
use queuecast::simulation::{self, driver};
use queuecast::state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(config.log_level()?);
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "queuecast starting"
    );

    let inputs = config.queue_inputs()?;
    let settings = config.simulation_settings()?;
    let mut noise = config.noise_source();
    let state = Arc::new(RwLock::new(AppState::new()));

    // Load calibration/model
    let model = estimation::load_model_or_default(config.calibration_path());
    let model: Arc<dyn estimation::model::EstimationModel> = Arc::from(model);
    state
        .write()
        .map_err(|_| AppError::StateLock)?
        .set_model(Arc::clone(&model));

    let _wait_rx = state
        .read()
        .map_err(|_| AppError::StateLock)?
        .subscribe_wait_time();
    let estimate = estimation::update_wait_time(&state, &inputs, &mut noise)?;
    let mood = classify(estimate.minutes, &settings.mood_thresholds);
    tracing::info!(
        model = model.name(),
        mode = ?noise.mode(),
        minutes = estimate.minutes,
        mood = %mood,
        color = mood.color(),
        "Predicted waiting time"
    );
    for (name, value) in estimate.factors.named_terms() {
        tracing::info!(factor = name, value, "Estimate factor");
    }

    let now = OffsetDateTime::now_utc();
    match advice::expected_serving_time(now, estimate.minutes).map(advice::format_clock) {
        Some(Ok(clock)) => tracing::info!(serving_at = %clock, "Expected serving time (UTC)"),
        Some(Err(e)) => tracing::warn!(error = %e, "Failed to format serving time"),
        None => tracing::warn!("Serving time out of range"),
    }

    let suggestion = advice::suggest_extra_staff(model.as_ref(), &inputs, &mut noise)?;
    tracing::info!(
        current_minutes = suggestion.current_minutes,
        improved_minutes = suggestion.improved_minutes,
        minutes_saved = suggestion.minutes_saved,
        best_time = advice::best_visit_window(inputs.is_peak_hour),
        "Optimization suggestion"
    );
    let projection = advice::project_queue_growth(inputs.people_ahead, inputs.arrival_rate, 6);
    tracing::info!(projection = %serde_json::to_string(&projection)?, "Queue growth without service");

    // Live countdown on a blocking thread, cancelled by ctrl-c
    let mut sim = simulation::simulate(Arc::clone(&model), inputs, settings, noise)?;
    let stop = Arc::new(AtomicBool::new(false));
    let mut snapshot_rx = state
        .read()
        .map_err(|_| AppError::StateLock)?
        .subscribe_snapshot();
    let mut handle = {
        let state = Arc::clone(&state);
        let stop = Arc::clone(&stop);
        tokio::task::spawn_blocking(move || driver::run_paced(&mut sim, &state, &stop))
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut snapshots_open = true;
    let status = loop {
        tokio::select! {
            changed = snapshot_rx.changed(), if snapshots_open => {
                if changed.is_err() {
                    snapshots_open = false;
                    continue;
                }
                let snapshot = snapshot_rx.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    tracing::info!(
                        tick = snapshot.tick,
                        remaining = snapshot.remaining_in_queue,
                        served = snapshot.served_count,
                        minutes = snapshot.current_wait_estimate.minutes,
                        mood = %snapshot.mood,
                        "Live queue update"
                    );
                    if let Some(threshold) = snapshot.alert_threshold {
                        tracing::info!(threshold, "Your turn is coming soon");
                    }
                }
            }
            result = &mut ctrl_c, if !stop.load(Ordering::Relaxed) => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Failed to listen for ctrl-c");
                }
                tracing::info!("Stopping live countdown");
                stop.store(true, Ordering::Relaxed);
            }
            joined = &mut handle => {
                break joined??;
            }
        }
    };

    let summary = state
        .read()
        .map_err(|_| AppError::StateLock)?
        .snapshot()
        .cloned();
    tracing::info!(status = ?status, "Live countdown finished");
    if let Some(snapshot) = summary {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}
