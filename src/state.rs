use crate::error::AppError;
use crate::estimation::formula_v1::FormulaV1Model;
use crate::estimation::model::{EstimationModel, WaitEstimate};
use crate::simulation::SimulationState;
use std::sync::Arc;
use tokio::sync::watch;

/// Latest results shared with the presentation layer.
#[derive(Debug)]
pub struct AppState {
    model: Arc<dyn EstimationModel>,
    wait_time: Option<WaitEstimate>,
    wait_time_tx: watch::Sender<Option<WaitEstimate>>,
    snapshot: Option<SimulationState>,
    snapshot_tx: watch::Sender<Option<SimulationState>>,
}

impl AppState {
    pub fn new() -> Self {
        let (wait_time_tx, _wait_time_rx) = watch::channel(None);
        let (snapshot_tx, _snapshot_rx) = watch::channel(None);
        Self {
            model: Arc::new(FormulaV1Model::with_defaults()),
            wait_time: None,
            wait_time_tx,
            snapshot: None,
            snapshot_tx,
        }
    }

    pub fn model(&self) -> &Arc<dyn EstimationModel> {
        &self.model
    }

    pub fn set_model(&mut self, model: Arc<dyn EstimationModel>) {
        self.model = model;
    }

    pub fn wait_time(&self) -> Option<&WaitEstimate> {
        self.wait_time.as_ref()
    }

    pub fn subscribe_wait_time(&self) -> watch::Receiver<Option<WaitEstimate>> {
        self.wait_time_tx.subscribe()
    }

    pub fn set_wait_time(&mut self, wait_time: WaitEstimate) -> Result<(), AppError> {
        self.wait_time = Some(wait_time.clone());
        self.wait_time_tx
            .send(Some(wait_time))
            .map_err(|_| AppError::WatchSend)
    }

    pub fn snapshot(&self) -> Option<&SimulationState> {
        self.snapshot.as_ref()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<SimulationState>> {
        self.snapshot_tx.subscribe()
    }

    pub fn set_snapshot(&mut self, snapshot: SimulationState) -> Result<(), AppError> {
        self.snapshot = Some(snapshot.clone());
        self.snapshot_tx
            .send(Some(snapshot))
            .map_err(|_| AppError::WatchSend)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
