pub mod advice;
pub mod config;
pub mod error;
pub mod estimation;
pub mod mood;
pub mod queue;
pub mod simulation;
pub mod state;
