//! Shared utilities: error types, logging, and evaluation metrics.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{EmergencyVehiclesError, Result};
pub use logging::{init_logging, LogConfig, LogLevel, ProgressLogger, TrainingLogger};
pub use metrics::{AccuracyTracker, ConfusionMatrix, RunningAverage};
