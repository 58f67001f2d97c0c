//! Training module
//!
//! Provides the supervised fine-tuning loop: the ResNet-18 backbone stays
//! frozen while the classifier head is trained with Adam at a fixed
//! learning rate over shuffled mini-batches.

pub mod supervised;

pub use supervised::{run_training, TrainingReport};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::error::{EmergencyVehiclesError, Result};
use crate::DEFAULT_SEED;

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 30;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 128;

/// Default learning rate for the Adam optimizer
pub const DEFAULT_LEARNING_RATE: f64 = 0.0005;

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Path to the CSV label manifest
    pub csv_path: PathBuf,

    /// Directory containing the images named by the manifest
    pub images_dir: PathBuf,

    /// Number of training epochs
    pub epochs: usize,

    /// Batch size for training and evaluation
    pub batch_size: usize,

    /// Fixed learning rate
    pub learning_rate: f64,

    /// Fraction of data held out for validation
    pub validation_fraction: f64,

    /// Random seed for the split and epoch shuffling
    pub seed: u64,

    /// Optional Burn record file with pretrained backbone weights
    pub pretrained: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("dataset/emergency_train.csv"),
            images_dir: PathBuf::from("dataset/images"),
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            validation_fraction: 0.1,
            seed: DEFAULT_SEED,
            pretrained: None,
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(EmergencyVehiclesError::Config(
                "epochs must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(EmergencyVehiclesError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.learning_rate <= 0.0 {
            return Err(EmergencyVehiclesError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }

        if self.validation_fraction <= 0.0 || self.validation_fraction >= 1.0 {
            return Err(EmergencyVehiclesError::Config(
                "validation_fraction must be strictly between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}
