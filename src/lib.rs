//! # Emergency Vehicle Classification
//!
//! A Rust library for classifying vehicle images as emergency or
//! non-emergency by fine-tuning a ResNet-18 backbone with the Burn
//! framework. The backbone is kept frozen; only a newly attached
//! fully-connected head is trained.
//!
//! ## Pipeline
//!
//! 1. Read a CSV manifest of image file names and binary labels
//! 2. Load and preprocess every image (RGB, 224x224, `[0, 1]` floats)
//! 3. Stratified 90/10 train/validation split with a fixed seed
//! 4. Train the classifier head with Adam at a fixed learning rate
//! 5. Evaluate accuracy over shuffled batches of both splits
//!
//! ## Modules
//!
//! - `dataset`: manifest parsing, image loading, splitting, batching
//! - `model`: ResNet-18 backbone and the trainable classifier head
//! - `training`: the supervised fine-tuning loop
//! - `inference`: batched evaluation without gradient tracking
//! - `utils`: logging, metrics, and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use emergency_vehicles::backend::TrainingBackend;
//! use emergency_vehicles::training::{run_training, TrainingConfig};
//!
//! let config = TrainingConfig::default();
//! let report = run_training::<TrainingBackend>(&config)?;
//! println!("validation accuracy: {:.4}", report.validation_accuracy);
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::burn_dataset::{VehicleBatch, VehicleBatcher, VehicleItem, VehicleTensorDataset};
pub use dataset::loader::{DatasetStats, VehicleDataset, VehicleSample};
pub use dataset::split::{SplitConfig, TrainValSplit};
pub use inference::evaluator::evaluate;
pub use model::classifier::{EmergencyClassifier, EmergencyClassifierConfig};
pub use model::resnet::ResNet18Backbone;
pub use training::supervised::{run_training, TrainingReport};
pub use training::TrainingConfig;
pub use utils::error::{EmergencyVehiclesError, Result};
pub use utils::metrics::{AccuracyTracker, ConfusionMatrix, RunningAverage};

/// Number of output classes (emergency / non-emergency)
pub const NUM_CLASSES: usize = 2;

/// Side length of the square model input
pub const IMAGE_SIZE: usize = 224;

/// Default seed for the train/validation split and epoch shuffling
pub const DEFAULT_SEED: u64 = 13;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
