//! Supervised fine-tuning loop
//!
//! A custom training loop over Burn's optimizer API rather than the
//! high-level learner: shuffle indices each epoch, batch on demand,
//! forward to log-probabilities, take the negative log-likelihood loss,
//! and step Adam at a fixed learning rate. Only the classifier head
//! receives gradients; the backbone output is detached.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, backend::Backend, ElementConversion, Int, Tensor},
};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::burn_dataset::{VehicleBatcher, VehicleTensorDataset};
use crate::dataset::loader::VehicleDataset;
use crate::dataset::split::{SplitConfig, TrainValSplit};
use crate::dataset::CLASS_NAMES;
use crate::inference::evaluator::evaluate;
use crate::model::classifier::EmergencyClassifierConfig;
use crate::training::TrainingConfig;
use crate::utils::error::Result;
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::{AccuracyTracker, RunningAverage};
use crate::{IMAGE_SIZE, NUM_CLASSES};

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Average loss per epoch, in epoch order
    pub epoch_losses: Vec<f64>,
    /// Batch-averaged accuracy over the training set, in `[0, 1]`
    pub training_accuracy: f64,
    /// Batch-averaged accuracy over the validation set, in `[0, 1]`
    pub validation_accuracy: f64,
    /// Number of training samples
    pub training_samples: usize,
    /// Number of validation samples
    pub validation_samples: usize,
}

/// Negative log-likelihood loss over log-probabilities.
///
/// Equivalent to cross-entropy of the underlying logits: the model's
/// final layer is a log-softmax, so picking the target log-probability
/// and negating the mean is the whole loss.
pub fn nll_loss<B: Backend>(log_probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [batch_size, _num_classes] = log_probs.dims();

    let indices = targets.reshape([batch_size, 1]);
    let picked = log_probs.gather(1, indices);

    picked.mean().neg()
}

/// Run the full pipeline: load, split, build, train, evaluate.
///
/// # Type Parameters
/// * `B` - The autodiff backend to use (e.g. `Autodiff<NdArray>`)
pub fn run_training<B>(config: &TrainingConfig) -> Result<TrainingReport>
where
    B: AutodiffBackend,
{
    config.validate()?;

    println!("{}", "Initializing Training...".green().bold());

    let device = B::Device::default();
    println!("  Device: {:?}", device);

    // Load the dataset; a missing or unreadable image fails here, before
    // any training happens
    println!("{}", "Loading Dataset...".cyan());
    let dataset = VehicleDataset::from_manifest(&config.csv_path, &config.images_dir)?;
    let stats = dataset.stats();
    stats.print();

    // Stratified train/validation split with a fixed seed
    println!();
    println!("{}", "Creating Stratified Data Split...".cyan());
    let split_config = SplitConfig {
        validation_fraction: config.validation_fraction,
        seed: config.seed,
        stratified: true,
    };
    let splits = TrainValSplit::from_samples(dataset.samples.clone(), split_config)?;

    println!(
        "  Training tensors:   [{}, 3, {}, {}]",
        splits.training_len(),
        IMAGE_SIZE,
        IMAGE_SIZE
    );
    println!(
        "  Validation tensors: [{}, 3, {}, {}]",
        splits.validation_len(),
        IMAGE_SIZE,
        IMAGE_SIZE
    );

    // Pre-load every image into memory
    println!();
    println!("{}", "Pre-loading Training Data...".cyan().bold());
    let train_dataset = VehicleTensorDataset::new_cached(&splits.training, IMAGE_SIZE)?;

    println!("{}", "Pre-loading Validation Data...".cyan().bold());
    let val_dataset = VehicleTensorDataset::new_cached(&splits.validation, IMAGE_SIZE)?;

    let batcher = VehicleBatcher::new();

    // Build the model: frozen backbone, fresh trainable head
    println!();
    println!("{}", "Creating Model...".cyan());
    let model_config = EmergencyClassifierConfig::new();
    let mut model = model_config.init::<B>(&device);

    model = match &config.pretrained {
        Some(path) => {
            println!("  Pretrained backbone: {:?}", path);
            model.with_pretrained_backbone(path, &device)?
        }
        None => {
            warn!("No pretrained backbone record given; backbone weights are randomly initialized");
            model
        }
    };

    let mut optimizer = AdamConfig::new().init();

    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  📊 Total samples:      {}", splits.total_samples);
    println!("  🏷️  Training samples:   {}", splits.training_len());
    println!("  ✅ Validation samples: {}", splits.validation_len());
    println!("  🔄 Epochs:             {}", config.epochs);
    println!("  📦 Batch size:         {}", config.batch_size);
    println!("  📈 Learning rate:      {}", config.learning_rate);
    println!();

    println!("{}", "Starting Training...".green().bold());
    println!();

    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut logger = TrainingLogger::new(config.epochs);
    let mut epoch_losses = Vec::with_capacity(config.epochs);

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);

        let mut epoch_loss = RunningAverage::new();
        let mut train_accuracy = AccuracyTracker::new();

        let shuffled_indices = shuffled_indices(train_dataset.len(), &mut epoch_rng);
        let num_batches = shuffled_indices.len().div_ceil(config.batch_size);

        for batch_idx in 0..num_batches {
            let start = batch_idx * config.batch_size;
            let end = (start + config.batch_size).min(shuffled_indices.len());
            let items: Vec<_> = shuffled_indices[start..end]
                .iter()
                .filter_map(|&i| train_dataset.get(i))
                .collect();

            if items.is_empty() {
                continue;
            }

            let batch = batcher.batch(items, &device);
            let batch_len = batch.targets.dims()[0];

            // Forward pass to log-probabilities
            let log_probs = model.forward(batch.images);
            let loss = nll_loss(log_probs.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            epoch_loss.add(loss_value);

            let predictions = log_probs.argmax(1).reshape([batch_len]);
            let batch_correct: i64 = predictions
                .equal(batch.targets)
                .int()
                .sum()
                .into_scalar()
                .elem();
            train_accuracy.add_correct(batch_correct as usize, batch_len);

            // Backward pass; the backbone is detached, so the gradients
            // cover only the head parameters
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        let avg_loss = epoch_loss.average();
        epoch_losses.push(avg_loss);
        logger.end_epoch(avg_loss);

        println!(
            "  {} epoch {:>3}/{} | training loss: {:.4} | running acc: {:.4}",
            "→".cyan(),
            epoch + 1,
            config.epochs,
            avg_loss,
            train_accuracy.accuracy()
        );
    }

    // Final evaluation over shuffled batches of both splits, without
    // gradient tracking
    println!();
    println!("{}", "Evaluating...".cyan().bold());

    let train_eval = evaluate(&model, &train_dataset, config.batch_size, config.seed);
    let val_eval = evaluate(&model, &val_dataset, config.batch_size, config.seed);

    println!();
    println!("  training accuracy:   {:.4}", train_eval.accuracy);
    println!("  validation accuracy: {:.4}", val_eval.accuracy);

    let class_names: Vec<&str> = CLASS_NAMES.to_vec();
    println!("{}", val_eval.confusion.display(Some(&class_names)));

    for class in 0..NUM_CLASSES {
        println!(
            "  {:15} precision: {:.4} | recall: {:.4}",
            CLASS_NAMES[class],
            val_eval.confusion.precision(class),
            val_eval.confusion.recall(class)
        );
    }

    logger.log_complete(train_eval.accuracy, val_eval.accuracy);
    info!("Model is discarded at process exit; no weights are persisted");

    println!();
    println!("{}", "Training Complete!".green().bold());

    Ok(TrainingReport {
        epoch_losses,
        training_accuracy: train_eval.accuracy,
        validation_accuracy: val_eval.accuracy,
        training_samples: splits.training_len(),
        validation_samples: splits.validation_len(),
    })
}

/// Shuffled sample indices for one epoch
fn shuffled_indices(len: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
}
