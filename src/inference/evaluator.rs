//! Model evaluation
//!
//! Runs the classifier in validation mode (inner backend, dropout
//! disabled, no autodiff) over a seeded shuffled permutation of a
//! dataset. Predictions are the arg-max of the log-probability outputs;
//! accuracy is computed per batch and averaged across batches, so the
//! result is reproducible for a fixed model, dataset, and seed.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    tensor::{backend::AutodiffBackend, backend::Backend},
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::burn_dataset::{VehicleBatcher, VehicleTensorDataset};
use crate::model::classifier::EmergencyClassifier;
use crate::utils::metrics::{ConfusionMatrix, RunningAverage};
use crate::NUM_CLASSES;

/// Result of evaluating a model over one dataset
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Batch-averaged accuracy in `[0, 1]`
    pub accuracy: f64,
    /// Confusion matrix over all evaluated samples
    pub confusion: ConfusionMatrix,
    /// Number of batches evaluated
    pub batches: usize,
}

/// Evaluate the model over shuffled batches of a dataset.
///
/// The per-batch accuracies are averaged, matching the reporting scheme
/// of the training pipeline; the shuffle is seeded so repeated runs over
/// the same model yield identical numbers.
pub fn evaluate<B: AutodiffBackend>(
    model: &EmergencyClassifier<B>,
    dataset: &VehicleTensorDataset,
    batch_size: usize,
    seed: u64,
) -> EvaluationResult {
    let device = <B::InnerBackend as Backend>::Device::default();
    let batcher = VehicleBatcher::with_image_size(dataset.image_size());

    // Validation-mode copy on the inner backend: no autodiff, no dropout
    let inner_model = model.clone().valid();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut permutation: Vec<usize> = (0..dataset.len()).collect();
    permutation.shuffle(&mut rng);

    let mut batch_accuracy = RunningAverage::new();
    let mut confusion = ConfusionMatrix::new(NUM_CLASSES);

    for chunk in permutation.chunks(batch_size.max(1)) {
        let items: Vec<_> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();

        if items.is_empty() {
            continue;
        }

        let batch = batcher.batch(items, &device);
        let batch_len = batch.targets.dims()[0];

        let log_probs = inner_model.forward(batch.images);
        let predictions = log_probs.argmax(1).reshape([batch_len]);

        let predicted: Vec<i64> = predictions.into_data().convert::<i64>().to_vec().unwrap_or_default();
        let actual: Vec<i64> = batch.targets.into_data().convert::<i64>().to_vec().unwrap_or_default();

        let mut correct = 0usize;
        for (&pred, &truth) in predicted.iter().zip(actual.iter()) {
            confusion.add(truth as usize, pred as usize);
            if pred == truth {
                correct += 1;
            }
        }

        batch_accuracy.add(correct as f64 / batch_len as f64);
    }

    EvaluationResult {
        accuracy: batch_accuracy.average(),
        confusion,
        batches: batch_accuracy.count(),
    }
}
