//! Train/validation split
//!
//! Partitions the dataset once into a training set (90% by default) and a
//! validation set (10%), preserving class proportions. The split is
//! deterministic for a fixed seed: the validation total is
//! `ceil(total * fraction)` and per-class quotas are assigned by largest
//! fractional remainder, so a 1646-sample dataset always yields 1481
//! training and 165 validation samples.

use std::collections::HashMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::loader::VehicleSample;
use crate::utils::error::{EmergencyVehiclesError, Result};
use crate::DEFAULT_SEED;

/// Configuration for the train/validation split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of data held out for validation
    pub validation_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Preserve class proportions in both subsets
    pub stratified: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.1,
            seed: DEFAULT_SEED,
            stratified: true,
        }
    }
}

impl SplitConfig {
    /// Create a new split configuration
    pub fn new(validation_fraction: f64, seed: u64) -> Result<Self> {
        if validation_fraction <= 0.0 || validation_fraction >= 1.0 {
            return Err(EmergencyVehiclesError::Config(
                "Validation fraction must be strictly between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(Self {
            validation_fraction,
            seed,
            stratified: true,
        })
    }
}

/// Result of a single train/validation partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainValSplit {
    /// Training samples
    pub training: Vec<VehicleSample>,
    /// Validation samples
    pub validation: Vec<VehicleSample>,
    /// Configuration used to create the split
    pub config: SplitConfig,
    /// Total number of samples before splitting
    pub total_samples: usize,
}

impl TrainValSplit {
    /// Split samples into training and validation subsets
    pub fn from_samples(samples: Vec<VehicleSample>, config: SplitConfig) -> Result<Self> {
        let total_samples = samples.len();

        if total_samples == 0 {
            return Err(EmergencyVehiclesError::Dataset(
                "No samples provided for splitting".to_string(),
            ));
        }

        if config.validation_fraction <= 0.0 || config.validation_fraction >= 1.0 {
            return Err(EmergencyVehiclesError::Config(
                "Validation fraction must be strictly between 0.0 and 1.0".to_string(),
            ));
        }

        let n_validation = (total_samples as f64 * config.validation_fraction).ceil() as usize;
        if n_validation == 0 || n_validation >= total_samples {
            return Err(EmergencyVehiclesError::Dataset(format!(
                "Validation fraction {} leaves no data to train on ({} samples)",
                config.validation_fraction, total_samples
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let (mut training, mut validation) = if config.stratified {
            Self::stratified_split(samples, n_validation, &mut rng)
        } else {
            Self::random_split(samples, n_validation, &mut rng)
        };

        // Present both subsets in a shuffled order, not grouped by class
        training.shuffle(&mut rng);
        validation.shuffle(&mut rng);

        Ok(Self {
            training,
            validation,
            config,
            total_samples,
        })
    }

    /// Stratified partition with exact per-class validation quotas.
    ///
    /// Quotas start at `floor(count * fraction)` per class; the remaining
    /// slots up to the overall validation total go to the classes with the
    /// largest fractional remainders (ties broken by class index).
    fn stratified_split(
        samples: Vec<VehicleSample>,
        n_validation: usize,
        rng: &mut ChaCha8Rng,
    ) -> (Vec<VehicleSample>, Vec<VehicleSample>) {
        let total = samples.len();
        let fraction = n_validation as f64 / total as f64;

        // Group samples by class
        let mut by_class: HashMap<usize, Vec<VehicleSample>> = HashMap::new();
        for sample in samples {
            by_class.entry(sample.label).or_default().push(sample);
        }

        let mut classes: Vec<usize> = by_class.keys().copied().collect();
        classes.sort_unstable();

        // Base quota and fractional remainder per class
        let mut quotas: Vec<(usize, usize, f64)> = classes
            .iter()
            .map(|&class| {
                let count = by_class[&class].len();
                let raw = count as f64 * fraction;
                let base = raw.floor() as usize;
                (class, base, raw - base as f64)
            })
            .collect();

        let assigned: usize = quotas.iter().map(|(_, base, _)| base).sum();
        let mut leftover = n_validation.saturating_sub(assigned);

        // Largest remainder first; class index breaks ties deterministically
        quotas.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap().then(a.0.cmp(&b.0)));
        for quota in quotas.iter_mut() {
            if leftover == 0 {
                break;
            }
            if quota.1 < by_class[&quota.0].len() {
                quota.1 += 1;
                leftover -= 1;
            }
        }
        quotas.sort_by_key(|(class, _, _)| *class);

        let mut training = Vec::new();
        let mut validation = Vec::new();

        for (class, quota, _) in quotas {
            let mut class_samples = by_class.remove(&class).unwrap_or_default();
            class_samples.shuffle(rng);

            for (i, sample) in class_samples.into_iter().enumerate() {
                if i < quota {
                    validation.push(sample);
                } else {
                    training.push(sample);
                }
            }
        }

        (training, validation)
    }

    /// Plain random partition without class balancing
    fn random_split(
        mut samples: Vec<VehicleSample>,
        n_validation: usize,
        rng: &mut ChaCha8Rng,
    ) -> (Vec<VehicleSample>, Vec<VehicleSample>) {
        samples.shuffle(rng);
        let training = samples.split_off(n_validation);
        (training, samples)
    }

    /// Number of training samples
    pub fn training_len(&self) -> usize {
        self.training.len()
    }

    /// Number of validation samples
    pub fn validation_len(&self) -> usize {
        self.validation.len()
    }

    /// Class counts for a subset, indexed by label
    pub fn class_counts(samples: &[VehicleSample], num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for sample in samples {
            if sample.label < num_classes {
                counts[sample.label] += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn make_samples(per_class: &[usize]) -> Vec<VehicleSample> {
        let mut samples = Vec::new();
        let mut id = 0;
        for (label, &count) in per_class.iter().enumerate() {
            for i in 0..count {
                samples.push(VehicleSample {
                    path: PathBuf::from(format!("class_{}/img_{}.jpg", label, i)),
                    label,
                    image_name: format!("img_{}.jpg", i),
                    id,
                });
                id += 1;
            }
        }
        samples
    }

    #[test]
    fn test_split_sizes_match_reference_dataset() {
        // 1646 rows at 10% validation must give exactly 1481/165
        let samples = make_samples(&[965, 681]);
        let splits = TrainValSplit::from_samples(samples, SplitConfig::default()).unwrap();

        assert_eq!(splits.total_samples, 1646);
        assert_eq!(splits.training_len(), 1481);
        assert_eq!(splits.validation_len(), 165);
    }

    #[test]
    fn test_all_samples_accounted_for() {
        let samples = make_samples(&[100, 57]);
        let splits = TrainValSplit::from_samples(samples, SplitConfig::default()).unwrap();

        assert_eq!(
            splits.training_len() + splits.validation_len(),
            splits.total_samples
        );
    }

    #[test]
    fn test_stratified_preserves_class_proportions() {
        let samples = make_samples(&[900, 100]);
        let splits = TrainValSplit::from_samples(samples, SplitConfig::default()).unwrap();

        let val_counts = TrainValSplit::class_counts(&splits.validation, 2);
        // 10% of each class: 90 and 10
        assert_eq!(val_counts, vec![90, 10]);
    }

    #[test]
    fn test_split_is_deterministic() {
        let config = SplitConfig::default();
        let splits1 =
            TrainValSplit::from_samples(make_samples(&[200, 150]), config.clone()).unwrap();
        let splits2 = TrainValSplit::from_samples(make_samples(&[200, 150]), config).unwrap();

        let ids1: Vec<usize> = splits1.validation.iter().map(|s| s.id).collect();
        let ids2: Vec<usize> = splits2.validation.iter().map(|s| s.id).collect();
        assert_eq!(ids1, ids2);

        let train_ids1: Vec<usize> = splits1.training.iter().map(|s| s.id).collect();
        let train_ids2: Vec<usize> = splits2.training.iter().map(|s| s.id).collect();
        assert_eq!(train_ids1, train_ids2);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = TrainValSplit::from_samples(
            make_samples(&[200, 150]),
            SplitConfig::new(0.1, 13).unwrap(),
        )
        .unwrap();
        let b = TrainValSplit::from_samples(
            make_samples(&[200, 150]),
            SplitConfig::new(0.1, 14).unwrap(),
        )
        .unwrap();

        let ids_a: Vec<usize> = a.validation.iter().map(|s| s.id).collect();
        let ids_b: Vec<usize> = b.validation.iter().map(|s| s.id).collect();
        assert_ne!(ids_a, ids_b);
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        assert!(SplitConfig::new(0.0, 13).is_err());
        assert!(SplitConfig::new(1.0, 13).is_err());
        assert!(SplitConfig::new(1.5, 13).is_err());
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = TrainValSplit::from_samples(Vec::new(), SplitConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_random_split_sizes() {
        let mut config = SplitConfig::default();
        config.stratified = false;

        let splits = TrainValSplit::from_samples(make_samples(&[100, 100]), config).unwrap();
        assert_eq!(splits.validation_len(), 20);
        assert_eq!(splits.training_len(), 180);
    }
}
