//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` trait and a `Batcher` that turns
//! preprocessed vehicle images into `[N, 3, H, W]` float tensors and `[N]`
//! integer label tensors on the target device.

use std::path::PathBuf;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::loader::{preprocess_image, VehicleSample};
use crate::utils::error::Result;
use crate::utils::logging::ProgressLogger;
use crate::IMAGE_SIZE;

/// A single preprocessed sample ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleItem {
    /// Image data as flattened CHW float array `[3 * H * W]`, values in `[0, 1]`
    pub image: Vec<f32>,
    /// Class label (0 = non-emergency, 1 = emergency)
    pub label: usize,
    /// Image path (for debugging/logging)
    pub path: String,
}

impl VehicleItem {
    /// Create a new item by loading and preprocessing an image
    pub fn from_path(path: &PathBuf, label: usize, image_size: usize) -> Result<Self> {
        let image = preprocess_image(path, image_size)?;

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// In-memory dataset of preprocessed vehicle images implementing Burn's
/// `Dataset` trait.
///
/// The whole dataset is eagerly loaded up front; an unreadable image fails
/// the construction rather than surfacing mid-epoch.
#[derive(Debug, Clone)]
pub struct VehicleTensorDataset {
    items: Vec<VehicleItem>,
    image_size: usize,
}

impl VehicleTensorDataset {
    /// Pre-load every sample into memory
    pub fn new_cached(samples: &[VehicleSample], image_size: usize) -> Result<Self> {
        let mut progress = ProgressLogger::new("Pre-loading images", samples.len());
        let mut items = Vec::with_capacity(samples.len());

        for sample in samples {
            items.push(VehicleItem::from_path(&sample.path, sample.label, image_size)?);
            progress.increment();
        }
        progress.finish();

        info!("Cached {} preprocessed samples", items.len());

        Ok(Self { items, image_size })
    }

    /// Create directly from preprocessed items (used in tests)
    pub fn from_items(items: Vec<VehicleItem>, image_size: usize) -> Self {
        Self { items, image_size }
    }

    /// Target image side length
    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Samples per class, indexed by label
    pub fn class_distribution(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for item in &self.items {
            if item.label < num_classes {
                counts[item.label] += 1;
            }
        }
        counts
    }
}

impl Dataset<VehicleItem> for VehicleTensorDataset {
    fn get(&self, index: usize) -> Option<VehicleItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of vehicle images for training or evaluation
#[derive(Clone, Debug)]
pub struct VehicleBatch<B: Backend> {
    /// Batch of images with shape `[batch_size, 3, height, width]`
    pub images: Tensor<B, 4>,
    /// Batch of labels with shape `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher for creating vehicle training batches
#[derive(Clone, Debug)]
pub struct VehicleBatcher {
    image_size: usize,
}

impl VehicleBatcher {
    /// Create a new batcher for the default model input size
    pub fn new() -> Self {
        Self {
            image_size: IMAGE_SIZE,
        }
    }

    /// Create a batcher with custom image size
    pub fn with_image_size(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl Default for VehicleBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Batcher<B, VehicleItem, VehicleBatch<B>> for VehicleBatcher {
    fn batch(&self, items: Vec<VehicleItem>, device: &B::Device) -> VehicleBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;
        let expected = channels * height * width;

        // Flatten all images into a single vector; a wrong-sized item is a
        // shape error and aborts the run
        let mut images_data: Vec<f32> = Vec::with_capacity(batch_size * expected);
        for item in &items {
            assert_eq!(
                item.image.len(),
                expected,
                "image tensor for '{}' has {} elements, expected {}",
                item.path,
                item.image.len(),
                expected
            );
            images_data.extend_from_slice(&item.image);
        }

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        VehicleBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn test_item(label: usize, size: usize) -> VehicleItem {
        VehicleItem::from_data(vec![0.5f32; 3 * size * size], label, format!("{}.jpg", label))
    }

    #[test]
    fn test_vehicle_item_creation() {
        let item = test_item(1, 32);

        assert_eq!(item.label, 1);
        assert_eq!(item.image.len(), 3 * 32 * 32);
    }

    #[test]
    fn test_dataset_len_and_get() {
        let dataset =
            VehicleTensorDataset::from_items(vec![test_item(0, 32), test_item(1, 32)], 32);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(0).unwrap().label, 0);
        assert_eq!(dataset.get(1).unwrap().label, 1);
        assert!(dataset.get(2).is_none());
    }

    #[test]
    fn test_class_distribution() {
        let dataset = VehicleTensorDataset::from_items(
            vec![test_item(0, 32), test_item(0, 32), test_item(1, 32)],
            32,
        );

        assert_eq!(dataset.class_distribution(2), vec![2, 1]);
    }

    #[test]
    fn test_batcher_shapes() {
        let batcher = VehicleBatcher::with_image_size(32);
        let device = Default::default();

        let batch: VehicleBatch<TestBackend> = batcher.batch(
            vec![test_item(0, 32), test_item(1, 32), test_item(1, 32)],
            &device,
        );

        assert_eq!(batch.images.dims(), [3, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [3]);

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![0, 1, 1]);
    }

    #[test]
    #[should_panic(expected = "elements")]
    fn test_batcher_rejects_shape_mismatch() {
        let batcher = VehicleBatcher::with_image_size(32);
        let device = Default::default();

        // Item preprocessed for a different size
        let _batch: VehicleBatch<TestBackend> = batcher.batch(vec![test_item(0, 16)], &device);
    }
}
