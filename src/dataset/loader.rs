//! Vehicle dataset loader
//!
//! Resolves the CSV manifest against the image directory and handles
//! decoding and preprocessing of the referenced images. Every file
//! referenced by the manifest must exist before the pipeline proceeds;
//! a missing or unreadable image aborts the run.

use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::manifest::read_manifest;
use crate::dataset::CLASS_NAMES;
use crate::utils::error::{EmergencyVehiclesError, Result};
use crate::{IMAGE_SIZE, NUM_CLASSES};

/// A single image sample with its label and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index (0 = non-emergency, 1 = emergency)
    pub label: usize,
    /// File name as listed in the manifest
    pub image_name: String,
    /// Unique sample ID (manifest row order)
    pub id: usize,
}

/// Emergency vehicle dataset backed by a CSV manifest and an image directory
#[derive(Debug)]
pub struct VehicleDataset {
    /// Directory the image names resolve against
    pub images_dir: PathBuf,
    /// All samples in the dataset
    pub samples: Vec<VehicleSample>,
    /// Target image size (width, height)
    pub image_size: (u32, u32),
}

impl VehicleDataset {
    /// Create a dataset from a manifest CSV and an image directory.
    ///
    /// Every referenced file is checked for existence up front, so a bad
    /// manifest fails here rather than mid-training.
    pub fn from_manifest<P: AsRef<Path>, Q: AsRef<Path>>(
        csv_path: P,
        images_dir: Q,
    ) -> Result<Self> {
        let images_dir = images_dir.as_ref().to_path_buf();
        info!(
            "Loading vehicle dataset: manifest {:?}, images {:?}",
            csv_path.as_ref(),
            images_dir
        );

        if !images_dir.exists() {
            return Err(EmergencyVehiclesError::PathNotFound(images_dir));
        }

        let records = read_manifest(csv_path)?;

        let mut samples = Vec::with_capacity(records.len());
        for (id, record) in records.into_iter().enumerate() {
            let path = images_dir.join(&record.image_names);
            if !path.exists() {
                return Err(EmergencyVehiclesError::PathNotFound(path));
            }

            samples.push(VehicleSample {
                path,
                label: record.label(),
                image_name: record.image_names,
                id,
            });
        }

        info!("Resolved {} samples", samples.len());

        Ok(Self {
            images_dir,
            samples,
            image_size: (IMAGE_SIZE as u32, IMAGE_SIZE as u32),
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Load an image and convert to normalized float tensor data.
    ///
    /// Returns a `Vec<f32>` with shape `[3, height, width]` in CHW format,
    /// pixel values scaled to the `[0, 1]` range.
    pub fn load_image_tensor(&self, sample: &VehicleSample) -> Result<Vec<f32>> {
        let tensor = preprocess_image(&sample.path, self.image_size.0 as usize)?;
        debug!("Loaded image tensor for {:?}", sample.path);
        Ok(tensor)
    }

    /// Get statistics about the dataset
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; NUM_CLASSES];
        for sample in &self.samples {
            if sample.label < NUM_CLASSES {
                class_counts[sample.label] += 1;
            }
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: NUM_CLASSES,
            class_counts,
        }
    }
}

/// Decode an image file and convert it to normalized float tensor data.
///
/// The image is resized to `image_size` x `image_size` with triangle
/// filtering and laid out in CHW order with pixel values in `[0, 1]`.
pub fn preprocess_image(path: &Path, image_size: usize) -> Result<Vec<f32>> {
    let img = ImageReader::open(path)
        .map_err(|e| EmergencyVehiclesError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| EmergencyVehiclesError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    let rgb = img
        .resize_exact(
            image_size as u32,
            image_size as u32,
            image::imageops::FilterType::Triangle,
        )
        .to_rgb8();

    let (width, height) = (image_size, image_size);
    let mut tensor = vec![0.0f32; 3 * height * width];

    for y in 0..height {
        for x in 0..width {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            tensor[y * width + x] = pixel[0] as f32 / 255.0;
            tensor[height * width + y * width + x] = pixel[1] as f32 / 255.0;
            tensor[2 * height * width + y * width + x] = pixel[2] as f32 / 255.0;
        }
    }

    Ok(tensor)
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        for (idx, count) in self.class_counts.iter().enumerate() {
            let name = CLASS_NAMES.get(idx).unwrap_or(&"?");
            let bar_len = (*count as f32 / self.total_samples.max(1) as f32 * 40.0) as usize;
            let bar: String = "█".repeat(bar_len);
            println!("    {:3}. {:15} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write a small test image and return its directory and file name.
    fn write_test_image(name: &str) -> (PathBuf, String) {
        let dir = std::env::temp_dir().join(format!("emergency_vehicles_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut img = image::RgbImage::new(64, 48);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]);
        }
        img.save(dir.join(name)).unwrap();

        (dir, name.to_string())
    }

    #[test]
    fn test_vehicle_sample_creation() {
        let sample = VehicleSample {
            path: PathBuf::from("/test/image.jpg"),
            label: 1,
            image_name: "image.jpg".to_string(),
            id: 42,
        };

        assert_eq!(sample.label, 1);
        assert_eq!(sample.id, 42);
    }

    #[test]
    fn test_missing_image_fails_before_training() {
        let (dir, name) = write_test_image("present.png");
        let csv_path = dir.join("manifest_missing.csv");
        std::fs::write(
            &csv_path,
            format!("image_names,emergency_or_not\n{},0\nmissing.jpg,1\n", name),
        )
        .unwrap();

        let result = VehicleDataset::from_manifest(&csv_path, &dir);
        assert!(matches!(
            result,
            Err(EmergencyVehiclesError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_load_image_tensor_shape_and_range() {
        let (dir, name) = write_test_image("tensor_check.png");
        let csv_path = dir.join("manifest_ok.csv");
        std::fs::write(
            &csv_path,
            format!("image_names,emergency_or_not\n{},1\n", name),
        )
        .unwrap();

        let dataset = VehicleDataset::from_manifest(&csv_path, &dir).unwrap();
        assert_eq!(dataset.len(), 1);

        let tensor = dataset.load_image_tensor(&dataset.samples[0]).unwrap();
        assert_eq!(tensor.len(), 3 * IMAGE_SIZE * IMAGE_SIZE);
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_stats_class_counts() {
        let (dir, name) = write_test_image("stats_check.png");
        let csv_path = dir.join("manifest_stats.csv");
        std::fs::write(
            &csv_path,
            format!(
                "image_names,emergency_or_not\n{},1\n{},0\n{},0\n",
                name, name, name
            ),
        )
        .unwrap();

        let dataset = VehicleDataset::from_manifest(&csv_path, &dir).unwrap();
        let stats = dataset.stats();

        assert_eq!(stats.total_samples, 3);
        assert_eq!(stats.class_counts, vec![2, 1]);
    }
}
