//! Metrics Module for Model Evaluation
//!
//! Running averages and accuracy tracking for the training loop, plus a
//! confusion matrix for the final evaluation report.

use serde::{Deserialize, Serialize};

/// Running average for tracking scalar metrics during training
#[derive(Debug, Clone, Default)]
pub struct RunningAverage {
    sum: f64,
    count: usize,
}

impl RunningAverage {
    /// Create a new running average
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Get the current average
    pub fn average(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }

    /// Get the count
    pub fn count(&self) -> usize {
        self.count
    }

    /// Reset the running average
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

/// Accuracy tracker over batches of predictions
#[derive(Debug, Clone, Default)]
pub struct AccuracyTracker {
    correct: usize,
    total: usize,
}

impl AccuracyTracker {
    /// Create a new accuracy tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of predictions
    pub fn add_batch(&mut self, predictions: &[usize], ground_truth: &[usize]) {
        for (pred, gt) in predictions.iter().zip(ground_truth.iter()) {
            self.total += 1;
            if pred == gt {
                self.correct += 1;
            }
        }
    }

    /// Add a pre-counted batch
    pub fn add_correct(&mut self, correct: usize, total: usize) {
        self.correct += correct;
        self.total += total;
    }

    /// Get the current accuracy in `[0, 1]`
    pub fn accuracy(&self) -> f64 {
        if self.total > 0 {
            self.correct as f64 / self.total as f64
        } else {
            0.0
        }
    }

    /// Get the number of samples seen
    pub fn count(&self) -> usize {
        self.total
    }

    /// Reset the tracker
    pub fn reset(&mut self) {
        self.correct = 0;
        self.total = 0;
    }
}

/// Confusion matrix (row = actual, column = predicted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,
    /// Matrix data, flat in row-major order
    pub matrix: Vec<usize>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create a confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);
        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }
        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Get the total count
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Get the number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Get overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Precision for a class: TP / (TP + FP)
    pub fn precision(&self, class: usize) -> f64 {
        let tp = self.get(class, class);
        let predicted: usize = (0..self.num_classes).map(|row| self.get(row, class)).sum();
        if predicted > 0 {
            tp as f64 / predicted as f64
        } else {
            0.0
        }
    }

    /// Recall for a class: TP / (TP + FN)
    pub fn recall(&self, class: usize) -> f64 {
        let tp = self.get(class, class);
        let actual: usize = (0..self.num_classes).map(|col| self.get(class, col)).sum();
        if actual > 0 {
            tp as f64 / actual as f64
        } else {
            0.0
        }
    }

    /// Pretty print the matrix with optional class names
    pub fn display(&self, class_names: Option<&[&str]>) -> String {
        let mut output = String::new();

        output.push_str("\nConfusion Matrix (rows=actual, cols=predicted):\n\n");

        output.push_str("               ");
        for col in 0..self.num_classes {
            if let Some(names) = class_names {
                let name = names.get(col).unwrap_or(&"?");
                output.push_str(&format!("{:>14}", &name[..name.len().min(14)]));
            } else {
                output.push_str(&format!("{:>14}", col));
            }
        }
        output.push('\n');

        for row in 0..self.num_classes {
            if let Some(names) = class_names {
                let name = names.get(row).unwrap_or(&"?");
                output.push_str(&format!("{:>14} ", &name[..name.len().min(14)]));
            } else {
                output.push_str(&format!("{:>14} ", row));
            }

            for col in 0..self.num_classes {
                let count = self.get(row, col);
                if row == col {
                    output.push_str(&format!("      [{:>5}]", count));
                } else {
                    output.push_str(&format!("       {:>5} ", count));
                }
            }
            output.push('\n');
        }

        output.push_str(&format!("\nAccuracy: {:.4}\n", self.accuracy()));

        output
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_average() {
        let mut avg = RunningAverage::new();

        avg.add(1.0);
        avg.add(2.0);
        avg.add(3.0);

        assert_eq!(avg.count(), 3);
        assert!((avg.average() - 2.0).abs() < 0.001);

        avg.reset();
        assert_eq!(avg.count(), 0);
        assert_eq!(avg.average(), 0.0);
    }

    #[test]
    fn test_accuracy_tracker() {
        let mut tracker = AccuracyTracker::new();

        tracker.add_batch(&[0, 1, 1], &[0, 1, 0]); // 2 correct out of 3

        assert_eq!(tracker.count(), 3);
        assert!((tracker.accuracy() - 2.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_confusion_matrix_binary() {
        let predictions = vec![0, 1, 1, 0, 1];
        let ground_truth = vec![0, 1, 0, 0, 1];

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth, 2);

        assert_eq!(cm.get(0, 0), 2); // non-emergency correctly predicted
        assert_eq!(cm.get(0, 1), 1); // non-emergency predicted as emergency
        assert_eq!(cm.get(1, 1), 2);
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.correct(), 4);
        assert!((cm.accuracy() - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_precision_recall() {
        // actual:    [1, 1, 0, 0]
        // predicted: [1, 0, 1, 0]
        let cm = ConfusionMatrix::from_predictions(&[1, 0, 1, 0], &[1, 1, 0, 0], 2);

        // class 1: TP=1, FP=1, FN=1
        assert!((cm.precision(1) - 0.5).abs() < 0.001);
        assert!((cm.recall(1) - 0.5).abs() < 0.001);
    }
}
