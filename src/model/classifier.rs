//! Emergency Vehicle Classifier
//!
//! Composes the ResNet-18 backbone with a newly initialized
//! fully-connected head:
//!
//! ```text
//! 512 -> Linear(1000) -> ReLU -> Dropout
//!     -> Linear(4096) -> ReLU -> Dropout
//!     -> Linear(2)    -> LogSoftmax
//! ```
//!
//! With `freeze_backbone` set (the default), the backbone output is
//! detached from the autodiff graph, so backpropagation updates only the
//! head parameters.

use burn::{
    config::Config,
    module::Module,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu},
    tensor::{activation::log_softmax, backend::Backend, Tensor},
};

use crate::model::resnet::{ResNet18Backbone, FEATURE_DIM};

/// Configuration for the emergency vehicle classifier
#[derive(Config, Debug)]
pub struct EmergencyClassifierConfig {
    /// Number of output classes
    #[config(default = "2")]
    pub num_classes: usize,

    /// Width of the first hidden layer of the head
    #[config(default = "1000")]
    pub hidden_size_1: usize,

    /// Width of the second hidden layer of the head
    #[config(default = "4096")]
    pub hidden_size_2: usize,

    /// Dropout rate applied after each hidden layer
    #[config(default = "0.5")]
    pub dropout_rate: f64,

    /// Keep the backbone fixed and train only the head
    #[config(default = "true")]
    pub freeze_backbone: bool,
}

impl EmergencyClassifierConfig {
    /// Initialize a classifier with a freshly initialized backbone
    pub fn init<B: Backend>(&self, device: &B::Device) -> EmergencyClassifier<B> {
        let backbone = ResNet18Backbone::new(device);
        let head = ClassifierHead::new(self, device);

        EmergencyClassifier {
            backbone,
            head,
            freeze_backbone: self.freeze_backbone,
            num_classes: self.num_classes,
        }
    }
}

/// Trainable classification head replacing the backbone's original
/// final layer
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    dropout1: Dropout,
    dropout2: Dropout,
    relu: Relu,
}

impl<B: Backend> ClassifierHead<B> {
    /// Create a new head from the classifier configuration
    pub fn new(config: &EmergencyClassifierConfig, device: &B::Device) -> Self {
        let fc1 = LinearConfig::new(FEATURE_DIM, config.hidden_size_1).init(device);
        let fc2 = LinearConfig::new(config.hidden_size_1, config.hidden_size_2).init(device);
        let fc3 = LinearConfig::new(config.hidden_size_2, config.num_classes).init(device);

        let dropout1 = DropoutConfig::new(config.dropout_rate).init();
        let dropout2 = DropoutConfig::new(config.dropout_rate).init();

        Self {
            fc1,
            fc2,
            fc3,
            dropout1,
            dropout2,
            relu: Relu::new(),
        }
    }

    /// Map backbone features to class logits
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fc1.forward(features);
        let x = self.relu.forward(x);
        let x = self.dropout1.forward(x);

        let x = self.fc2.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout2.forward(x);

        self.fc3.forward(x)
    }
}

/// ResNet-18 backbone + trainable head producing log-probabilities
#[derive(Module, Debug)]
pub struct EmergencyClassifier<B: Backend> {
    backbone: ResNet18Backbone<B>,
    head: ClassifierHead<B>,
    freeze_backbone: bool,
    num_classes: usize,
}

impl<B: Backend> EmergencyClassifier<B> {
    /// Forward pass producing log-probabilities
    ///
    /// # Arguments
    /// * `images` - Input tensor of shape `[batch_size, 3, height, width]`
    ///
    /// # Returns
    /// * Log-probability tensor of shape `[batch_size, num_classes]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(images);

        // Detaching cuts the autodiff graph at the backbone boundary, so
        // gradients exist only for head parameters
        let features = if self.freeze_backbone {
            features.detach()
        } else {
            features
        };

        let logits = self.head.forward(features);
        log_softmax(logits, 1)
    }

    /// Forward pass producing probabilities (exponentiated log-softmax)
    pub fn forward_probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(images).exp()
    }

    /// Replace the backbone weights with a pretrained record
    pub fn with_pretrained_backbone<P: AsRef<std::path::Path>>(
        mut self,
        path: P,
        device: &B::Device,
    ) -> crate::utils::error::Result<Self> {
        self.backbone = self.backbone.load_pretrained(path, device)?;
        Ok(self)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_classifier_output_shape() {
        let device = Default::default();
        let config = EmergencyClassifierConfig::new();
        let model = config.init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 64, 64], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 2]);
        assert_eq!(model.num_classes(), 2);
    }

    #[test]
    fn test_output_is_log_probabilities() {
        let device = Default::default();
        let config = EmergencyClassifierConfig::new();
        let model = config.init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [2, 3, 64, 64],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );

        let log_probs = model.forward(input);
        let values: Vec<f32> = log_probs.into_data().to_vec().unwrap();

        // Log-probabilities are non-positive and each row exponentiates to 1
        assert!(values.iter().all(|&v| v <= 1e-5));
        for row in values.chunks(2) {
            let sum: f32 = row.iter().map(|v| v.exp()).sum();
            assert!((sum - 1.0).abs() < 1e-4, "row sums to {}", sum);
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let config = EmergencyClassifierConfig::new();
        let model = config.init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 64, 64],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );

        let probs: Vec<f32> = model
            .forward_probabilities(input)
            .into_data()
            .to_vec()
            .unwrap();

        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_head_shapes() {
        let device = Default::default();
        let config = EmergencyClassifierConfig::new();
        let head = ClassifierHead::<TestBackend>::new(&config, &device);

        let features = Tensor::<TestBackend, 2>::zeros([3, FEATURE_DIM], &device);
        let logits = head.forward(features);

        assert_eq!(logits.dims(), [3, 2]);
    }
}
