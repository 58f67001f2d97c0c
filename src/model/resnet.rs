//! ResNet-18 Backbone
//!
//! Feature extractor built with Burn's `nn` modules:
//! - 7x7 stem convolution with stride 2, followed by 3x3 max pooling
//! - 4 stages of two basic residual blocks (64, 128, 256, 512 channels)
//! - Global average pooling down to a 512-dimensional feature vector
//!
//! Backbone weights can be initialized from a Burn record file exported
//! from a pretrained checkpoint; during fine-tuning the backbone is held
//! fixed and only the classifier head learns.

use std::path::Path;

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor},
};
use tracing::info;

use crate::utils::error::{EmergencyVehiclesError, Result};

/// Dimension of the feature vector produced by the backbone
pub const FEATURE_DIM: usize = 512;

/// 1x1 projection used on the residual path when a stage changes
/// resolution or channel count
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [1, 1])
            .with_stride([stride, stride])
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);

        Self { conv, bn }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// A basic residual block: two 3x3 convolutions with batch norm and a
/// skip connection
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B>,
    downsample: Option<Downsample<B>>,
    relu: Relu,
}

impl<B: Backend> BasicBlock<B> {
    /// Create a new basic block; the first block of a stage downsamples
    /// with `stride` 2 and projects the identity path
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn1 = BatchNormConfig::new(out_channels).init(device);

        let conv2 = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn2 = BatchNormConfig::new(out_channels).init(device);

        let downsample = if stride != 1 || in_channels != out_channels {
            Some(Downsample::new(in_channels, out_channels, stride, device))
        } else {
            None
        };

        Self {
            conv1,
            bn1,
            conv2,
            bn2,
            downsample,
            relu: Relu::new(),
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(projection) => projection.forward(x.clone()),
            None => x.clone(),
        };

        let out = self.conv1.forward(x);
        let out = self.bn1.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv2.forward(out);
        let out = self.bn2.forward(out);

        self.relu.forward(out.add(identity))
    }
}

/// ResNet-18 feature extractor
#[derive(Module, Debug)]
pub struct ResNet18Backbone<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B>,
    maxpool: MaxPool2d,

    // Stage 1: 64 channels
    layer1_block1: BasicBlock<B>,
    layer1_block2: BasicBlock<B>,

    // Stage 2: 128 channels
    layer2_block1: BasicBlock<B>,
    layer2_block2: BasicBlock<B>,

    // Stage 3: 256 channels
    layer3_block1: BasicBlock<B>,
    layer3_block2: BasicBlock<B>,

    // Stage 4: 512 channels
    layer4_block1: BasicBlock<B>,
    layer4_block2: BasicBlock<B>,

    avgpool: AdaptiveAvgPool2d,
    relu: Relu,
}

impl<B: Backend> ResNet18Backbone<B> {
    /// Create a new backbone with randomly initialized weights
    pub fn new(device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([3, 64], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .init(device);
        let bn1 = BatchNormConfig::new(64).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let layer1_block1 = BasicBlock::new(64, 64, 1, device);
        let layer1_block2 = BasicBlock::new(64, 64, 1, device);

        let layer2_block1 = BasicBlock::new(64, 128, 2, device);
        let layer2_block2 = BasicBlock::new(128, 128, 1, device);

        let layer3_block1 = BasicBlock::new(128, 256, 2, device);
        let layer3_block2 = BasicBlock::new(256, 256, 1, device);

        let layer4_block1 = BasicBlock::new(256, 512, 2, device);
        let layer4_block2 = BasicBlock::new(512, 512, 1, device);

        let avgpool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        Self {
            conv1,
            bn1,
            maxpool,
            layer1_block1,
            layer1_block2,
            layer2_block1,
            layer2_block2,
            layer3_block1,
            layer3_block2,
            layer4_block1,
            layer4_block2,
            avgpool,
            relu: Relu::new(),
        }
    }

    /// Load backbone weights from a Burn record file
    pub fn load_pretrained<P: AsRef<Path>>(self, path: P, device: &B::Device) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading pretrained backbone weights from {:?}", path);

        let recorder = CompactRecorder::new();
        self.load_file(path.to_path_buf(), &recorder, device)
            .map_err(|e| {
                EmergencyVehiclesError::Model(format!(
                    "failed to load pretrained backbone from {:?}: {:?}",
                    path, e
                ))
            })
    }

    /// Extract features from a batch of images
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape `[batch_size, 3, height, width]`
    ///
    /// # Returns
    /// * Feature tensor of shape `[batch_size, 512]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.bn1.forward(x);
        let x = self.relu.forward(x);
        let x = self.maxpool.forward(x);

        let x = self.layer1_block1.forward(x);
        let x = self.layer1_block2.forward(x);

        let x = self.layer2_block1.forward(x);
        let x = self.layer2_block2.forward(x);

        let x = self.layer3_block1.forward(x);
        let x = self.layer3_block2.forward(x);

        let x = self.layer4_block1.forward(x);
        let x = self.layer4_block2.forward(x);

        // Global pooling: [B, 512, H, W] -> [B, 512, 1, 1] -> [B, 512]
        let x = self.avgpool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_backbone_feature_shape() {
        let device = Default::default();
        let backbone = ResNet18Backbone::<TestBackend>::new(&device);

        // Small input keeps the test fast; adaptive pooling makes the
        // feature dimension independent of the input size
        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 64, 64], &device);
        let features = backbone.forward(input);

        assert_eq!(features.dims(), [2, FEATURE_DIM]);
    }

    #[test]
    fn test_basic_block_preserves_shape_without_downsampling() {
        let device = Default::default();
        let block = BasicBlock::<TestBackend>::new(64, 64, 1, &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 64, 16, 16], &device);
        let output = block.forward(input);

        assert_eq!(output.dims(), [1, 64, 16, 16]);
    }

    #[test]
    fn test_basic_block_downsamples() {
        let device = Default::default();
        let block = BasicBlock::<TestBackend>::new(64, 128, 2, &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 64, 16, 16], &device);
        let output = block.forward(input);

        assert_eq!(output.dims(), [1, 128, 8, 8]);
    }

    #[test]
    fn test_missing_pretrained_file_is_an_error() {
        let device = Default::default();
        let backbone = ResNet18Backbone::<TestBackend>::new(&device);

        let result = backbone.load_pretrained("/nonexistent/resnet18.mpk", &device);
        assert!(result.is_err());
    }
}
