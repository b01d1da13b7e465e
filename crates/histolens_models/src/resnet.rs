//! ResNet-18-style classifier.
//!
//! Alternative backbone for checkpoints trained on residual networks: 7x7
//! stem, max pool, four residual stages of basic blocks, global average
//! pooling, linear classifier. The final residual stage is exposed for
//! attribution targeting.

use burn::module::AutodiffModule;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{
    AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig,
};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::convnet::{AttributionModel, ConvNet, LayerHandle};
use crate::norm::{FrozenBatchNorm, FrozenBatchNormConfig};

/// Configuration for [`ResNet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResNetConfig {
    /// Number of output classes.
    pub num_classes: usize,
    /// Channels of the first stage; later stages double it.
    pub base_channels: usize,
    /// Basic blocks per stage (2 matches ResNet-18).
    pub blocks_per_stage: usize,
}

impl Default for ResNetConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ResNetConfig {
    /// Create a ResNet-18-shaped config.
    #[must_use]
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            base_channels: 64,
            blocks_per_stage: 2,
        }
    }

    /// Override the first-stage width (reduced widths are used by tests).
    #[must_use]
    pub fn with_base_channels(mut self, base_channels: usize) -> Self {
        self.base_channels = base_channels;
        self
    }

    /// Override the number of blocks per stage.
    #[must_use]
    pub fn with_blocks_per_stage(mut self, blocks_per_stage: usize) -> Self {
        self.blocks_per_stage = blocks_per_stage;
        self
    }

    /// Initialize the model with fresh weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let base = self.base_channels;
        let stem = ConvNorm::new(3, base, 7, 2, true, device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let make_stage = |in_ch: usize, out_ch: usize, stride: usize| {
            let mut blocks = Vec::with_capacity(self.blocks_per_stage);
            blocks.push(BasicBlock::new(in_ch, out_ch, stride, device));
            for _ in 1..self.blocks_per_stage {
                blocks.push(BasicBlock::new(out_ch, out_ch, 1, device));
            }
            blocks
        };

        let layer1 = make_stage(base, base, 1);
        let layer2 = make_stage(base, base * 2, 2);
        let layer3 = make_stage(base * 2, base * 4, 2);
        let layer4 = make_stage(base * 4, base * 8, 2);

        let pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let fc = LinearConfig::new(base * 8, self.num_classes).init(device);

        ResNet {
            stem,
            maxpool,
            layer1,
            layer2,
            layer3,
            layer4,
            pool,
            fc,
            num_classes: self.num_classes,
        }
    }
}

/// Convolution followed by frozen batch norm, optionally ReLU-activated.
#[derive(Module, Debug)]
struct ConvNorm<B: Backend> {
    conv: Conv2d<B>,
    norm: FrozenBatchNorm<B>,
    #[module(skip)]
    relu: bool,
}

impl<B: Backend> ConvNorm<B> {
    fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        relu: bool,
        device: &B::Device,
    ) -> Self {
        let padding = (kernel - 1) / 2;
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_bias(false)
            .init(device);
        let norm = FrozenBatchNormConfig::new(out_channels).init(device);
        Self { conv, norm, relu }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.norm.forward(self.conv.forward(x));
        if self.relu {
            x.clamp_min(0.0)
        } else {
            x
        }
    }
}

/// Two 3x3 convolutions with a residual connection.
#[derive(Module, Debug)]
struct BasicBlock<B: Backend> {
    conv1: ConvNorm<B>,
    conv2: ConvNorm<B>,
    shortcut: Option<ConvNorm<B>>,
    relu: Relu,
}

impl<B: Backend> BasicBlock<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv1 = ConvNorm::new(in_channels, out_channels, 3, stride, true, device);
        let conv2 = ConvNorm::new(out_channels, out_channels, 3, 1, false, device);
        let shortcut = if stride != 1 || in_channels != out_channels {
            Some(ConvNorm::new(in_channels, out_channels, 1, stride, false, device))
        } else {
            None
        };
        Self {
            conv1,
            conv2,
            shortcut,
            relu: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.shortcut {
            Some(projection) => projection.forward(x.clone()),
            None => x.clone(),
        };
        let out = self.conv2.forward(self.conv1.forward(x));
        self.relu.forward(out + identity)
    }
}

/// Residual classifier; see the module docs for the architecture.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    stem: ConvNorm<B>,
    maxpool: MaxPool2d,
    layer1: Vec<BasicBlock<B>>,
    layer2: Vec<BasicBlock<B>>,
    layer3: Vec<BasicBlock<B>>,
    layer4: Vec<BasicBlock<B>>,
    pool: AdaptiveAvgPool2d,
    fc: Linear<B>,
    #[module(skip)]
    num_classes: usize,
}

impl<B: Backend> ResNet<B> {
    fn forward_trunk(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = self.maxpool.forward(self.stem.forward(x));
        for block in self.layer1.iter().chain(&self.layer2).chain(&self.layer3) {
            x = block.forward(x);
        }
        x
    }

    fn classify_features(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let pooled = self.pool.forward(features);
        let [batch, channels, _, _] = pooled.dims();
        self.fc.forward(pooled.reshape([batch, channels]))
    }

    fn block_index(&self, target: LayerHandle) -> usize {
        match target {
            LayerHandle::FinalStageBlock(index) => {
                assert!(
                    index < self.layer4.len(),
                    "final-stage block {index} out of range for {} blocks",
                    self.layer4.len()
                );
                index
            }
            other => panic!("ResNet cannot execute layer handle {other:?}"),
        }
    }
}

impl<B: Backend> ConvNet<B> for ResNet<B> {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.forward_trunk(x);
        for block in &self.layer4 {
            x = block.forward(x);
        }
        self.classify_features(x)
    }

    fn final_stage_len(&self) -> Option<usize> {
        Some(self.layer4.len())
    }

    fn last_conv(&self) -> Option<LayerHandle> {
        Some(LayerHandle::FinalStageBlock(self.layer4.len() - 1))
    }

    fn forward_to(&self, x: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 4> {
        let index = self.block_index(target);
        let mut x = self.forward_trunk(x);
        for block in &self.layer4[..=index] {
            x = block.forward(x);
        }
        x
    }

    fn forward_from(&self, activation: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 2> {
        let index = self.block_index(target);
        let mut x = activation;
        for block in &self.layer4[index + 1..] {
            x = block.forward(x);
        }
        self.classify_features(x)
    }
}

impl<B: AutodiffBackend> AttributionModel<B> for ResNet<B> {
    type Inference = ResNet<B::InnerBackend>;

    fn inference(&self) -> Self::Inference {
        self.clone().valid()
    }
}
