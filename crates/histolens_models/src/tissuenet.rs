//! TissueNet: the default histopathology classifier.
//!
//! A MobileNetV2-style backbone sized for 224x224 tissue patches: an
//! expanding stem, seventeen inverted-residual bottlenecks, a 1x1 head
//! convolution, global average pooling, and a linear classifier. The
//! backbone is exposed as a sequential feature stack so attribution can
//! split execution at any stage.

use burn::module::AutodiffModule;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::convnet::{AttributionModel, ConvNet, LayerHandle};
use crate::norm::{FrozenBatchNorm, FrozenBatchNormConfig};

/// Expansion factor, output channels, repeats, first stride per bottleneck
/// group.
const BOTTLENECK_SETTINGS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

/// Round a scaled channel count to the nearest multiple of `divisor`,
/// never dropping more than 10% below the unrounded value.
fn make_divisible(value: f64, divisor: usize) -> usize {
    let rounded = ((value + divisor as f64 / 2.0) / divisor as f64).floor() as usize * divisor;
    let rounded = rounded.max(divisor);
    if (rounded as f64) < 0.9 * value {
        rounded + divisor
    } else {
        rounded
    }
}

/// Configuration for [`TissueNet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TissueNetConfig {
    /// Number of output classes.
    pub num_classes: usize,
    /// Uniform channel width multiplier.
    pub width_mult: f64,
}

impl Default for TissueNetConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

impl TissueNetConfig {
    /// Create a config with the default width multiplier.
    #[must_use]
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            width_mult: 1.0,
        }
    }

    /// Scale all channel counts (reduced widths are used by tests).
    #[must_use]
    pub fn with_width_mult(mut self, width_mult: f64) -> Self {
        self.width_mult = width_mult;
        self
    }

    /// Initialize the model with fresh weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TissueNet<B> {
        let stem_channels = make_divisible(32.0 * self.width_mult, 8);
        let head_channels = make_divisible(1280.0 * self.width_mult.max(1.0), 8);

        let stem = ConvBlock::new(3, stem_channels, 3, 2, 1, true, device);

        let mut blocks = Vec::new();
        let mut in_channels = stem_channels;
        for (expand, channels, repeats, first_stride) in BOTTLENECK_SETTINGS {
            let out_channels = make_divisible(channels as f64 * self.width_mult, 8);
            for repeat in 0..repeats {
                let stride = if repeat == 0 { first_stride } else { 1 };
                blocks.push(InvertedResidual::new(
                    in_channels,
                    out_channels,
                    stride,
                    expand,
                    device,
                ));
                in_channels = out_channels;
            }
        }

        let head = ConvBlock::new(in_channels, head_channels, 1, 1, 1, true, device);
        let pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let classifier = LinearConfig::new(head_channels, self.num_classes).init(device);

        TissueNet {
            stem,
            blocks,
            head,
            pool,
            classifier,
            num_classes: self.num_classes,
        }
    }
}

/// Convolution followed by frozen batch norm, optionally ReLU6-activated.
#[derive(Module, Debug)]
struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: FrozenBatchNorm<B>,
    #[module(skip)]
    relu6: bool,
}

impl<B: Backend> ConvBlock<B> {
    fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        groups: usize,
        relu6: bool,
        device: &B::Device,
    ) -> Self {
        let padding = (kernel - 1) / 2;
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_groups(groups)
            .with_bias(false)
            .init(device);
        let norm = FrozenBatchNormConfig::new(out_channels).init(device);
        Self { conv, norm, relu6 }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.norm.forward(self.conv.forward(x));
        if self.relu6 {
            x.clamp(0.0, 6.0)
        } else {
            x
        }
    }
}

/// MobileNetV2 bottleneck: pointwise expansion, depthwise 3x3, linear
/// pointwise projection, with a residual add when the shape is preserved.
#[derive(Module, Debug)]
struct InvertedResidual<B: Backend> {
    expand: Option<ConvBlock<B>>,
    depthwise: ConvBlock<B>,
    project: ConvBlock<B>,
    #[module(skip)]
    use_residual: bool,
}

impl<B: Backend> InvertedResidual<B> {
    fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        expand_ratio: usize,
        device: &B::Device,
    ) -> Self {
        let hidden = in_channels * expand_ratio;
        let expand = if expand_ratio == 1 {
            None
        } else {
            Some(ConvBlock::new(in_channels, hidden, 1, 1, 1, true, device))
        };
        let depthwise = ConvBlock::new(hidden, hidden, 3, stride, hidden, true, device);
        let project = ConvBlock::new(hidden, out_channels, 1, 1, 1, false, device);

        Self {
            expand,
            depthwise,
            project,
            use_residual: stride == 1 && in_channels == out_channels,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = match &self.expand {
            Some(expand) => expand.forward(x.clone()),
            None => x.clone(),
        };
        let out = self.project.forward(self.depthwise.forward(out));
        if self.use_residual {
            x + out
        } else {
            out
        }
    }
}

/// The default classifier; see the module docs for the architecture.
#[derive(Module, Debug)]
pub struct TissueNet<B: Backend> {
    stem: ConvBlock<B>,
    blocks: Vec<InvertedResidual<B>>,
    head: ConvBlock<B>,
    pool: AdaptiveAvgPool2d,
    classifier: Linear<B>,
    #[module(skip)]
    num_classes: usize,
}

impl<B: Backend> TissueNet<B> {
    /// Number of stages in the feature stack (stem + bottlenecks + head).
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.blocks.len() + 2
    }

    fn forward_stage(&self, index: usize, x: Tensor<B, 4>) -> Tensor<B, 4> {
        if index == 0 {
            self.stem.forward(x)
        } else if index <= self.blocks.len() {
            self.blocks[index - 1].forward(x)
        } else {
            self.head.forward(x)
        }
    }

    fn forward_stages(&self, mut x: Tensor<B, 4>, stages: std::ops::Range<usize>) -> Tensor<B, 4> {
        for index in stages {
            x = self.forward_stage(index, x);
        }
        x
    }

    fn classify_features(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let pooled = self.pool.forward(features);
        let [batch, channels, _, _] = pooled.dims();
        self.classifier.forward(pooled.reshape([batch, channels]))
    }

    fn feature_index(&self, target: LayerHandle) -> usize {
        match target {
            LayerHandle::Features(index) => {
                assert!(
                    index < self.stage_count(),
                    "feature stage {index} out of range for a {}-stage stack",
                    self.stage_count()
                );
                index
            }
            other => panic!("TissueNet cannot execute layer handle {other:?}"),
        }
    }
}

impl<B: Backend> ConvNet<B> for TissueNet<B> {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.forward_stages(x, 0..self.stage_count());
        self.classify_features(features)
    }

    fn features_len(&self) -> Option<usize> {
        Some(self.stage_count())
    }

    fn last_conv(&self) -> Option<LayerHandle> {
        Some(LayerHandle::Features(self.stage_count() - 1))
    }

    fn forward_to(&self, x: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 4> {
        let index = self.feature_index(target);
        self.forward_stages(x, 0..index + 1)
    }

    fn forward_from(&self, activation: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 2> {
        let index = self.feature_index(target);
        let features = self.forward_stages(activation, index + 1..self.stage_count());
        self.classify_features(features)
    }
}

impl<B: AutodiffBackend> AttributionModel<B> for TissueNet<B> {
    type Inference = TissueNet<B::InnerBackend>;

    fn inference(&self) -> Self::Inference {
        self.clone().valid()
    }
}
