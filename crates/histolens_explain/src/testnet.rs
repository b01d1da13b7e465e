//! Tiny synthetic networks exercising each layer-selection rule.

use burn::module::AutodiffModule;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use histolens_models::{AttributionModel, ConvNet, LayerHandle};

fn conv3x3<B: Backend>(in_ch: usize, out_ch: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_ch, out_ch], [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

fn spatial_mean<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 2> {
    let pooled = x.mean_dim(3).mean_dim(2);
    let [batch, channels, _, _] = pooled.dims();
    pooled.reshape([batch, channels])
}

/// A plain stack of ReLU convolutions, exposed as a feature stack.
#[derive(Module, Debug)]
pub struct FeaturesNet<B: Backend> {
    stages: Vec<Conv2d<B>>,
    head: Linear<B>,
}

impl<B: Backend> FeaturesNet<B> {
    pub fn new(num_stages: usize, channels: usize, device: &B::Device) -> Self {
        let mut stages = Vec::with_capacity(num_stages);
        stages.push(conv3x3(3, channels, device));
        for _ in 1..num_stages {
            stages.push(conv3x3(channels, channels, device));
        }
        Self {
            stages,
            head: LinearConfig::new(channels, 2).init(device),
        }
    }

    fn stage_index(&self, target: LayerHandle) -> usize {
        match target {
            LayerHandle::Features(index) => {
                assert!(index < self.stages.len());
                index
            }
            other => panic!("FeaturesNet cannot execute layer handle {other:?}"),
        }
    }
}

impl<B: Backend> ConvNet<B> for FeaturesNet<B> {
    fn num_classes(&self) -> usize {
        2
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = x;
        for stage in &self.stages {
            x = stage.forward(x).clamp_min(0.0);
        }
        self.head.forward(spatial_mean(x))
    }

    fn features_len(&self) -> Option<usize> {
        Some(self.stages.len())
    }

    fn last_conv(&self) -> Option<LayerHandle> {
        Some(LayerHandle::Features(self.stages.len() - 1))
    }

    fn forward_to(&self, x: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 4> {
        let index = self.stage_index(target);
        let mut x = x;
        for stage in &self.stages[..=index] {
            x = stage.forward(x).clamp_min(0.0);
        }
        x
    }

    fn forward_from(&self, activation: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 2> {
        let index = self.stage_index(target);
        let mut x = activation;
        for stage in &self.stages[index + 1..] {
            x = stage.forward(x).clamp_min(0.0);
        }
        self.head.forward(spatial_mean(x))
    }
}

impl<B: AutodiffBackend> AttributionModel<B> for FeaturesNet<B> {
    type Inference = FeaturesNet<B::InnerBackend>;

    fn inference(&self) -> Self::Inference {
        self.clone().valid()
    }
}

/// A single trailing convolution with no feature stack or residual stage.
///
/// The conv carries no bias so an all-zero input produces an exactly zero
/// activation map.
#[derive(Module, Debug)]
pub struct TailNet<B: Backend> {
    conv: Conv2d<B>,
    head: Linear<B>,
}

impl<B: Backend> TailNet<B> {
    pub fn new(device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([3, 4], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        Self {
            conv,
            head: LinearConfig::new(4, 2).init(device),
        }
    }

    fn check_handle(&self, target: LayerHandle) {
        assert_eq!(
            target,
            LayerHandle::Conv(0),
            "TailNet cannot execute layer handle {target:?}"
        );
    }
}

impl<B: Backend> ConvNet<B> for TailNet<B> {
    fn num_classes(&self) -> usize {
        2
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv.forward(x).clamp_min(0.0);
        self.head.forward(spatial_mean(x))
    }

    fn last_conv(&self) -> Option<LayerHandle> {
        Some(LayerHandle::Conv(0))
    }

    fn forward_to(&self, x: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 4> {
        self.check_handle(target);
        self.conv.forward(x).clamp_min(0.0)
    }

    fn forward_from(&self, activation: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 2> {
        self.check_handle(target);
        self.head.forward(spatial_mean(activation))
    }
}

impl<B: AutodiffBackend> AttributionModel<B> for TailNet<B> {
    type Inference = TailNet<B::InnerBackend>;

    fn inference(&self) -> Self::Inference {
        self.clone().valid()
    }
}

/// A classifier with no convolution anywhere.
#[derive(Module, Debug)]
pub struct FlatNet<B: Backend> {
    head: Linear<B>,
}

impl<B: Backend> FlatNet<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            head: LinearConfig::new(3, 2).init(device),
        }
    }
}

impl<B: Backend> ConvNet<B> for FlatNet<B> {
    fn num_classes(&self) -> usize {
        2
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        self.head.forward(spatial_mean(x))
    }

    fn last_conv(&self) -> Option<LayerHandle> {
        None
    }

    fn forward_to(&self, _x: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 4> {
        panic!("FlatNet cannot execute layer handle {target:?}")
    }

    fn forward_from(&self, _activation: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 2> {
        panic!("FlatNet cannot execute layer handle {target:?}")
    }
}

impl<B: AutodiffBackend> AttributionModel<B> for FlatNet<B> {
    type Inference = FlatNet<B::InnerBackend>;

    fn inference(&self) -> Self::Inference {
        self.clone().valid()
    }
}
