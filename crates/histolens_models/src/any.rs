//! Architecture-erased model wrapper.
//!
//! The registry hands out an [`AnyModel`] so callers hold one concrete type
//! regardless of which backbone a checkpoint was trained on. Trait calls
//! dispatch to the wrapped model by match.

use std::path::Path;

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::checkpoint::{self, Result as CheckpointResult};
use crate::convnet::{AttributionModel, ConvNet, LayerHandle};
use crate::resnet::ResNet;
use crate::tissuenet::TissueNet;

/// A classifier of any supported architecture.
#[derive(Debug, Clone)]
pub enum AnyModel<B: Backend> {
    /// MobileNetV2-style backbone, the default for tissue classification.
    TissueNet(TissueNet<B>),
    /// ResNet-18-style backbone.
    ResNet(ResNet<B>),
}

impl<B: Backend> AnyModel<B> {
    /// Registry name of the wrapped architecture.
    pub fn architecture(&self) -> &'static str {
        match self {
            Self::TissueNet(_) => "tissuenet",
            Self::ResNet(_) => "resnet18",
        }
    }

    /// Replace the wrapped model's weights with a checkpoint's.
    pub fn load_weights(self, path: impl AsRef<Path>, device: &B::Device) -> CheckpointResult<Self> {
        match self {
            Self::TissueNet(model) => {
                let record = checkpoint::load_record::<B, TissueNet<B>>(path, device)?;
                Ok(Self::TissueNet(model.load_record(record)))
            }
            Self::ResNet(model) => {
                let record = checkpoint::load_record::<B, ResNet<B>>(path, device)?;
                Ok(Self::ResNet(model.load_record(record)))
            }
        }
    }

    /// Save the wrapped model's weights.
    pub fn save_weights(&self, path: impl AsRef<Path>) -> CheckpointResult<()> {
        match self {
            Self::TissueNet(model) => checkpoint::save_model::<B, _>(model, path),
            Self::ResNet(model) => checkpoint::save_model::<B, _>(model, path),
        }
    }
}

impl<B: AutodiffBackend> AnyModel<B> {
    /// Convert to the non-autodiff twin, keeping the wrapped architecture.
    pub fn valid(self) -> AnyModel<B::InnerBackend> {
        match self {
            Self::TissueNet(model) => AnyModel::TissueNet(model.valid()),
            Self::ResNet(model) => AnyModel::ResNet(model.valid()),
        }
    }
}

impl<B: Backend> ConvNet<B> for AnyModel<B> {
    fn num_classes(&self) -> usize {
        match self {
            Self::TissueNet(model) => model.num_classes(),
            Self::ResNet(model) => model.num_classes(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        match self {
            Self::TissueNet(model) => model.forward(x),
            Self::ResNet(model) => model.forward(x),
        }
    }

    fn forward_probs(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        match self {
            Self::TissueNet(model) => model.forward_probs(x),
            Self::ResNet(model) => model.forward_probs(x),
        }
    }

    fn features_len(&self) -> Option<usize> {
        match self {
            Self::TissueNet(model) => model.features_len(),
            Self::ResNet(model) => model.features_len(),
        }
    }

    fn final_stage_len(&self) -> Option<usize> {
        match self {
            Self::TissueNet(model) => model.final_stage_len(),
            Self::ResNet(model) => model.final_stage_len(),
        }
    }

    fn last_conv(&self) -> Option<LayerHandle> {
        match self {
            Self::TissueNet(model) => model.last_conv(),
            Self::ResNet(model) => model.last_conv(),
        }
    }

    fn forward_to(&self, x: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 4> {
        match self {
            Self::TissueNet(model) => model.forward_to(x, target),
            Self::ResNet(model) => model.forward_to(x, target),
        }
    }

    fn forward_from(&self, activation: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 2> {
        match self {
            Self::TissueNet(model) => model.forward_from(activation, target),
            Self::ResNet(model) => model.forward_from(activation, target),
        }
    }
}

impl<B: AutodiffBackend> AttributionModel<B> for AnyModel<B> {
    type Inference = AnyModel<B::InnerBackend>;

    fn inference(&self) -> Self::Inference {
        self.clone().valid()
    }
}
