//! Structural traits for convolutional classifiers.

use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::tensor::backend::AutodiffBackend;

/// Handle to the convolutional layer targeted by attribution.
///
/// A handle is only meaningful for the model whose introspection produced it;
/// passing it to a structurally different model is a programming error and
/// panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerHandle {
    /// A stage of the sequential feature stack, by stage index.
    Features(usize),
    /// A block of the final residual stage, by block index within that stage.
    FinalStageBlock(usize),
    /// A convolution located by the reverse declaration-order scan, by an
    /// index the model itself defines.
    Conv(usize),
}

/// A 2-D convolutional classifier with enough structure exposed to resolve
/// and execute around an attribution target layer.
///
/// Split execution must be consistent with the plain forward pass: for every
/// handle `t` the model's introspection can produce,
/// `forward_from(forward_to(x, t), t)` equals `forward(x)` exactly.
pub trait ConvNet<B: Backend> {
    /// Number of output classes.
    fn num_classes(&self) -> usize;

    /// Class logits for a batch of images, shape `(batch, num_classes)`.
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Class probabilities (softmax over logits).
    fn forward_probs(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(x), 1)
    }

    /// Number of stages in the sequential feature stack, if the network has
    /// one.
    fn features_len(&self) -> Option<usize> {
        None
    }

    /// Number of blocks in the final residual stage, if the network has one.
    fn final_stage_len(&self) -> Option<usize> {
        None
    }

    /// The first 2-D convolution in reverse declaration order, as an
    /// executable handle; `None` if the network contains no convolution.
    fn last_conv(&self) -> Option<LayerHandle>;

    /// Run the network up to and including the target layer, returning its
    /// output activation of shape `(batch, channels, height, width)`.
    fn forward_to(&self, x: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 4>;

    /// Run the network from just after the target layer to class logits.
    fn forward_from(&self, activation: Tensor<B, 4>, target: LayerHandle) -> Tensor<B, 2>;
}

/// A classifier usable for gradient-based attribution: differentiable on an
/// autodiff backend, with an inference twin on the inner backend computing
/// the exact same function.
///
/// For Burn modules the twin is `self.clone().valid()`. Note: `Sync` is not
/// required because Burn's module parameters use lazy-init interior
/// mutability that is not `Sync`.
pub trait AttributionModel<B: AutodiffBackend>: ConvNet<B> + Clone + Send {
    /// The non-autodiff twin used for plain classification.
    type Inference: ConvNet<B::InnerBackend> + Clone + Send;

    /// The inference twin sharing this model's weights.
    fn inference(&self) -> Self::Inference;
}
