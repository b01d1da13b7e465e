//! Gradient-weighted class activation mapping.
//!
//! The classic formulation registers forward and backward hooks on a shared
//! model to snapshot the target layer's activation and its incoming gradient.
//! Hooks are process-wide mutable state and force a lock around every
//! attribution call. Here the model itself splits the pass instead: the trunk
//! runs up to the target layer on the inference backend, the captured
//! activation becomes the root of a fresh autodiff graph, and the remainder
//! of the network runs on top of it. Activation and gradient then come from
//! the identical pass by construction, and concurrent calls share nothing.

use std::marker::PhantomData;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use histolens_core::Cam;
use histolens_models::{AttributionModel, ConvNet, LayerHandle};
use once_cell::sync::OnceCell;

use crate::error::{ExplainError, Result};
use crate::selector::resolve_target;

/// Computes Grad-CAM maps for one model.
///
/// The attribution target layer is resolved once per engine and cached; it is
/// a pure function of the architecture. The engine never mutates the model,
/// so clones of an engine can attribute concurrently.
#[derive(Clone)]
pub struct AttributionEngine<B, M>
where
    B: AutodiffBackend,
    M: AttributionModel<B>,
{
    model: M,
    target: OnceCell<LayerHandle>,
    _backend: PhantomData<B>,
}

impl<B, M> AttributionEngine<B, M>
where
    B: AutodiffBackend,
    M: AttributionModel<B>,
{
    /// Create an engine that resolves its target layer on first use.
    pub fn new(model: M) -> Self {
        Self {
            model,
            target: OnceCell::new(),
            _backend: PhantomData,
        }
    }

    /// Create an engine with an explicitly chosen target layer.
    pub fn with_target(model: M, target: LayerHandle) -> Self {
        Self {
            model,
            target: OnceCell::with_value(target),
            _backend: PhantomData,
        }
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The attribution target layer, resolving and caching it if needed.
    pub fn target(&self) -> Result<LayerHandle> {
        self.target
            .get_or_try_init(|| resolve_target(&self.model))
            .map(|target| *target)
    }

    /// Compute the class activation map for one preprocessed input.
    ///
    /// When `target_class` is `None` the arg-max class of this pass's own
    /// logits is attributed. The returned map matches the input's spatial
    /// resolution and holds values in `[0, 1]`; a perfectly flat raw map
    /// comes back as all zeros.
    ///
    /// # Errors
    ///
    /// [`ExplainError::InvalidTargetClass`] if `target_class` is out of
    /// range, [`ExplainError::LayerResolution`] if the model has no usable
    /// convolution, [`ExplainError::AttributionCapture`] if no gradient
    /// reaches the captured activation.
    pub fn attribute(
        &self,
        input: Tensor<B::InnerBackend, 4>,
        target_class: Option<usize>,
    ) -> Result<Cam> {
        let num_classes = self.model.num_classes();
        if let Some(requested) = target_class {
            if requested >= num_classes {
                return Err(ExplainError::InvalidTargetClass {
                    requested,
                    num_classes,
                });
            }
        }
        let target = self.target()?;
        let [batch, _, in_height, in_width] = input.dims();
        assert_eq!(batch, 1, "attribution expects a single-image batch");

        let activation = self.model.inference().forward_to(input, target);
        let acts = Tensor::<B, 4>::from_inner(activation.clone()).require_grad();
        let logits = self.model.forward_from(acts.clone(), target);

        let class = match target_class {
            Some(requested) => requested,
            None => logits.clone().argmax(1).into_scalar().elem::<i64>() as usize,
        };

        // Backward from the single class logit, not a loss over all classes.
        // The graph is fresh per call, so there is nothing to zero first.
        let score = logits.slice([0..1, class..class + 1]).reshape([1]);
        let grads = score.backward();
        let gradient = acts.grad(&grads).ok_or_else(|| {
            ExplainError::AttributionCapture(format!(
                "no gradient reached the target activation at {target:?}"
            ))
        })?;

        // Per-channel weights are the spatial mean of the gradient map; the
        // map is the rectified channel-weighted sum of the activation.
        let weights = gradient.mean_dim(3).mean_dim(2);
        let raw = (activation * weights).sum_dim(1).clamp_min(0.0);

        let [_, _, height, width] = raw.dims();
        let values: Vec<f32> = raw.into_data().to_vec().map_err(|e| {
            ExplainError::AttributionCapture(format!("could not read attribution map: {e:?}"))
        })?;
        let resized = upsample_bilinear(&values, height, width, in_height, in_width);
        let cam = Cam::new(in_width, in_height, resized).map_err(|e| {
            ExplainError::AttributionCapture(format!("attribution map has wrong shape: {e}"))
        })?;
        Ok(cam.normalize())
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Bilinear resize with half-pixel centers (edge alignment disabled),
/// matching the convention of the image resize used elsewhere.
fn upsample_bilinear(
    src: &[f32],
    src_height: usize,
    src_width: usize,
    dst_height: usize,
    dst_width: usize,
) -> Vec<f32> {
    assert!(
        src_height > 0 && src_width > 0 && src.len() == src_height * src_width,
        "invalid source map"
    );
    let scale_y = src_height as f32 / dst_height as f32;
    let scale_x = src_width as f32 / dst_width as f32;

    let mut dst = Vec::with_capacity(dst_height * dst_width);
    for y in 0..dst_height {
        let sy = ((y as f32 + 0.5) * scale_y - 0.5).max(0.0);
        let y0 = (sy as usize).min(src_height - 1);
        let y1 = (y0 + 1).min(src_height - 1);
        let fy = sy - y0 as f32;
        for x in 0..dst_width {
            let sx = ((x as f32 + 0.5) * scale_x - 0.5).max(0.0);
            let x0 = (sx as usize).min(src_width - 1);
            let x1 = (x0 + 1).min(src_width - 1);
            let fx = sx - x0 as f32;

            let top = lerp(src[y0 * src_width + x0], src[y0 * src_width + x1], fx);
            let bottom = lerp(src[y1 * src_width + x0], src[y1 * src_width + x1], fx);
            dst.push(lerp(top, bottom, fy));
        }
    }
    dst
}
