//! Deterministic choice of the attribution target layer.

use burn::prelude::*;
use histolens_models::{ConvNet, LayerHandle};

use crate::error::{ExplainError, Result};

/// Pick the convolutional layer whose activations are attributed.
///
/// Priority order:
///
/// 1. A sequential feature stack of at least four stages: the 4th-from-last
///    stage, the deepest layer still large enough spatially to localize.
/// 2. A final residual stage: its last block.
/// 3. The model's own notion of its last convolution, scanning sublayers in
///    reverse declaration order.
///
/// The choice is a pure function of the architecture, never of the input.
/// Fails with [`ExplainError::LayerResolution`] when the model exposes no
/// convolution at all.
pub fn resolve_target<B, M>(model: &M) -> Result<LayerHandle>
where
    B: Backend,
    M: ConvNet<B>,
{
    if let Some(len) = model.features_len() {
        if len >= 4 {
            return Ok(LayerHandle::Features(len - 4));
        }
    }
    if let Some(len) = model.final_stage_len() {
        if len > 0 {
            return Ok(LayerHandle::FinalStageBlock(len - 1));
        }
    }
    model.last_conv().ok_or_else(|| {
        ExplainError::LayerResolution(
            "model exposes no feature stack, final stage, or trailing convolution".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{FeaturesNet, FlatNet, TailNet};
    use burn_ndarray::NdArray;
    use histolens_models::{ResNetConfig, TissueNetConfig};

    type TestBackend = NdArray;

    #[test]
    fn test_feature_stack_picks_fourth_from_last() {
        let device = Default::default();
        let model = TissueNetConfig::new(2).with_width_mult(0.25).init::<TestBackend>(&device);
        assert_eq!(resolve_target(&model).unwrap(), LayerHandle::Features(15));
    }

    #[test]
    fn test_final_stage_picks_last_block() {
        let device = Default::default();
        let model = ResNetConfig::new(2)
            .with_base_channels(8)
            .init::<TestBackend>(&device);
        assert_eq!(
            resolve_target(&model).unwrap(),
            LayerHandle::FinalStageBlock(1)
        );
    }

    #[test]
    fn test_short_feature_stack_falls_through() {
        let device = Default::default();
        let model = FeaturesNet::<TestBackend>::new(3, 4, &device);
        // Three stages are too few for rule 1, so the trailing conv wins.
        assert_eq!(resolve_target(&model).unwrap(), LayerHandle::Features(2));
    }

    #[test]
    fn test_trailing_conv_only() {
        let device = Default::default();
        let model = TailNet::<TestBackend>::new(&device);
        assert_eq!(resolve_target(&model).unwrap(), LayerHandle::Conv(0));
    }

    #[test]
    fn test_no_conv_fails() {
        let device = Default::default();
        let model = FlatNet::<TestBackend>::new(&device);
        assert!(matches!(
            resolve_target(&model),
            Err(ExplainError::LayerResolution(_))
        ));
    }
}
