//! Classification over a frozen network.

use burn::prelude::*;
use histolens_core::{ClassificationResult, CoreError};
use histolens_models::ConvNet;
use histolens_vision::Preprocessor;
use image::DynamicImage;

use crate::error::Result;

/// Runs forward passes over an injected model.
///
/// The model is constructor-injected and immutable for the classifier's
/// lifetime. Every layer is deterministic in inference form, so classifying
/// the same image twice yields bit-identical results.
pub struct Classifier<B: Backend, M: ConvNet<B>> {
    model: M,
    preprocessor: Preprocessor,
    device: B::Device,
}

impl<B: Backend, M: ConvNet<B>> Classifier<B, M> {
    /// Create a classifier around a loaded model.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            preprocessor: Preprocessor::default(),
            device,
        }
    }

    /// Replace the preprocessor.
    #[must_use]
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Classify an already-preprocessed tensor.
    pub fn classify_tensor(&self, input: Tensor<B, 4>) -> Result<ClassificationResult> {
        let probs: Vec<f32> = self
            .model
            .forward_probs(input)
            .into_data()
            .to_vec()
            .map_err(|e| {
                CoreError::ShapeMismatch(format!("could not read class probabilities: {e:?}"))
            })?;
        let probs: [f32; 2] = probs.try_into().map_err(|v: Vec<f32>| {
            CoreError::ShapeMismatch(format!("expected 2 class probabilities, got {}", v.len()))
        })?;
        Ok(ClassificationResult::from_probabilities(probs))
    }

    /// Preprocess and classify a decoded image.
    pub fn classify_image(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        let tensor = self.preprocessor.process(image, &self.device);
        self.classify_tensor(tensor)
    }
}
