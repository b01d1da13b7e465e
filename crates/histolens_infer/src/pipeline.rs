//! End-to-end explainable inference.
//!
//! One pipeline owns both halves of a loaded model: the inference twin for
//! plain classification and the autodiff copy driving attribution. The two
//! share weight storage, and every layer computes the identical function on
//! both backends, so a classification and the attribution pass that explains
//! it always agree on the logits.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use histolens_core::{Cam, ClassificationResult};
use histolens_explain::AttributionEngine;
use histolens_models::{AnyModel, AttributionModel, ConvNet};
use histolens_vision::{overlay, Preprocessor, DEFAULT_ALPHA};
use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::classifier::Classifier;
use crate::error::{InferError, Result};

/// A classification together with its visual explanation.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// The classification of the input.
    pub classification: ClassificationResult,
    /// Normalized class activation map at processed resolution.
    pub cam: Cam,
    /// Heatmap blended over the resized original.
    pub overlay: RgbImage,
}

struct Loaded<B: AutodiffBackend> {
    classifier: Classifier<B::InnerBackend, AnyModel<B::InnerBackend>>,
    engine: AttributionEngine<B, AnyModel<B>>,
}

/// Classification and attribution over one optionally-loaded model.
///
/// A pipeline starts empty; until [`attach_model`](Self::attach_model) runs,
/// every inference fails with [`InferError::ModelNotLoaded`]. Weights are
/// attached once at startup and never mutated afterwards.
pub struct ExplainablePipeline<B: AutodiffBackend> {
    loaded: Option<Loaded<B>>,
    preprocessor: Preprocessor,
    device: <B::InnerBackend as Backend>::Device,
    alpha: f32,
}

impl<B: AutodiffBackend> ExplainablePipeline<B> {
    /// A pipeline with no weights attached.
    pub fn new(device: <B::InnerBackend as Backend>::Device) -> Self {
        Self {
            loaded: None,
            preprocessor: Preprocessor::default(),
            device,
            alpha: DEFAULT_ALPHA,
        }
    }

    /// A pipeline with weights already attached.
    pub fn with_model(model: AnyModel<B>, device: <B::InnerBackend as Backend>::Device) -> Self {
        let mut pipeline = Self::new(device);
        pipeline.attach_model(model);
        pipeline
    }

    /// Replace the preprocessor.
    #[must_use]
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Override the overlay blend weight.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Attach a loaded model, replacing any previous one.
    pub fn attach_model(&mut self, model: AnyModel<B>) {
        let twin = model.inference();
        self.loaded = Some(Loaded {
            classifier: Classifier::new(twin, self.device.clone()),
            engine: AttributionEngine::new(model),
        });
    }

    /// Whether a model is attached.
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Registry name of the attached architecture, if any.
    pub fn architecture(&self) -> Option<&'static str> {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.engine.model().architecture())
    }

    fn loaded(&self) -> Result<&Loaded<B>> {
        self.loaded.as_ref().ok_or(InferError::ModelNotLoaded)
    }

    /// Classify a decoded image.
    pub fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        let loaded = self.loaded()?;
        let tensor = self.preprocessor.process(image, &self.device);
        let result = loaded.classifier.classify_tensor(tensor)?;
        debug!(
            prediction = %result.label,
            confidence = result.confidence,
            "classified image"
        );
        Ok(result)
    }

    /// Classify a decoded image and explain the prediction.
    ///
    /// The attribution runs on the same preprocessed tensor as the
    /// classification. With `target_class` unset, the attribution pass's own
    /// arg-max class is explained.
    pub fn explain(
        &self,
        image: &DynamicImage,
        target_class: Option<usize>,
    ) -> Result<Explanation> {
        let loaded = self.loaded()?;
        let tensor = self.preprocessor.process(image, &self.device);
        let classification = loaded.classifier.classify_tensor(tensor.clone())?;
        let cam = loaded.engine.attribute(tensor, target_class)?;
        let overlay = overlay(&cam, image, self.alpha);
        debug!(
            prediction = %classification.label,
            target = ?target_class,
            "explained image"
        );
        Ok(Explanation {
            classification,
            cam,
            overlay,
        })
    }
}
