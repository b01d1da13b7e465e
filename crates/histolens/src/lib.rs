//! # histolens
//!
//! Explainable histopathology image classification in Rust.
//!
//! histolens classifies tissue tiles as benign or malignant and explains every
//! prediction with a gradient-weighted class activation map:
//!
//! - **Core**: class labels, classification results, activation maps
//! - **Vision**: image decoding, preprocessing, heatmap rendering
//! - **Models**: TissueNet and ResNet-18 classifiers, checkpoints, registry
//! - **Explain**: gradient-based attribution over any registered model
//! - **Infer**: the end-to-end classify-and-explain pipeline
//! - **Server**: HTTP API with JSON base64 and multipart endpoints
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use histolens::prelude::*;
//!
//! // Build a model and attach trained weights
//! let device = Default::default();
//! let registry = default_registry::<Attribution>();
//! let model = registry.create("tissuenet", &serde_json::json!({}), &device)?;
//! let model = model.load_weights("runs/model_best.mpk", &device)?;
//!
//! // Classify and explain
//! let pipeline = ExplainablePipeline::with_model(model, device);
//! let image = ImageLoader::from_path(Path::new("tile.png"))?;
//! let explanation = pipeline.explain(&image, None)?;
//!
//! println!(
//!     "{} ({:.1}%)",
//!     explanation.classification.label,
//!     explanation.classification.confidence * 100.0,
//! );
//! explanation.overlay.save("gradcam.png")?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export all crates
pub use histolens_core as core;
pub use histolens_explain as explain;
pub use histolens_infer as infer;
pub use histolens_models as models;
pub use histolens_server as server;
pub use histolens_vision as vision;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use histolens::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use histolens_core::backend::{Attribution, Infer};
    pub use histolens_core::{Cam, ClassLabel, ClassificationResult, INPUT_SIZE};

    // Vision
    pub use histolens_vision::{overlay, ImageLoader, Preprocessor};

    // Models
    pub use histolens_models::{
        default_registry, locate_checkpoint, AnyModel, CheckpointMetadata, ModelRegistry,
        ResNet, ResNetConfig, TissueNet, TissueNetConfig,
    };

    // Explain
    pub use histolens_explain::AttributionEngine;

    // Infer
    pub use histolens_infer::{Classifier, ExplainablePipeline, Explanation};
}
