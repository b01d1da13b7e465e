//! # histolens_infer
//!
//! Inference orchestration: the classifier over a frozen network and the
//! explainable pipeline that ties preprocessing, classification, attribution,
//! and heatmap compositing into one call chain.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod error;
pub mod pipeline;

pub use classifier::Classifier;
pub use error::{InferError, Result};
pub use pipeline::{ExplainablePipeline, Explanation};
