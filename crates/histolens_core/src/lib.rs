//! # histolens_core
//!
//! Core types for the histolens explainable-inference pipeline.
//!
//! This crate provides:
//! - [`ClassLabel`] for the two-class benign/malignant label space
//! - [`ClassificationResult`] as produced by one forward pass
//! - [`Cam`] for class activation maps with min-max normalization
//! - Error types and backend aliases shared across the workspace
//!
//! ## Tensor convention
//!
//! Image tensors follow `(B, C, H, W)`:
//! - `B`: Batch size (always 1 in the serving pipeline)
//! - `C`: Channels (3 for RGB input)
//! - `H`, `W`: Spatial dimensions (224x224 after preprocessing)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod cam;
mod error;
mod label;
mod result;

pub use cam::Cam;
pub use error::{CoreError, Result};
pub use label::ClassLabel;
pub use result::ClassificationResult;

/// Backend type aliases for convenience
pub mod backend {
    pub use burn_autodiff::Autodiff;
    pub use burn_ndarray::NdArray;

    /// The CPU inference backend.
    pub type Infer = NdArray;

    /// The attribution backend: autodiff layered over the inference backend.
    pub type Attribution = Autodiff<NdArray>;
}

/// Side length of the square network input, in pixels.
pub const INPUT_SIZE: usize = 224;

/// Per-channel normalization mean applied after scaling pixels to `[0, 1]`.
pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel normalization standard deviation.
pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];
