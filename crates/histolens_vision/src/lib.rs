//! # histolens_vision
//!
//! Image handling for the histolens pipeline: decoding uploads, the
//! deterministic image-to-tensor preprocessing transform, and heatmap
//! compositing/encoding for responses.
//!
//! This crate provides:
//! - [`ImageLoader`] for raw-byte, base64, and file inputs
//! - [`Preprocessor`] producing normalized `(1, 3, 224, 224)` tensors
//! - [`overlay`] blending a CAM onto the source image through the jet
//!   gradient
//! - PNG and data-URI encoding for the final overlay

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod colormap;
mod encode;
mod error;
mod loader;
mod overlay;
mod preprocess;

pub use colormap::jet;
pub use encode::{png_bytes, png_data_uri};
pub use error::{Result, VisionError};
pub use loader::ImageLoader;
pub use overlay::{overlay, DEFAULT_ALPHA};
pub use preprocess::Preprocessor;
