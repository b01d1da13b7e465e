//! # histolens_explain
//!
//! Grad-CAM attribution for histolens classifiers: deterministic target
//! layer selection and gradient-weighted class activation maps computed
//! over a split forward pass, with no hooks and no shared mutable state.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod selector;

#[cfg(test)]
mod testnet;

pub use engine::AttributionEngine;
pub use error::{ExplainError, Result};
pub use selector::resolve_target;
