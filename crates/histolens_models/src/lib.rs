//! # histolens_models
//!
//! Classifier backbones for histolens: convolutional architectures, the
//! registry that builds them by name, and checkpoint persistence.
//!
//! ## Architectures
//! - [`TissueNet`] - MobileNetV2-style backbone, the default classifier
//! - [`ResNet`] - ResNet-18-style residual backbone
//!
//! Both expose their convolutional stages through [`ConvNet`] so attribution
//! code can split a forward pass at a chosen layer, and both normalize with
//! [`FrozenBatchNorm`] so the same input always produces the same output
//! regardless of which backend runs the pass.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod any;
pub mod checkpoint;
pub mod convnet;
pub mod norm;
pub mod registry;
pub mod resnet;
pub mod tissuenet;

pub use any::AnyModel;
pub use checkpoint::{
    load_record, locate_checkpoint, metadata_path, save_model, CheckpointError,
    CheckpointMetadata, ModelCheckpoint, CHECKPOINT_CANDIDATES,
};
pub use convnet::{AttributionModel, ConvNet, LayerHandle};
pub use norm::{FrozenBatchNorm, FrozenBatchNormConfig};
pub use registry::{default_registry, ModelRegistry, RegistryError};
pub use resnet::{ResNet, ResNetConfig};
pub use tissuenet::{TissueNet, TissueNetConfig};
