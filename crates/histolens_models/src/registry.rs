//! Model registry for dynamic model creation.
//!
//! The registry allows creating classifiers dynamically by architecture name
//! from JSON configuration, which is how checkpoint metadata and the CLI pick
//! a backbone at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use histolens_models::registry::default_registry;
//! use serde_json::json;
//!
//! let registry = default_registry::<NdArray>();
//! let config = json!({ "num_classes": 2 });
//! let model = registry.create("tissuenet", &config, &device)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use burn::tensor::backend::Backend;
use histolens_core::ClassLabel;
use serde_json::Value;
use thiserror::Error;

use crate::any::AnyModel;
use crate::resnet::ResNetConfig;
use crate::tissuenet::TissueNetConfig;

/// Error type for model registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Architecture not found in the registry.
    #[error("Unknown architecture '{name}' (known: {known})")]
    ModelNotFound {
        /// The requested name.
        name: String,
        /// Comma-separated registered names.
        known: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Type alias for model constructor.
///
/// Constructors are `Send + Sync` so a registry can be shared across server
/// workers; the models they build are not `Sync` because Burn modules use
/// interior mutability.
pub type ModelConstructor<B> =
    Arc<dyn Fn(&Value, &<B as Backend>::Device) -> Result<AnyModel<B>> + Send + Sync>;

/// Registry for dynamically creating classifiers by name.
pub struct ModelRegistry<B: Backend> {
    models: HashMap<String, ModelConstructor<B>>,
}

impl<B: Backend> Default for ModelRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> ModelRegistry<B> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Register a model constructor.
    ///
    /// # Arguments
    ///
    /// * `name` - The name to register the architecture under
    /// * `constructor` - A function that creates the model from config
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&Value, &<B as Backend>::Device) -> Result<AnyModel<B>> + Send + Sync + 'static,
    {
        self.models.insert(name.to_string(), Arc::new(constructor));
    }

    /// Create a model by architecture name.
    ///
    /// # Arguments
    ///
    /// * `name` - The registered name of the architecture
    /// * `config` - JSON configuration for the model
    /// * `device` - The device to create the model on
    pub fn create(
        &self,
        name: &str,
        config: &Value,
        device: &<B as Backend>::Device,
    ) -> Result<AnyModel<B>> {
        let constructor = self.models.get(name).ok_or_else(|| {
            RegistryError::ModelNotFound {
                name: name.to_string(),
                known: self.list().join(", "),
            }
        })?;
        constructor(config, device)
    }

    /// List all registered architecture names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Check if an architecture is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }
}

// ============================================================================
// Helper functions for parsing configs
// ============================================================================

fn get_usize_or(config: &Value, key: &str, default: usize) -> usize {
    config
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn get_f64_or(config: &Value, key: &str, default: f64) -> f64 {
    config.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
}

fn get_num_classes(config: &Value) -> Result<usize> {
    let num_classes = get_usize_or(config, "num_classes", ClassLabel::COUNT);
    if num_classes == 0 {
        return Err(RegistryError::InvalidConfig(
            "'num_classes' must be at least 1".to_string(),
        ));
    }
    Ok(num_classes)
}

// ============================================================================
// Default registry with all architectures
// ============================================================================

/// Create a registry with all available architectures pre-registered.
///
/// # Available Architectures
///
/// - `tissuenet` - MobileNetV2-style backbone, the default classifier
/// - `resnet18` - ResNet-18-style residual backbone
///
/// # Config Fields
///
/// All fields are optional:
/// - `num_classes`: Number of output classes (default 2)
/// - `width_mult`: Channel multiplier, `tissuenet` only (default 1.0)
/// - `base_channels`: First-stage width, `resnet18` only (default 64)
pub fn default_registry<B: Backend>() -> ModelRegistry<B> {
    let mut registry = ModelRegistry::new();

    registry.register("tissuenet", |config, device| {
        let num_classes = get_num_classes(config)?;
        let width_mult = get_f64_or(config, "width_mult", 1.0);
        if width_mult <= 0.0 {
            return Err(RegistryError::InvalidConfig(
                "'width_mult' must be positive".to_string(),
            ));
        }

        let model_config = TissueNetConfig::new(num_classes).with_width_mult(width_mult);
        Ok(AnyModel::TissueNet(model_config.init::<B>(device)))
    });

    registry.register("resnet18", |config, device| {
        let num_classes = get_num_classes(config)?;
        let model_config = ResNetConfig::new(num_classes)
            .with_base_channels(get_usize_or(config, "base_channels", 64))
            .with_blocks_per_stage(get_usize_or(config, "blocks_per_stage", 2));
        Ok(AnyModel::ResNet(model_config.init::<B>(device)))
    });

    registry
}
