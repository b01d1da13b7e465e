//! Checkpoint persistence for classifier weights.
//!
//! Weights are stored as named MessagePack (`*.mpk`) through Burn's record
//! system, with an optional JSON metadata sidecar describing how the
//! checkpoint was produced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use serde::{Deserialize, Serialize};

/// File names probed, in order, when locating a checkpoint in a directory.
pub const CHECKPOINT_CANDIDATES: [&str; 3] = ["model_best.mpk", "best_model.mpk", "model.mpk"];

/// Save a model's weights to a named MessagePack file.
pub fn save_model<B, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
    B: Backend,
    M: Module<B>,
{
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(model.clone().into_record(), path.as_ref().to_path_buf())
        .map_err(|e| CheckpointError::Save(e.to_string()))?;
    Ok(())
}

/// Load a model record from a named MessagePack file.
///
/// The caller applies the record with [`Module::load_record`] so the weights
/// land in an already-constructed model of the matching architecture.
pub fn load_record<B, M>(path: impl AsRef<Path>, device: &B::Device) -> Result<M::Record>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.display().to_string()));
    }
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .load(path.to_path_buf(), device)
        .map_err(|e| CheckpointError::Load(e.to_string()))
}

/// Find the first checkpoint candidate present in `dir`.
pub fn locate_checkpoint(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = dir.as_ref();
    CHECKPOINT_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Path of the JSON metadata sidecar for a checkpoint file.
pub fn metadata_path(checkpoint: impl AsRef<Path>) -> PathBuf {
    checkpoint.as_ref().with_extension("json")
}

/// Provenance recorded next to a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Registry name of the architecture the weights belong to.
    pub arch: String,
    /// Number of output classes.
    pub num_classes: usize,
    /// Validation accuracy reported by the training run, if known.
    pub val_acc: Option<f32>,
    /// Additional free-form fields.
    pub extra: HashMap<String, String>,
}

impl CheckpointMetadata {
    /// Create metadata for an architecture.
    pub fn new(arch: impl Into<String>, num_classes: usize) -> Self {
        Self {
            arch: arch.into(),
            num_classes,
            val_acc: None,
            extra: HashMap::new(),
        }
    }

    /// Set the validation accuracy.
    #[must_use]
    pub fn with_val_acc(mut self, acc: f32) -> Self {
        self.val_acc = Some(acc);
        self
    }

    /// Add an extra field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Save metadata to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::Save(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| CheckpointError::Save(e.to_string()))?;
        Ok(())
    }

    /// Load metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json =
            std::fs::read_to_string(path).map_err(|e| CheckpointError::Load(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::Load(e.to_string()))
    }
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Checkpoint-related errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Error saving a checkpoint.
    #[error("Failed to save checkpoint: {0}")]
    Save(String),

    /// Error loading a checkpoint.
    #[error("Failed to load checkpoint: {0}")]
    Load(String),

    /// Checkpoint file does not exist.
    #[error("Checkpoint not found: {0}")]
    NotFound(String),
}

/// Extension trait adding checkpoint methods to any module.
pub trait ModelCheckpoint<B: Backend>: Module<B> {
    /// Save the model to a checkpoint file.
    fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        save_model::<B, Self>(self, path)
    }

    /// Load checkpoint weights into a copy of this model.
    fn load_checkpoint(&self, path: impl AsRef<Path>, device: &B::Device) -> Result<Self>
    where
        Self: Sized,
    {
        let record = load_record::<B, Self>(path, device)?;
        Ok(self.clone().load_record(record))
    }
}

impl<B: Backend, M: Module<B>> ModelCheckpoint<B> for M {}
