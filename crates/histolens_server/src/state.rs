//! Shared application state.
//!
//! Burn's module types use interior mutability that is not `Sync`, so the
//! pipeline lives behind a mutex. Inference is CPU-bound and can take
//! hundreds of milliseconds per image, so it runs on the blocking pool
//! rather than the async executor threads.

use std::sync::Arc;

use parking_lot::Mutex;

use histolens_core::backend::Attribution;
use histolens_infer::ExplainablePipeline;

use crate::error::{ApiError, Result};

/// Handle to the pipeline shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Mutex<ExplainablePipeline<Attribution>>>,
}

impl AppState {
    /// Wrap a pipeline for sharing across handlers.
    pub fn new(pipeline: ExplainablePipeline<Attribution>) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// Whether a model checkpoint has been attached.
    pub fn model_loaded(&self) -> bool {
        self.pipeline.lock().is_loaded()
    }

    /// Registry name of the attached architecture, if any.
    pub fn architecture(&self) -> Option<&'static str> {
        self.pipeline.lock().architecture()
    }

    /// Run `op` against the locked pipeline on the blocking pool.
    pub(crate) async fn with_pipeline<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ExplainablePipeline<Attribution>) -> Result<T> + Send + 'static,
    {
        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || {
            let guard = pipeline.lock();
            op(&guard)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("inference task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> AppState {
        AppState::new(ExplainablePipeline::new(Default::default()))
    }

    #[test]
    fn test_state_without_model() {
        let state = empty_state();
        assert!(!state.model_loaded());
        assert!(state.architecture().is_none());
    }

    #[tokio::test]
    async fn test_with_pipeline_surfaces_operation_errors() {
        let state = empty_state();
        let result: Result<()> = state
            .with_pipeline(|pipeline| {
                assert!(!pipeline.is_loaded());
                Err(ApiError::InvalidRequest("boom".to_string()))
            })
            .await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_state_clones_share_the_pipeline() {
        let state = empty_state();
        let clone = state.clone();
        assert_eq!(state.model_loaded(), clone.model_loaded());
    }
}
