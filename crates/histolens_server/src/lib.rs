//! # histolens_server
//!
//! HTTP serving layer for histopathology classification.
//!
//! Exposes the explainable-inference pipeline over axum. Every inference
//! endpoint accepts either a JSON body with a base64-encoded image or a
//! multipart file upload:
//!
//! - `POST /predict` and `POST /predict/upload` classify an image
//! - `POST /predict-with-gradcam` and `POST /predict-with-gradcam/upload`
//!   additionally return the class activation overlay as a PNG data URI
//! - `GET /health` and `GET /` report service status
//!
//! The server starts and answers health checks even without a checkpoint;
//! inference endpoints return 503 until a model is attached.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::{ApiError, Result};
pub use state::AppState;

use histolens_core::backend::Attribution;
use histolens_infer::ExplainablePipeline;

/// Build the application router with all routes and middleware.
pub fn create_app(config: &ServerConfig, state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict_json))
        .route("/predict/upload", post(handlers::predict_upload))
        .route("/predict-with-gradcam", post(handlers::gradcam_json))
        .route(
            "/predict-with-gradcam/upload",
            post(handlers::gradcam_upload),
        )
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Axum caps extractor bodies at 2 MB on its own; lift that so the
        // configured limit is the only one in effect.
        .layer(DefaultBodyLimit::max(config.max_request_size))
        .layer(RequestBodyLimitLayer::new(config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until shutdown.
pub async fn serve(
    config: ServerConfig,
    pipeline: ExplainablePipeline<Attribution>,
) -> Result<()> {
    let state = AppState::new(pipeline);
    if !state.model_loaded() {
        tracing::warn!(
            "no model attached; inference endpoints return 503 until a checkpoint is loaded"
        );
    }

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        ApiError::Config(format!("invalid bind address {}: {e}", config.bind_addr))
    })?;
    let app = create_app(&config, state);

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict                     - JSON base64 classification");
    tracing::info!("  POST /predict/upload              - Multipart classification");
    tracing::info!("  POST /predict-with-gradcam        - JSON base64 with attribution overlay");
    tracing::info!("  POST /predict-with-gradcam/upload - Multipart with attribution overlay");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  GET  /                            - Service information");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Config(format!("failed to bind to address {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Internal(format!("server failed: {e}")))?;

    Ok(())
}
