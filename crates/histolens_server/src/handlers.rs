//! HTTP request handlers.
//!
//! Classification and attribution each come in two flavors: a JSON body
//! carrying a base64-encoded image, and a multipart upload for plain file
//! submission. Both converge on the same pipeline calls.

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use histolens_core::ClassificationResult;
use histolens_vision::{png_data_uri, ImageLoader};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Response envelope shared by every inference endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Payload, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
    /// Unique id correlating the response with server logs.
    pub request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// JSON body for `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// Base64-encoded image, with or without a `data:` URI prefix.
    pub image: String,
}

/// JSON body for `POST /predict-with-gradcam`.
#[derive(Debug, Deserialize)]
pub struct GradcamRequest {
    /// Base64-encoded image, with or without a `data:` URI prefix.
    pub image: String,
    /// Class index to attribute. Defaults to the predicted class.
    #[serde(default)]
    pub target_class: Option<usize>,
}

/// Classification plus the rendered attribution overlay.
#[derive(Debug, Serialize)]
pub struct GradcamResponse {
    /// Prediction for the submitted image.
    #[serde(flatten)]
    pub classification: ClassificationResult,
    /// PNG data URI of the heatmap blended over the resized input.
    pub gradcam: String,
}

/// `GET /` - service description.
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "histolens",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model_loaded(),
        "architecture": state.architecture(),
        "endpoints": {
            "health": "GET /health",
            "predict": "POST /predict",
            "predict_upload": "POST /predict/upload",
            "gradcam": "POST /predict-with-gradcam",
            "gradcam_upload": "POST /predict-with-gradcam/upload",
        },
    }))
}

/// `GET /health` - liveness and model status.
///
/// Always 200; orchestrators read `model_loaded` to tell a warming
/// instance from a serving one.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let loaded = state.model_loaded();
    Json(json!({
        "status": if loaded { "healthy" } else { "degraded" },
        "model_loaded": loaded,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /predict` - classify a base64-encoded image.
pub async fn predict_json(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<ApiResponse<ClassificationResult>>> {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    if request.image.is_empty() {
        return Err(ApiError::InvalidRequest("image field is empty".to_string()));
    }

    let result = state
        .with_pipeline(move |pipeline| {
            let image = ImageLoader::from_base64(&request.image)?;
            Ok(pipeline.classify(&image)?)
        })
        .await?;

    info!(
        request_id,
        prediction = %result.label,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "predict request served"
    );
    Ok(Json(ApiResponse::success(result, request_id)))
}

/// `POST /predict/upload` - classify an uploaded image file.
pub async fn predict_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ClassificationResult>>> {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let (bytes, _) = read_upload(&mut multipart).await?;
    let result = state
        .with_pipeline(move |pipeline| {
            let image = ImageLoader::from_bytes(&bytes)?;
            Ok(pipeline.classify(&image)?)
        })
        .await?;

    info!(
        request_id,
        prediction = %result.label,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "predict upload served"
    );
    Ok(Json(ApiResponse::success(result, request_id)))
}

/// `POST /predict-with-gradcam` - classify and explain a base64-encoded image.
pub async fn gradcam_json(
    State(state): State<AppState>,
    Json(request): Json<GradcamRequest>,
) -> Result<Json<ApiResponse<GradcamResponse>>> {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    if request.image.is_empty() {
        return Err(ApiError::InvalidRequest("image field is empty".to_string()));
    }

    let target_class = request.target_class;
    let response = state
        .with_pipeline(move |pipeline| {
            let image = ImageLoader::from_base64(&request.image)?;
            explain_to_response(pipeline, &image, target_class)
        })
        .await?;

    info!(
        request_id,
        prediction = %response.classification.label,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "gradcam request served"
    );
    Ok(Json(ApiResponse::success(response, request_id)))
}

/// `POST /predict-with-gradcam/upload` - classify and explain an uploaded file.
///
/// An optional `target_class` text field selects the class to attribute.
pub async fn gradcam_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<GradcamResponse>>> {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let (bytes, target_class) = read_upload(&mut multipart).await?;
    let response = state
        .with_pipeline(move |pipeline| {
            let image = ImageLoader::from_bytes(&bytes)?;
            explain_to_response(pipeline, &image, target_class)
        })
        .await?;

    info!(
        request_id,
        prediction = %response.classification.label,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "gradcam upload served"
    );
    Ok(Json(ApiResponse::success(response, request_id)))
}

fn explain_to_response(
    pipeline: &histolens_infer::ExplainablePipeline<histolens_core::backend::Attribution>,
    image: &image::DynamicImage,
    target_class: Option<usize>,
) -> Result<GradcamResponse> {
    let explanation = pipeline.explain(image, target_class)?;
    let gradcam = png_data_uri(&explanation.overlay)?;
    Ok(GradcamResponse {
        classification: explanation.classification,
        gradcam,
    })
}

/// Pull the image bytes and optional target class out of a multipart form.
///
/// The image arrives under the `file` field. Unknown fields are ignored.
async fn read_upload(multipart: &mut Multipart) -> Result<(Vec<u8>, Option<usize>)> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut target_class: Option<usize> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") {
                        return Err(ApiError::InvalidRequest(format!(
                            "unsupported content type: {content_type}"
                        )));
                    }
                }
                let data = field.bytes().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("failed to read upload: {e}"))
                })?;
                bytes = Some(data.to_vec());
            }
            "target_class" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("failed to read target_class: {e}"))
                })?;
                let parsed = text.trim().parse::<usize>().map_err(|_| {
                    ApiError::InvalidRequest(format!("target_class is not a class index: {text:?}"))
                })?;
                target_class = Some(parsed);
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| {
        ApiError::InvalidRequest("multipart form is missing a `file` field".to_string())
    })?;
    if bytes.is_empty() {
        return Err(ApiError::InvalidRequest("uploaded file is empty".to_string()));
    }
    Ok((bytes, target_class))
}
