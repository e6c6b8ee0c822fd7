//! Request handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use emotion_core::classification::domain::emotion_distribution::EmotionDistribution;
use emotion_core::pipeline::predict_emotion_use_case::Prediction;
use emotion_core::shared::constants::NO_FACE_LABEL;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NO_IMAGE_MESSAGE: &str = "No image data provided";

#[derive(Serialize)]
pub struct IndexResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub cascade_loaded: bool,
    pub endpoint: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: &'static str,
    pub cascade: &'static str,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub image: Option<Value>,
}

/// Either a classified face or the bare `"No Face"` sentinel.
#[derive(Serialize)]
pub struct PredictResponse {
    pub emotion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_predictions: Option<EmotionDistribution>,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        match prediction {
            Prediction::NoFace => Self {
                emotion: NO_FACE_LABEL.to_string(),
                confidence: None,
                all_predictions: None,
            },
            Prediction::Emotion {
                emotion,
                confidence,
                distribution,
            } => Self {
                emotion: emotion.label().to_string(),
                confidence: Some(confidence),
                all_predictions: Some(distribution),
            },
        }
    }
}

fn loaded(flag: bool) -> &'static str {
    if flag {
        "loaded"
    } else {
        "not loaded"
    }
}

/// Service banner with model status.
pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    let models = state.models();
    Json(IndexResponse {
        status: "Emotion detection server is running",
        model_loaded: models.classifier_loaded(),
        cascade_loaded: models.detector_loaded(),
        endpoint: "/predict",
    })
}

/// Liveness check; also reports which models are usable.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let models = state.models();
    Json(HealthResponse {
        status: "ok",
        model: loaded(models.classifier_loaded()),
        cascade: loaded(models.detector_loaded()),
    })
}

/// CORS preflight answer for every route.
pub async fn preflight() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

/// Classify the expression of the first face in a base64 image.
///
/// The body is parsed by hand rather than through the `Json` extractor so
/// that a missing classifier is reported before any body problem, and body
/// problems come back in the service's own error shape.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<PredictResponse>> {
    state.predictor.ensure_ready()?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request(NO_IMAGE_MESSAGE));
    }
    let request: PredictRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
    let image = match request.image {
        Some(Value::String(image)) => image,
        Some(Value::Null) | None => return Err(ApiError::bad_request(NO_IMAGE_MESSAGE)),
        Some(_) => return Err(ApiError::bad_request("Field 'image' must be a base64 string")),
    };
    if image.is_empty() {
        return Err(ApiError::bad_request(NO_IMAGE_MESSAGE));
    }

    let predictor = Arc::clone(&state.predictor);
    let slots = Arc::clone(&state.prediction_slots);
    let run = async move {
        let permit = slots
            .acquire_owned()
            .await
            .map_err(|e| ApiError::internal(format!("Prediction unavailable: {e}")))?;
        // The permit moves into the blocking task: a prediction abandoned by
        // the timeout below keeps its slot until it really finishes.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            predictor.execute(&image)
        })
        .await
        .map_err(|join_error| ApiError::internal(format!("Prediction failed: {join_error}")))
    };
    let prediction = match tokio::time::timeout(state.request_timeout, run).await {
        Ok(result) => result??,
        Err(_) => {
            return Err(ApiError::internal(format!(
                "Prediction timed out after {}s",
                state.request_timeout.as_secs()
            )))
        }
    };

    Ok(Json(prediction.into()))
}
