use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use moodcam_core::analysis::domain::mood::MoodResult;
use moodcam_core::analysis::domain::wire::{AnalyzeRequest, FeedbackRequest, FeedbackResponse};
use moodcam_core::analysis::infrastructure::vision_model_transport::VisionModelTransport;
use moodcam_core::analysis::mood_analysis_client::MoodAnalysisClient;
use moodcam_core::capture::domain::image_payload::ImagePayload;
use moodcam_core::feedback::domain::feedback_store::{FeedbackRecord, LearningType};
use moodcam_core::shared::constants::{ANONYMOUS_SESSION, PROMPT_VERSION};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(ApiError::InvalidJson)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// `POST /api/analyze`: classify one captured image.
pub async fn analyze(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<MoodResult>> {
    let request: AnalyzeRequest = parse_body(&body)?;
    if request.image_data.trim().is_empty() {
        return Err(ApiError::MissingImage);
    }

    let vision = state.config.vision.clone();
    let payload = ImagePayload::from_data_uri(request.image_data, Utc::now());
    let session_id = request.session_id.unwrap_or_default();
    let corrections = request.feedback;

    // The vision transport blocks on its HTTP call.
    let mut result = tokio::task::spawn_blocking(move || {
        MoodAnalysisClient::new(Box::new(VisionModelTransport::new(vision))).analyze_for_session(
            &session_id,
            &payload,
            corrections.as_ref(),
        )
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    result
        .version
        .get_or_insert_with(|| PROMPT_VERSION.to_string());
    log::info!(
        "Classified {} ({}%) for session {}",
        result.mood,
        result.confidence,
        result.session_id
    );
    Ok(Json(result))
}

/// `POST /api/feedback`: acknowledge a user's verdict on a result.
///
/// Records are logged only; nothing is stored server-side.
pub async fn feedback(body: Bytes) -> ApiResult<Json<FeedbackResponse>> {
    let request: FeedbackRequest = parse_body(&body)?;
    let (Some(predicted), Some(actual)) = (request.predicted_mood, request.actual_mood) else {
        return Err(ApiError::MissingMoods);
    };

    let learning_type = LearningType::between(predicted, actual);
    let record = FeedbackRecord {
        session_id: request
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_SESSION.to_string()),
        predicted_mood: predicted,
        actual_mood: actual,
        confidence: request.confidence.unwrap_or_default(),
        image_fingerprint: request.image_hash.unwrap_or_default(),
        notes: request.notes,
        timestamp: request.timestamp.unwrap_or_else(Utc::now),
        learning_type,
    };
    match serde_json::to_string(&record) {
        Ok(json) => log::info!("Learning feedback received: {json}"),
        Err(e) => log::warn!("Could not serialize feedback record: {e}"),
    }

    Ok(Json(FeedbackResponse {
        success: true,
        message: Some("Feedback recorded for learning".to_string()),
        learning_type,
    }))
}
