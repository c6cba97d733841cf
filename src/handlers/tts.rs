use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::orchestrator::{ConversionOutcome, ConversionStatus};
use crate::core::tts::{
    AudioFormat, ConversionResult, PartialAudioSettings, ProviderDescriptor, ResultMetadata,
};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Request body for the convert endpoint
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConvertRequest {
    /// The text to synthesize (1 to 2000 characters)
    #[cfg_attr(feature = "openapi", schema(example = "Hello, world!"))]
    pub content: String,
    /// Playback settings; missing fields take defaults
    #[serde(default)]
    pub settings: Option<PartialAudioSettings>,
}

/// Descriptor of converted audio returned to clients
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AudioContent {
    pub id: String,
    /// Range-aware playback URL
    #[cfg_attr(feature = "openapi", schema(example = "/audio/stream/550e8400-e29b-41d4-a716-446655440000"))]
    pub audio_url: String,
    /// Attachment download URL
    pub download_url: String,
    /// Estimated duration in seconds
    pub duration: f64,
    pub format: AudioFormat,
    /// Size in bytes
    pub size: u64,
    pub metadata: ResultMetadata,
}

impl From<ConversionOutcome> for AudioContent {
    fn from(outcome: ConversionOutcome) -> Self {
        Self {
            audio_url: format!("/audio/stream/{}", outcome.id),
            download_url: format!("/audio/{}", outcome.id),
            duration: outcome.result.duration,
            format: outcome.result.format,
            size: outcome.record.size,
            metadata: outcome.result.metadata.clone(),
            id: outcome.id,
        }
    }
}

/// A completed conversion without its audio bytes
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConversionResultView {
    pub id: String,
    pub duration: f64,
    pub format: AudioFormat,
    pub size: u64,
    pub metadata: ResultMetadata,
}

impl ConversionResultView {
    fn new(id: String, result: &ConversionResult) -> Self {
        Self {
            id,
            duration: result.duration,
            format: result.format,
            size: result.audio_buffer.len() as u64,
            metadata: result.metadata.clone(),
        }
    }
}

/// Voice identifiers per provider
pub type VoicesResponse = BTreeMap<String, Vec<String>>;

/// Handler for the /tts/convert endpoint
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/tts/convert",
        request_body = ConvertRequest,
        responses(
            (status = 200, description = "Audio generated and stored", body = AudioContent),
            (status = 400, description = "Empty or over-length content, or invalid settings"),
            (status = 502, description = "Last provider attempt failed"),
            (status = 503, description = "No provider available"),
            (status = 504, description = "Last provider attempt timed out")
        ),
        tag = "tts"
    )
)]
pub async fn convert_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> AppResult<Json<AudioContent>> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    info!(
        "Convert request received - content length: {} chars",
        request.content.chars().count()
    );

    let outcome = state
        .orchestrator()
        .convert(&request.content, request.settings)
        .await?;

    info!(
        "Conversion {} completed by {} ({} bytes)",
        outcome.id, outcome.result.metadata.tts_service, outcome.record.size
    );

    Ok(Json(AudioContent::from(outcome)))
}

/// Handler for the /tts/status/{id} endpoint
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/tts/status/{id}",
        params(("id" = String, Path, description = "Conversion id")),
        responses(
            (status = 200, description = "Current conversion status", body = ConversionStatus),
            (status = 404, description = "Unknown or pruned conversion")
        ),
        tag = "tts"
    )
)]
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ConversionStatus>> {
    Ok(Json(state.orchestrator().get_status(&id)?))
}

/// Handler for the /tts/result/{id} endpoint
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/tts/result/{id}",
        params(("id" = String, Path, description = "Conversion id")),
        responses(
            (status = 200, description = "Completed conversion", body = ConversionResultView),
            (status = 404, description = "Conversion unknown or not completed")
        ),
        tag = "tts"
    )
)]
pub async fn result_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ConversionResultView>> {
    let result = state.orchestrator().get_result(&id)?;
    Ok(Json(ConversionResultView::new(id, &result)))
}

/// Handler for the /tts/providers endpoint
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/tts/providers",
        responses(
            (status = 200, description = "Providers in priority order", body = Vec<ProviderDescriptor>)
        ),
        tag = "tts"
    )
)]
pub async fn providers_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.orchestrator().provider_statuses())
}

/// Handler for the /tts/voices endpoint
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/tts/voices",
        responses(
            (status = 200, description = "Voice ids keyed by provider name", body = BTreeMap<String, Vec<String>>)
        ),
        tag = "tts"
    )
)]
pub async fn voices_handler(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    Json(state.orchestrator().voices().await)
}
