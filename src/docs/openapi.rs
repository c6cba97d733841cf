//! OpenAPI specification and documentation
//!
//! This module provides OpenAPI documentation for the voxrelay API.
//! It is only compiled when the `openapi` feature is enabled.

use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::core::orchestrator::{ConversionState, ConversionStatus};
use crate::core::storage::AudioFileRecord;
use crate::core::tts::{
    AudioFormat, AudioSettings, PartialAudioSettings, ProviderDescriptor, ProviderStatus,
    ResultMetadata,
};
use crate::handlers::{
    audio::AudioInfo,
    tts::{AudioContent, ConversionResultView, ConvertRequest},
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "voxrelay API",
        version = "0.1.0",
        description = "Text-to-speech relay with provider failover and range-aware audio delivery"
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development")
    ),
    paths(
        crate::handlers::api::health_check,
        crate::handlers::tts::convert_handler,
        crate::handlers::tts::status_handler,
        crate::handlers::tts::result_handler,
        crate::handlers::tts::providers_handler,
        crate::handlers::tts::voices_handler,
        crate::handlers::audio::stream_handler,
        crate::handlers::audio::download_handler,
        crate::handlers::audio::info_handler,
        crate::handlers::audio::delete_handler,
    ),
    components(schemas(
        ConvertRequest,
        AudioContent,
        ConversionResultView,
        ConversionStatus,
        ConversionState,
        AudioInfo,
        AudioFileRecord,
        AudioFormat,
        AudioSettings,
        PartialAudioSettings,
        ProviderDescriptor,
        ProviderStatus,
        ResultMetadata,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tts", description = "Text-to-speech conversion and provider information"),
        (name = "audio", description = "Stored audio playback, download and management")
    )
)]
pub struct ApiDoc;

/// Create OpenAPI documentation routes
///
/// Routes:
/// - `GET /docs/openapi.json` - OpenAPI spec as JSON
/// - `GET /docs/openapi.yaml` - OpenAPI spec as YAML
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/docs/openapi.json", get(openapi_json_handler))
        .route("/docs/openapi.yaml", get(openapi_yaml_handler))
}

async fn openapi_json_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn openapi_yaml_handler() -> ([(axum::http::header::HeaderName, &'static str); 1], String) {
    let yaml = spec_yaml().unwrap_or_else(|e| format!("Error generating YAML: {e}"));
    ([(axum::http::header::CONTENT_TYPE, "application/yaml")], yaml)
}

/// Get OpenAPI spec as YAML string, used by the `openapi` CLI command
pub fn spec_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&ApiDoc::openapi())
}

/// Get OpenAPI spec as JSON string
pub fn spec_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ApiDoc::openapi())
}
