use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::core::tts::AudioFormat;
use crate::delivery;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Stored audio description with derived URLs
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub id: String,
    pub format: AudioFormat,
    /// Size in bytes
    pub size: u64,
    /// Estimated duration in seconds
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "openapi", schema(example = "audio/mpeg"))]
    pub mime_type: String,
    pub stream_url: String,
    pub download_url: String,
}

/// Range-aware playback of stored audio
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/audio/stream/{id}",
        params(
            ("id" = String, Path, description = "Audio id"),
            ("Range" = Option<String>, Header, description = "Single byte range, e.g. bytes=0-1023")
        ),
        responses(
            (status = 200, description = "Full audio body"),
            (status = 206, description = "Requested byte range",
                headers(("Content-Range" = String, description = "bytes start-end/size"))
            ),
            (status = 400, description = "Malformed Range header or invalid id"),
            (status = 404, description = "Audio not found"),
            (status = 416, description = "Range outside the file")
        ),
        tag = "audio"
    )
)]
pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let store = state.store();
    delivery::stream_audio(&store, &id, headers.get(header::RANGE)).await
}

/// Download stored audio as an attachment
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/audio/{id}",
        params(("id" = String, Path, description = "Audio id")),
        responses(
            (status = 200, description = "Audio file",
                headers(("Content-Disposition" = String, description = "Suggested filename for download"))
            ),
            (status = 404, description = "Audio not found")
        ),
        tag = "audio"
    )
)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    info!("Audio download requested - id={}", id);
    let store = state.store();
    delivery::download_audio(&store, &id).await
}

/// Metadata and URLs for stored audio
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/audio/{id}/info",
        params(("id" = String, Path, description = "Audio id")),
        responses(
            (status = 200, description = "Audio metadata", body = AudioInfo),
            (status = 404, description = "Audio not found")
        ),
        tag = "audio"
    )
)]
pub async fn info_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<AudioInfo>> {
    let record = state.store().require_metadata(&id).await?;

    Ok(Json(AudioInfo {
        mime_type: record.format.mime_type().to_string(),
        stream_url: format!("/audio/stream/{}", record.id),
        download_url: format!("/audio/{}", record.id),
        id: record.id,
        format: record.format,
        size: record.size,
        duration: record.duration,
        created_at: record.created_at,
    }))
}

/// Delete stored audio
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        delete,
        path = "/audio/{id}",
        params(("id" = String, Path, description = "Audio id")),
        responses(
            (status = 204, description = "Audio deleted"),
            (status = 404, description = "Audio not found")
        ),
        tag = "audio"
    )
)]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if state.store().delete(&id).await? {
        info!("Deleted audio {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Audio {id} not found")))
    }
}
