//! # Audio Delivery
//!
//! Turns stored audio into HTTP responses. Streaming honours single
//! `bytes=` ranges so players can seek; downloads always return the whole
//! file as an attachment.
//!
//! | Request                        | Response                                   |
//! |--------------------------------|--------------------------------------------|
//! | no `Range`                     | 200, full body, `Accept-Ranges: bytes`     |
//! | `Range: bytes=s-e` in bounds   | 206, `Content-Range: bytes s-e/size`       |
//! | `Range` out of bounds          | 416, `Content-Range: bytes */size`         |
//! | malformed `Range`              | 400 `invalid_range_header`                 |
//! | unknown id                     | 404 `not_found`                            |

pub mod range;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

pub use range::{ByteRange, RangeParseError};

use crate::core::storage::{AudioFileRecord, AudioStore};
use crate::errors::{AppError, AppResult};

/// `Cache-Control` sent with streamed audio
pub const STREAM_CACHE_CONTROL: &str = "public, max-age=3600";

/// Attachment filename: `tts-audio-{YYYYMMDD-HHMMSS}-{id}.{ext}`
pub fn download_filename(record: &AudioFileRecord) -> String {
    format!(
        "tts-audio-{}-{}.{}",
        record.created_at.format("%Y%m%d-%H%M%S"),
        record.id,
        record.format.extension()
    )
}

fn base_headers(record: &AudioFileRecord, content_length: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(record.format.mime_type()),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers
}

/// Serve `id` for playback, honouring an optional `Range` header
pub async fn stream_audio(
    store: &AudioStore,
    id: &str,
    range_header: Option<&HeaderValue>,
) -> AppResult<Response> {
    // Parse before touching storage so malformed headers are always 400
    let requested = range_header
        .map(|value| {
            value
                .to_str()
                .map_err(|_| RangeParseError::NotAscii)
                .and_then(ByteRange::parse)
                .map_err(|e| AppError::InvalidRangeHeader(e.to_string()))
        })
        .transpose()?;

    let record = store.require_metadata(id).await?;

    let mut response = match requested {
        None => {
            let body = store.get(id).await?;
            let headers = base_headers(&record, body.len() as u64);
            (StatusCode::OK, headers, Body::from(body)).into_response()
        }
        Some(range) => {
            let (start, end) = range
                .resolve(record.size)
                .ok_or(AppError::RangeNotSatisfiable { size: record.size })?;
            let body = store.get_range(id, start, end).await?;

            debug!(
                "Serving range {}-{} of {} ({} bytes)",
                start, end, id, record.size
            );

            let mut headers = base_headers(&record, end - start + 1);
            let content_range = format!("bytes {start}-{end}/{}", record.size);
            if let Ok(value) = HeaderValue::from_str(&content_range) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            (StatusCode::PARTIAL_CONTENT, headers, Body::from(body)).into_response()
        }
    };

    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(STREAM_CACHE_CONTROL),
    );
    Ok(response)
}

/// Serve the whole file as an attachment
pub async fn download_audio(store: &AudioStore, id: &str) -> AppResult<Response> {
    let record = store.require_metadata(id).await?;
    let body = store.get(id).await?;

    let mut headers = base_headers(&record, body.len() as u64);
    let disposition = format!("attachment; filename=\"{}\"", download_filename(&record));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, Body::from(body)).into_response())
}
