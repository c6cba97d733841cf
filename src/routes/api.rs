use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, audio, tts};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// Routes:
/// - `GET /` health check
/// - `POST /tts/convert`, `GET /tts/status/{id}`, `GET /tts/result/{id}`
/// - `GET /tts/providers`, `GET /tts/voices`
/// - `GET /audio/stream/{id}` (Range-aware), `GET|DELETE /audio/{id}`, `GET /audio/{id}/info`
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/tts/convert", post(tts::convert_handler))
        .route("/tts/status/{id}", get(tts::status_handler))
        .route("/tts/result/{id}", get(tts::result_handler))
        .route("/tts/providers", get(tts::providers_handler))
        .route("/tts/voices", get(tts::voices_handler))
        .route("/audio/stream/{id}", get(audio::stream_handler))
        .route(
            "/audio/{id}",
            get(audio::download_handler).delete(audio::delete_handler),
        )
        .route("/audio/{id}/info", get(audio::info_handler))
        .layer(TraceLayer::new_for_http())
}

/// Build the complete application with state attached
pub fn create_app(state: Arc<AppState>) -> Router {
    let router = create_api_router();

    #[cfg(feature = "openapi")]
    let router = router.merge(crate::docs::openapi::router());

    router.with_state(state)
}
