use axum::response::Json;
use serde_json::{Value, json};

/// Health check handler
/// Returns a simple JSON response indicating the server is running
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/",
        responses((status = 200, description = "Server is running")),
        tag = "health"
    )
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "OK"
    }))
}
