use axum::http::StatusCode;

pub mod research;

// health check handler
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}
