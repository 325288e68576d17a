use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::AppState;

/// Lets a CDN keep a good snapshot for an hour and serve it stale for a day.
pub const CACHE_CONTROL: &str = "public, s-maxage=3600, stale-while-revalidate=86400";

/// GET /api/github
/// Always the full snapshot shape. On total upstream failure the body also
/// carries `error`, the status is 500 and nothing downstream may cache it.
pub async fn get_github_data(State(state): State<AppState>) -> Response {
    let data = state.github.snapshot().await;

    if data.is_error() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CACHE_CONTROL, "no-store")],
            Json(data),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, CACHE_CONTROL)],
        Json(data),
    )
        .into_response()
}
