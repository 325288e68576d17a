use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};

use crate::contact::{client_ip, ContactRequest, ContactResponse};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// POST /api/contact
/// The rate limit is counted before the body is looked at.
pub async fn submit_contact(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> AppResult<Json<ContactResponse>> {
    let ip = client_ip(&headers, Some(addr));
    state.contact.admit(&ip).await?;

    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected contact body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    state.contact.process(&ip, req).await.map(Json)
}
