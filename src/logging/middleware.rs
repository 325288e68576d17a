use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};

/// Paths polled by load balancers. Their completion is logged at `debug`.
const PROBE_PREFIX: &str = "/health";

fn request_id(request: &Request) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Logs arrival at `info` and completion leveled by response status.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let req_id = request_id(&request);

    tracing::info!(request_id = %req_id, %method, %path, "incoming request");

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::error!(request_id = %req_id, %method, %path, status, elapsed_ms, "request completed with error");
    } else if response.status().is_client_error() {
        tracing::warn!(request_id = %req_id, %method, %path, status, elapsed_ms, "request completed with client error");
    } else if path.starts_with(PROBE_PREFIX) {
        tracing::debug!(request_id = %req_id, %method, %path, status, elapsed_ms, "request completed");
    } else {
        tracing::info!(request_id = %req_id, %method, %path, status, elapsed_ms, "request completed");
    }

    response
}

/// Assigns an `x-request-id` to requests that arrive without one.
pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Copies the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
