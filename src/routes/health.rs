/**
 * Health Routes
 * Liveness, dependency summary and readiness for load balancers
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;

lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Pin the uptime origin to server start rather than first health request.
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

fn uptime_secs() -> u64 {
    SERVER_START.elapsed().as_secs()
}

/// One dependency's state
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ServiceCheck {
    fn new(healthy: bool, detail: impl Into<String>) -> Self {
        Self {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub github: ServiceCheck,
    pub blog: ServiceCheck,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub environment: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

/// GET /health
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed
/// Degraded dependencies are reported but never fail the request.
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let github = if state.github.client().has_token() {
        ServiceCheck::new(true, "token configured")
    } else {
        ServiceCheck::new(false, "no token; public endpoints and synthesized calendar")
    };

    let blog = if state.blog.is_readable().await {
        ServiceCheck::new(true, state.blog.dir().display().to_string())
    } else {
        ServiceCheck::new(
            false,
            format!("{} is not readable", state.blog.dir().display()),
        )
    };

    Json(DetailedHealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: uptime_secs(),
        environment: state.config.environment.to_string(),
        checks: HealthChecks { github, blog },
    })
}

/// GET /health/ready
/// Ready once the blog content directory can be listed.
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.blog.is_readable().await;

    let response = ReadyResponse {
        status: if ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: uptime_secs(),
        reason: (!ready).then(|| "Blog content directory is not readable".to_string()),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{test_app, test_state};
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        init_start_time();
        let tmp = tempfile::TempDir::new().unwrap();
        let (state, _) = test_state(tmp.path(), "http://127.0.0.1:9");
        let (status, body) = get_json::<SimpleHealthResponse>(test_app(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_detailed_reports_dependencies() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (state, _) = test_state(tmp.path(), "http://127.0.0.1:9");
        let (status, body) =
            get_json::<DetailedHealthResponse>(test_app(state), "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.github.status, "healthy");
        assert_eq!(body.checks.blog.status, "healthy");
        assert_eq!(body.environment, "development");
    }

    #[tokio::test]
    async fn test_health_ready_when_blog_dir_readable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (state, _) = test_state(tmp.path(), "http://127.0.0.1:9");
        let (status, body) = get_json::<ReadyResponse>(test_app(state), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
        assert!(body.reason.is_none());
    }

    #[tokio::test]
    async fn test_health_not_ready_without_blog_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("absent");
        let (state, _) = test_state(&missing, "http://127.0.0.1:9");
        let (status, body) = get_json::<ReadyResponse>(test_app(state), "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "not ready");
    }
}
