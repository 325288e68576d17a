//! Portfolio site backend: GitHub dashboard data, the MDX blog and the
//! contact form, served over one axum router.

pub mod blog;
pub mod config;
pub mod contact;
pub mod error;
pub mod github;
pub mod logging;
pub mod routes;
pub mod store;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::blog::BlogLoader;
use crate::config::Config;
use crate::contact::{
    ChallengeVerifier, ContactService, EmailSender, RateLimiter, ResendMailer, TurnstileVerifier,
};
use crate::github::{GitHubClient, GitHubService};
use crate::store::{MemoryStore, TtlStore};

/// Request bodies above this size are rejected with 413.
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub github: GitHubService,
    pub blog: BlogLoader,
    pub contact: ContactService,
}

impl AppState {
    /// Production wiring: Turnstile for the bot check, Resend for email.
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;

        let verifier = Arc::new(TurnstileVerifier::new(
            http.clone(),
            config.contact.turnstile_secret.clone(),
            config.contact.turnstile_verify_url.clone(),
        ));
        let mailer = Arc::new(ResendMailer::new(
            http,
            config.contact.resend_api_key.clone(),
            &config.contact.resend_api_url,
        ));

        Self::with_services(config, verifier, mailer)
    }

    /// Wire the state around caller-supplied contact seams.
    pub fn with_services(
        config: Config,
        verifier: Arc<dyn ChallengeVerifier>,
        mailer: Arc<dyn EmailSender>,
    ) -> Result<Self, reqwest::Error> {
        let store: Arc<dyn TtlStore> = Arc::new(MemoryStore::new());

        let github = GitHubService::new(
            GitHubClient::new(&config.github)?,
            store.clone(),
            config.github.cache_ttl,
        );
        let limiter = RateLimiter::new(
            store,
            config.contact.rate_limit,
            config.contact.rate_window,
        );
        let contact = ContactService::new(&config.contact, limiter, verifier, mailer);

        Ok(Self {
            blog: BlogLoader::new(config.blog_dir.clone()),
            github,
            contact,
            config: Arc::new(config),
        })
    }
}

/// CORS for the configured origins. Unparseable origins are skipped.
pub fn configure_cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the router with every route and middleware layer.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config.allowed_origins);

    Router::new()
        .route("/api/github", get(routes::github::get_github_data))
        .route("/api/blog", get(routes::blog::blog_index))
        .route("/api/blog/posts", get(routes::blog::list_posts))
        .route("/api/blog/tags", get(routes::blog::list_tags))
        .route("/api/blog/{slug}", get(routes::blog::get_post))
        .route("/api/recent-blogs", get(routes::blog::recent_blogs))
        .route("/api/contact", post(routes::contact::submit_contact))
        .route("/rss.xml", get(routes::rss::rss_feed))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Load configuration, install logging and serve until interrupted.
pub async fn run() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    // Dropping these stops the background log writers.
    let _log_guards = logging::init(&config);

    error::expose_internal_details(config.environment.is_development());
    routes::health::init_start_time();
    config.warn_on_gaps();

    if let Err(e) = tokio::fs::create_dir_all(&config.blog_dir).await {
        tracing::warn!(dir = %config.blog_dir.display(), error = %e, "could not create blog content directory");
    }

    let host = config.host.clone();
    let port = config.port;
    let state = AppState::from_config(config).map_err(io::Error::other)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}
