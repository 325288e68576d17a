//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Defaults used when a variable is unset.
pub mod defaults {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 3001;
    pub const GITHUB_USERNAME: &str = "octocat";
    pub const GITHUB_API_URL: &str = "https://api.github.com";
    pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
    pub const GITHUB_CACHE_TTL_SECS: u64 = 3600;
    pub const BLOG_CONTENT_DIR: &str = "content/blog";
    pub const RESEND_API_URL: &str = "https://api.resend.com";
    pub const TURNSTILE_VERIFY_URL: &str =
        "https://challenges.cloudflare.com/turnstile/v0/siteverify";
    pub const CONTACT_FROM_EMAIL: &str = "Portfolio <onboarding@resend.dev>";
    pub const CONTACT_RATE_LIMIT: u64 = 5;
    pub const CONTACT_RATE_WINDOW_SECS: u64 = 15 * 60;
    pub const SITE_URL: &str = "http://localhost:3000";
    pub const SITE_TITLE: &str = "Blog";
    pub const SITE_DESCRIPTION: &str = "Latest articles and insights";
    pub const LOG_DIR: &str = "logs";
    pub const ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// GitHub aggregator settings.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub username: String,
    /// Personal access token. `None` runs the aggregator in degraded mode.
    pub token: Option<String>,
    pub api_url: String,
    pub graphql_url: String,
    pub cache_ttl: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            username: defaults::GITHUB_USERNAME.to_string(),
            token: None,
            api_url: defaults::GITHUB_API_URL.to_string(),
            graphql_url: defaults::GITHUB_GRAPHQL_URL.to_string(),
            cache_ttl: Duration::from_secs(defaults::GITHUB_CACHE_TTL_SECS),
        }
    }
}

/// Contact form settings.
#[derive(Debug, Clone)]
pub struct ContactConfig {
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub turnstile_secret: Option<String>,
    pub turnstile_verify_url: String,
    /// Owner inbox for notifications.
    pub to_email: Option<String>,
    pub from_email: String,
    pub rate_limit: u64,
    pub rate_window: Duration,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            resend_api_url: defaults::RESEND_API_URL.to_string(),
            turnstile_secret: None,
            turnstile_verify_url: defaults::TURNSTILE_VERIFY_URL.to_string(),
            to_email: None,
            from_email: defaults::CONTACT_FROM_EMAIL.to_string(),
            rate_limit: defaults::CONTACT_RATE_LIMIT,
            rate_window: Duration::from_secs(defaults::CONTACT_RATE_WINDOW_SECS),
        }
    }
}

/// RSS channel metadata.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub url: String,
    pub title: String,
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: defaults::SITE_URL.to_string(),
            title: defaults::SITE_TITLE.to_string(),
            description: defaults::SITE_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub blog_dir: PathBuf,
    /// CORS origins.
    pub allowed_origins: Vec<String>,
    /// Overrides the environment's default level when set.
    pub log_level: Option<String>,
    pub log_dir: PathBuf,
    pub github: GitHubConfig,
    pub contact: ContactConfig,
    pub site: SiteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            blog_dir: PathBuf::from(defaults::BLOG_CONTENT_DIR),
            allowed_origins: default_origins(),
            log_level: None,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            github: GitHubConfig::default(),
            contact: ContactConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

/// Read a variable, treating an empty or whitespace-only value as unset.
fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn default_origins() -> Vec<String> {
    defaults::ALLOWED_ORIGINS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `ALLOWED_ORIGINS` (comma-separated), then `FRONTEND_ORIGIN`, then the
/// local dev origins.
fn allowed_origins() -> Vec<String> {
    let listed: Vec<String> = var("ALLOWED_ORIGINS")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if !listed.is_empty() {
        return listed;
    }
    var("FRONTEND_ORIGIN")
        .map(|o| vec![o])
        .unwrap_or_else(default_origins)
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        let environment = var("ENVIRONMENT")
            .and_then(|s| Environment::parse(&s))
            .unwrap_or_default();

        let github = GitHubConfig {
            username: var("GITHUB_USERNAME")
                .unwrap_or_else(|| defaults::GITHUB_USERNAME.to_string()),
            token: var("GITHUB_TOKEN"),
            api_url: var("GITHUB_API_URL").unwrap_or_else(|| defaults::GITHUB_API_URL.to_string()),
            graphql_url: var("GITHUB_GRAPHQL_URL")
                .unwrap_or_else(|| defaults::GITHUB_GRAPHQL_URL.to_string()),
            cache_ttl: Duration::from_secs(parsed(
                "GITHUB_CACHE_TTL_SECS",
                defaults::GITHUB_CACHE_TTL_SECS,
            )),
        };

        let contact = ContactConfig {
            resend_api_key: var("RESEND_API_KEY"),
            resend_api_url: var("RESEND_API_URL")
                .unwrap_or_else(|| defaults::RESEND_API_URL.to_string()),
            turnstile_secret: var("TURNSTILE_SECRET_KEY"),
            turnstile_verify_url: var("TURNSTILE_VERIFY_URL")
                .unwrap_or_else(|| defaults::TURNSTILE_VERIFY_URL.to_string()),
            to_email: var("CONTACT_TO_EMAIL"),
            from_email: var("CONTACT_FROM_EMAIL")
                .unwrap_or_else(|| defaults::CONTACT_FROM_EMAIL.to_string()),
            rate_limit: parsed("CONTACT_RATE_LIMIT", defaults::CONTACT_RATE_LIMIT).max(1),
            rate_window: Duration::from_secs(parsed(
                "CONTACT_RATE_WINDOW_SECS",
                defaults::CONTACT_RATE_WINDOW_SECS,
            )),
        };

        let site = SiteConfig {
            url: var("SITE_URL")
                .unwrap_or_else(|| defaults::SITE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            title: var("SITE_TITLE").unwrap_or_else(|| defaults::SITE_TITLE.to_string()),
            description: var("SITE_DESCRIPTION")
                .unwrap_or_else(|| defaults::SITE_DESCRIPTION.to_string()),
        };

        Self {
            environment,
            host: var("HOST").unwrap_or_else(|| defaults::HOST.to_string()),
            port: parsed("PORT", defaults::PORT),
            blog_dir: var("BLOG_CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::BLOG_CONTENT_DIR)),
            allowed_origins: allowed_origins(),
            log_level: var("LOG_LEVEL"),
            log_dir: var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::LOG_DIR)),
            github,
            contact,
            site,
        }
    }

    /// Log warnings for settings that will break features at request time.
    pub fn warn_on_gaps(&self) {
        if self.github.token.is_none() {
            tracing::info!(
                "GITHUB_TOKEN not set; GitHub data uses public endpoints and a synthesized calendar"
            );
        }
        if self.environment.is_production() {
            if self.contact.resend_api_key.is_none() {
                tracing::warn!("RESEND_API_KEY is not set; contact submissions will fail");
            }
            if self.contact.turnstile_secret.is_none() {
                tracing::warn!("TURNSTILE_SECRET_KEY is not set; contact submissions will fail");
            }
            if self.contact.to_email.is_none() {
                tracing::warn!("CONTACT_TO_EMAIL is not set; owner notifications have no recipient");
            }
        }
    }
}
