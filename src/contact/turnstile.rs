//! Cloudflare Turnstile bot-challenge verification.

use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("bot verification is not configured")]
    NotConfigured,

    #[error("verification request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// `Ok(false)` means the token was checked and rejected.
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, ChallengeError>;
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct TurnstileVerifier {
    http: reqwest::Client,
    secret: Option<String>,
    verify_url: String,
}

impl TurnstileVerifier {
    pub fn new(http: reqwest::Client, secret: Option<String>, verify_url: impl Into<String>) -> Self {
        Self {
            http,
            secret,
            verify_url: verify_url.into(),
        }
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, ChallengeError> {
        let secret = self.secret.as_deref().ok_or(ChallengeError::NotConfigured)?;

        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let body: SiteverifyResponse = self
            .http
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !body.success {
            tracing::info!(codes = ?body.error_codes, "turnstile token rejected");
        }
        Ok(body.success)
    }
}
