//! Contact form pipeline.
//!
//! A submission passes through the rate limiter, the required-field check,
//! the bot challenge, email validation and the spam heuristics, in that
//! order. The first failure ends the request; nothing is sent unless every
//! check passes.

pub mod email;
pub mod rate_limit;
pub mod turnstile;
pub mod validation;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use email::{EmailError, EmailSender, OutgoingEmail, ResendMailer};
pub use rate_limit::{client_ip, RateDecision, RateLimiter};
pub use turnstile::{ChallengeError, ChallengeVerifier, TurnstileVerifier};
pub use validation::{ContactRequest, ValidationError};

use crate::config::ContactConfig;
use crate::error::{AppError, AppResult};

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::NotConfigured => AppError::Internal(err.to_string()),
            other => {
                tracing::error!(error = %other, "contact email delivery failed");
                AppError::Upstream("Failed to send message. Please try again later.".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub message: String,
    pub user_email_id: String,
    pub notification_email_id: String,
}

#[derive(Clone)]
pub struct ContactService {
    limiter: RateLimiter,
    verifier: Arc<dyn ChallengeVerifier>,
    mailer: Arc<dyn EmailSender>,
    from_email: String,
    to_email: Option<String>,
}

impl ContactService {
    pub fn new(
        config: &ContactConfig,
        limiter: RateLimiter,
        verifier: Arc<dyn ChallengeVerifier>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            limiter,
            verifier,
            mailer,
            from_email: config.from_email.clone(),
            to_email: config.to_email.clone(),
        }
    }

    /// Count the request against `ip`. Runs before the body is parsed so
    /// malformed submissions are limited too.
    pub async fn admit(&self, ip: &str) -> AppResult<()> {
        match self.limiter.check(ip).await {
            RateDecision::Allowed { .. } => Ok(()),
            RateDecision::Limited { retry_after } => Err(AppError::RateLimited(
                rate_limit::retry_message(retry_after),
            )),
        }
    }

    /// [`Self::admit`] followed by [`Self::process`].
    pub async fn submit(&self, ip: &str, req: ContactRequest) -> AppResult<ContactResponse> {
        self.admit(ip).await?;
        self.process(ip, req).await
    }

    /// Everything after the rate limit: field checks, bot challenge, email
    /// and spam checks, then both sends.
    pub async fn process(&self, ip: &str, req: ContactRequest) -> AppResult<ContactResponse> {
        validation::check_required(&req)?;

        match self.verifier.verify(req.turnstile_token.trim(), Some(ip)).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(AppError::Forbidden(
                    "Bot verification failed. Please try again.".to_string(),
                ))
            }
            Err(ChallengeError::NotConfigured) => {
                return Err(AppError::Internal(
                    ChallengeError::NotConfigured.to_string(),
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "turnstile verification unavailable");
                return Err(AppError::Forbidden(
                    "Bot verification failed. Please try again.".to_string(),
                ));
            }
        }

        validation::validate_email(&req.email)?;
        validation::check_content(&req)?;

        let to = self
            .to_email
            .as_deref()
            .ok_or(EmailError::NotConfigured)?;

        let user_email_id = self
            .mailer
            .send(&email::acknowledgement(&req, &self.from_email))
            .await?;
        let notification_email_id = self
            .mailer
            .send(&email::notification(&req, &self.from_email, to))
            .await?;

        tracing::info!(ip = %ip, "contact message delivered");

        Ok(ContactResponse {
            message: "Message sent successfully!".to_string(),
            user_email_id,
            notification_email_id,
        })
    }
}
