//! Transactional email through the Resend HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::validation::ContactRequest;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email delivery is not configured")]
    NotConfigured,

    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one message and return the provider's id for it.
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError>;
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

pub struct ResendMailer {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_key: Option<String>, api_url: &str) -> Self {
        Self {
            http,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        let key = self.api_key.as_deref().ok_or(EmailError::NotConfigured)?;

        let response = self
            .http
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.id)
    }
}

fn paragraphs(text: &str) -> String {
    ammonia::clean_text(text.trim()).replace("&#10;", "<br>")
}

/// Acknowledgement sent back to the person who filled in the form.
pub fn acknowledgement(req: &ContactRequest, from: &str) -> OutgoingEmail {
    let name = ammonia::clean_text(req.name.trim());
    OutgoingEmail {
        from: from.to_string(),
        to: vec![req.email.trim().to_string()],
        subject: "Thanks for reaching out!".to_string(),
        html: format!(
            "<h2>Hi {name},</h2>\
             <p>Thanks for your message. I'll get back to you as soon as I can.</p>\
             <p>For reference, here is what you sent:</p>\
             <blockquote>{}</blockquote>",
            paragraphs(&req.message)
        ),
        reply_to: None,
    }
}

/// Notification to the site owner. Replies go straight to the sender.
pub fn notification(req: &ContactRequest, from: &str, to: &str) -> OutgoingEmail {
    let name = ammonia::clean_text(req.name.trim());
    let email = ammonia::clean_text(req.email.trim());
    OutgoingEmail {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: format!("New contact form message from {}", req.name.trim()),
        html: format!(
            "<h2>New message</h2>\
             <p><strong>Name:</strong> {name}</p>\
             <p><strong>Email:</strong> {email}</p>\
             <p><strong>Message:</strong></p>\
             <p>{}</p>",
            paragraphs(&req.message)
        ),
        reply_to: Some(req.email.trim().to_string()),
    }
}
