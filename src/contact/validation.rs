//! Contact form field checks. The spam heuristics are tuned by hand, not
//! trained, and will misfire on some legitimate input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MIN_MESSAGE_CHARS: usize = 10;
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Share of "special" characters above which text is treated as spam.
pub const MAX_SPECIAL_RATIO: f64 = 0.3;

/// Messages shorter than this get the gibberish check.
pub const SHORT_MESSAGE_CHARS: usize = 50;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap();
    static ref LOWERCASE_RUN: Regex = Regex::new(r"[a-z]{8,}").unwrap();
    static ref CONSONANT_RUN: Regex = Regex::new(r"(?i)[bcdfghjklmnpqrstvwxz]{6,}").unwrap();
    static ref WORD: Regex = Regex::new(r"[A-Za-z']+").unwrap();
}

static DISPOSABLE_DOMAINS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "10minutemail.com",
        "guerrillamail.com",
        "guerrillamail.net",
        "mailinator.com",
        "tempmail.com",
        "temp-mail.org",
        "throwawaymail.com",
        "yopmail.com",
        "getnada.com",
        "trashmail.com",
        "sharklasers.com",
        "dispostable.com",
        "maildrop.cc",
        "fakeinbox.com",
        "mintemail.com",
        "emailondeck.com",
        "mohmal.com",
        "tempinbox.com",
    ]
});

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "be", "can", "for", "have", "hello", "hey", "hi", "i", "in", "is",
    "it", "me", "my", "of", "on", "please", "thanks", "that", "the", "this", "to", "we", "with",
    "would", "you", "your",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub turnstile_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name, email, message and verification token are required")]
    MissingFields,

    #[error("Name must be at most 100 characters")]
    NameTooLong,

    #[error("Please provide a valid email address")]
    InvalidEmail,

    #[error("Disposable email addresses are not allowed")]
    DisposableEmail,

    #[error("Message must be between 10 and 5000 characters")]
    MessageLength,

    #[error("Name contains too many special characters")]
    NameSpecialCharacters,

    #[error("Message contains too many special characters")]
    MessageSpecialCharacters,

    #[error("Message appears to be spam. Please write a meaningful message")]
    Gibberish,
}

pub fn check_required(req: &ContactRequest) -> Result<(), ValidationError> {
    let missing = [&req.name, &req.email, &req.message, &req.turnstile_token]
        .iter()
        .any(|field| field.trim().is_empty());
    if missing {
        Err(ValidationError::MissingFields)
    } else {
        Ok(())
    }
}

fn email_domain(email: &str) -> Option<String> {
    email.rsplit_once('@').map(|(_, domain)| domain.to_lowercase())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.len() > MAX_EMAIL_CHARS || email.contains("..") || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }

    let domain = email_domain(email).ok_or(ValidationError::InvalidEmail)?;
    let disposable = DISPOSABLE_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")));
    if disposable {
        return Err(ValidationError::DisposableEmail);
    }
    Ok(())
}

fn is_special(c: char) -> bool {
    !(c.is_alphanumeric() || c.is_whitespace() || ".,!?'\"-()".contains(c))
}

/// Fraction of characters that are neither alphanumeric, whitespace nor
/// everyday punctuation.
pub fn special_char_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    text.chars().filter(|c| is_special(*c)).count() as f64 / total as f64
}

/// Keyboard-mash detector, only meaningful for short messages.
pub fn looks_like_gibberish(message: &str) -> bool {
    if message.chars().count() >= SHORT_MESSAGE_CHARS {
        return false;
    }

    let has_stopword = WORD
        .find_iter(message)
        .any(|w| STOPWORDS.contains(&w.as_str().to_lowercase().as_str()));

    (LOWERCASE_RUN.is_match(message) && !has_stopword) || CONSONANT_RUN.is_match(message)
}

/// Length and spam checks on name and message.
pub fn check_content(req: &ContactRequest) -> Result<(), ValidationError> {
    let name = req.name.trim();
    let message = req.message.trim();

    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong);
    }
    let message_chars = message.chars().count();
    if !(MIN_MESSAGE_CHARS..=MAX_MESSAGE_CHARS).contains(&message_chars) {
        return Err(ValidationError::MessageLength);
    }
    if special_char_ratio(name) > MAX_SPECIAL_RATIO {
        return Err(ValidationError::NameSpecialCharacters);
    }
    if special_char_ratio(message) > MAX_SPECIAL_RATIO {
        return Err(ValidationError::MessageSpecialCharacters);
    }
    if looks_like_gibberish(message) {
        return Err(ValidationError::Gibberish);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: name.into(),
            email: "jane@example.com".into(),
            message: message.into(),
            turnstile_token: "token".into(),
        }
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(
            check_required(&request("", "hello there")),
            Err(ValidationError::MissingFields)
        );
        let mut req = request("Jane", "hello there");
        req.turnstile_token = "  ".into();
        assert_eq!(check_required(&req), Err(ValidationError::MissingFields));
        assert!(check_required(&request("Jane", "hello there")).is_ok());
    }

    #[test]
    fn test_email_syntax() {
        assert_eq!(validate_email("not-an-email"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a@b"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a..b@x.com"), Err(ValidationError::InvalidEmail));
        assert!(validate_email("jane.doe+site@mail.example.co.uk").is_ok());
    }

    #[test]
    fn test_disposable_domains_rejected() {
        assert_eq!(
            validate_email("bot@mailinator.com"),
            Err(ValidationError::DisposableEmail)
        );
        assert_eq!(
            validate_email("bot@eu.YopMail.com"),
            Err(ValidationError::DisposableEmail)
        );
    }

    #[test]
    fn test_special_character_message_rejected() {
        let req = request(
            "Jane",
            "Buy now!!! http://x http://x http://x $$$ %%% &&&",
        );
        assert_eq!(
            check_content(&req),
            Err(ValidationError::MessageSpecialCharacters)
        );
    }

    #[test]
    fn test_special_character_name_rejected() {
        let req = request("$$@@##!!", "I would like to talk about a project.");
        assert_eq!(
            check_content(&req),
            Err(ValidationError::NameSpecialCharacters)
        );
    }

    #[test]
    fn test_gibberish_only_for_short_messages() {
        assert!(looks_like_gibberish("asdfghjklqwe"));
        assert!(looks_like_gibberish("Hey xkcdbrtvz"));
        assert!(!looks_like_gibberish("Hi, interested in collaborating"));
        assert!(!looks_like_gibberish(&format!("{} ok", "asdfghjklqwe".repeat(5))));
    }

    #[test]
    fn test_message_length_bounds() {
        assert_eq!(
            check_content(&request("Jane", "short")),
            Err(ValidationError::MessageLength)
        );
        assert_eq!(
            check_content(&request("Jane", &"a ".repeat(3000))),
            Err(ValidationError::MessageLength)
        );
    }

    #[test]
    fn test_legitimate_message_passes() {
        let req = request(
            "Jane O'Brien",
            "Hello! I'd like to discuss a freelance project with you.",
        );
        assert!(check_content(&req).is_ok());
    }
}
