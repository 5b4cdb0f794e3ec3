use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const MIN_MESSAGE_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Reason {
    #[default]
    Contract,
    Collab,
    Speaking,
    Question,
    Other,
    /// Anything the form doesn't offer; relayed as sent.
    Custom(String),
}

impl From<String> for Reason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "contract" => Reason::Contract,
            "collab" => Reason::Collab,
            "speaking" => Reason::Speaking,
            "question" => Reason::Question,
            "other" => Reason::Other,
            _ => Reason::Custom(value),
        }
    }
}

impl Reason {
    pub fn label(&self) -> &str {
        match self {
            Reason::Contract => "Contract work",
            Reason::Collab => "Collaboration",
            Reason::Speaking => "Speaking / interview",
            Reason::Question => "General question",
            Reason::Other => "Other",
            Reason::Custom(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub reason: Reason,
    #[serde(default)]
    pub message: String,
    /// Hidden field. People never see it, so anything in it came from a bot.
    #[serde(default)]
    pub website: String,
}

/// JSON body accepted by the form relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayPayload {
    pub name: String,
    pub email: String,
    pub reason: String,
    pub message: String,
    #[serde(rename = "_subject")]
    pub subject: String,
}

impl ContactForm {
    pub fn is_spam(&self) -> bool {
        !self.website.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if !is_email(&self.email) || self.message.trim().chars().count() < MIN_MESSAGE_LEN {
            return Err(AppError::BadRequest(
                "Please enter a valid email and a message.".into(),
            ));
        }
        Ok(())
    }

    pub fn payload(&self) -> RelayPayload {
        let label = self.reason.label();
        RelayPayload {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            reason: label.to_string(),
            message: self.message.trim().to_string(),
            subject: format!("New message - {}", label),
        }
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Loose `local@domain.tld` shape check.
pub fn is_email(input: &str) -> bool {
    EMAIL_RE.is_match(input.trim())
}
