use serde::{Deserialize, Serialize};

use super::templates::EngagementMessage;

/// Outbound mail hook (SMTP or any other transport).
pub trait Mailer: Send + Sync {
    fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Inbox check used to detect candidate replies.
pub trait ReplyProbe: Send + Sync {
    fn check_reply(&self, from_address: &str, since_minutes: u32)
        -> Result<ReplyCheck, NotifyError>;
}

/// Optional text generator that can replace the deterministic templates.
pub trait MessageAuthor: Send + Sync {
    fn generate_message(&self, request: &AuthoringRequest)
        -> Result<EngagementMessage, NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyCheck {
    pub found: bool,
    pub detail: String,
}

impl ReplyCheck {
    pub fn found(detail: impl Into<String>) -> Self {
        Self {
            found: true,
            detail: detail.into(),
        }
    }

    pub fn missing(detail: impl Into<String>) -> Self {
        Self {
            found: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoringRequest {
    pub name: String,
    pub role: String,
    pub day_number: u32,
    pub company: String,
}

/// Notification transport error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("invalid mail address: {0}")]
    InvalidAddress(String),
    #[error("message authoring failed: {0}")]
    Authoring(String),
}
