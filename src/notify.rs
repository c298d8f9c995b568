//! Transient user-facing notifications.

use serde::{Deserialize, Serialize};

use crate::ShopError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn new(level: Level, message: impl Into<String>) -> Self { Self { level, message: message.into() } }
    pub fn success(message: impl Into<String>) -> Self { Self::new(Level::Success, message) }
    pub fn info(message: impl Into<String>) -> Self { Self::new(Level::Info, message) }
    pub fn warning(message: impl Into<String>) -> Self { Self::new(Level::Warning, message) }
    pub fn error(message: impl Into<String>) -> Self { Self::new(Level::Error, message) }
}

impl From<&ShopError> for Notice {
    fn from(err: &ShopError) -> Self {
        match err {
            ShopError::NotSignedIn | ShopError::EmptyCart => Notice::warning(err.to_string()),
            // backend details stay in the logs
            ShopError::Storage(_) => Notice::error("Something went wrong. Please try again."),
            ShopError::Mail(_) => Notice::error("Failed to send message. Please try again or contact us directly."),
            _ => Notice::error(err.to_string()),
        }
    }
}
