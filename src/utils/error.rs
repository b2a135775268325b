use thiserror::Error;
use tracing::{error, warn};

use crate::catalog::CallbackError;
use crate::checkout::PayloadError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Transport error")]
    Transport(#[from] TransportError),

    #[error("Malformed invoice payload")]
    Payload(#[from] PayloadError),

    #[error("Malformed callback data")]
    Callback(#[from] CallbackError),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl BotError {
    pub fn code(&self) -> &'static str {
        match self {
            BotError::RateLimited => "RATE_LIMITED",
            BotError::NotFound(_) => "NOT_FOUND",
            BotError::Transport(_) => "TRANSPORT_ERROR",
            BotError::Payload(_) => "PAYLOAD_ERROR",
            BotError::Callback(_) => "CALLBACK_ERROR",
            BotError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Log internal details; user-facing text is composed at the call site
    /// and never carries these strings.
    pub fn log(&self) {
        match self {
            BotError::RateLimited => {
                warn!(code = self.code(), "Request rejected by rate limiter");
            }
            BotError::NotFound(msg) => {
                warn!(code = self.code(), message = %msg, "Recoverable error");
            }
            BotError::Transport(e) => {
                error!(code = self.code(), error = ?e, "Transport error");
            }
            BotError::Payload(e) => {
                error!(code = self.code(), error = ?e, "Rejected invoice payload");
            }
            BotError::Callback(e) => {
                error!(code = self.code(), error = ?e, "Rejected callback data");
            }
            BotError::Database(e) => {
                error!(code = self.code(), error = ?e, "Database error");
            }
        }
    }
}
