//! Calendar-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Calendar API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Auth error: {0}")]
    Auth(#[from] aula_auth::AuthError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl CalendarError {
    /// Whether this error should trigger a token refresh and retry.
    ///
    /// `Auth` is excluded on purpose: it means the refresh machinery
    /// itself already failed.
    #[must_use]
    pub fn should_refresh_token(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::AuthRequired)
    }

    /// Whether this error is retryable on a later run.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Auth(err) => !err.is_terminal(),
            Self::AuthRequired | Self::TokenExpired | Self::EventNotFound(_) => false,
        }
    }
}
