//! Auth-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization required: no usable credential is stored")]
    AuthorizationRequired,

    #[error("Token refresh failed ({status}): {detail}")]
    RefreshFailed { status: u16, detail: String },

    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Credential encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AuthError {
    /// Whether the failure sticks until a human re-authorizes.
    ///
    /// Endpoint 4xx answers mean the grant itself is dead (revoked or
    /// expired refresh token); 5xx answers and transport failures are
    /// worth retrying on a later run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::AuthorizationRequired => true,
            Self::RefreshFailed { status, .. } => *status < 500,
            Self::Storage(_) | Self::Encoding(_) | Self::Network(_) => false,
        }
    }
}
