//! Registry-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Cache error: {0}")]
    Cache(#[from] aula_core::CacheError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl RegistryError {
    /// Whether a later run has a chance of succeeding without changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Cache(_) => false,
        }
    }
}
