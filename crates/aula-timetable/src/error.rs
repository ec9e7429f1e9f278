//! Timetable-feed error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimetableError {
    #[error("Feed API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Unparseable feed value for {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("Cache error: {0}")]
    Cache(#[from] aula_core::CacheError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl TimetableError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Parse { .. } | Self::Cache(_) => false,
        }
    }
}
