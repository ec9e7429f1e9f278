use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AuthError;
use crate::oauth::TokenResponse;

/// Refreshable OAuth2 credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Access token for API requests
    pub access_token: String,

    /// Optional refresh token for token renewal
    pub refresh_token: Option<String>,

    /// Token expiration timestamp (Unix timestamp)
    pub expires_at: i64,

    /// Scopes granted to this credential
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Check if the token needs refresh (within 5 minutes of expiry)
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - 300 // 5 minute buffer
    }

    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at
    }

    /// Fold a refresh response into this credential.
    ///
    /// Keeps the existing refresh token when the endpoint does not
    /// rotate it, which Google usually does not.
    pub fn apply_refresh(&mut self, response: &TokenResponse) {
        self.access_token = response.access_token.clone();
        if let Some(rotated) = &response.refresh_token {
            self.refresh_token = Some(rotated.clone());
        }
        self.expires_at = chrono::Utc::now().timestamp() + response.expires_in as i64;
    }
}

/// File-backed storage for the calendar credential.
///
/// The credential is written as pretty JSON at a configured path so an
/// operator can inspect or replace it by hand after running the
/// interactive authorizer.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's config directory
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aula")
            .join("credentials.json")
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored credential
    pub fn load(&self) -> Result<Credential, AuthError> {
        if !self.path.exists() {
            tracing::warn!(path = %self.path.display(), "no stored credential");
            return Err(AuthError::AuthorizationRequired);
        }

        let json = fs::read_to_string(&self.path)?;
        let credential: Credential = serde_json::from_str(&json)?;

        tracing::debug!(path = %self.path.display(), "loaded stored credential");
        Ok(credential)
    }

    /// Persist the credential, creating parent directories as needed
    pub fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(credential)?;
        fs::write(&self.path, json)?;

        tracing::debug!(path = %self.path.display(), "stored credential");
        Ok(())
    }

    /// Remove the stored credential if present
    pub fn delete(&self) -> Result<(), AuthError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            tracing::info!(path = %self.path.display(), "deleted stored credential");
        }
        Ok(())
    }
}
