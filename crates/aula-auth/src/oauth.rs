//! Google OAuth2 token endpoint client for unattended refresh.
//!
//! The first-time consent flow is out of scope here: an interactive
//! authorizer stores the initial credential, and this module only turns
//! refresh tokens into fresh access tokens.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

pub struct OAuthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl OAuthClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Point at a different token endpoint (mock servers, proxies).
    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Exchange a refresh token for a fresh access token.
    #[tracing::instrument(skip(self, refresh_token), level = "info")]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed { status, detail });
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}
