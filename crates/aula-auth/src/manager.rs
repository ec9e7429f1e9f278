//! Token lifecycle shared by every calendar call in a run.

use tokio::sync::Mutex;

use crate::error::AuthError;
use crate::oauth::OAuthClient;
use crate::storage::CredentialStore;

#[derive(Debug)]
enum CredentialState {
    /// Nothing read from storage yet.
    Unloaded,
    /// A credential is held in memory, possibly near expiry.
    Ready(crate::storage::Credential),
    /// Refresh is impossible until a human re-authorizes. Sticky.
    Unauthenticated,
}

/// Hands out bearer tokens, refreshing and persisting them as needed.
///
/// One manager is shared across all concurrent room tasks. The internal
/// lock is held across the refresh round trip, so however many callers
/// hit an expired token at once, the endpoint sees a single request and
/// everyone gets the same fresh token.
pub struct AuthTokenManager {
    oauth: OAuthClient,
    store: CredentialStore,
    state: Mutex<CredentialState>,
}

impl AuthTokenManager {
    pub fn new(oauth: OAuthClient, store: CredentialStore) -> Self {
        Self {
            oauth,
            store,
            state: Mutex::new(CredentialState::Unloaded),
        }
    }

    /// A bearer token expected to stay valid for the next few minutes.
    ///
    /// Loads the stored credential on first use and refreshes ahead of
    /// expiry (5 minute buffer), persisting the result immediately so a
    /// crashed run does not lose the rotation.
    pub async fn bearer_token(&self) -> Result<String, AuthError> {
        self.token(false).await
    }

    /// Drop the current access token and fetch a fresh one.
    ///
    /// For callers that just got a 401 with a token that still looked
    /// valid locally (revocation, server-side invalidation).
    pub async fn force_refresh(&self) -> Result<String, AuthError> {
        self.token(true).await
    }

    async fn token(&self, force: bool) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;

        if matches!(*state, CredentialState::Unauthenticated) {
            return Err(AuthError::AuthorizationRequired);
        }

        if matches!(*state, CredentialState::Unloaded) {
            match self.store.load() {
                Ok(credential) => *state = CredentialState::Ready(credential),
                Err(err) => {
                    if err.is_terminal() {
                        *state = CredentialState::Unauthenticated;
                    }
                    return Err(err);
                }
            }
        }

        let credential = match &mut *state {
            CredentialState::Ready(credential) => credential,
            // Both other states returned above.
            _ => return Err(AuthError::AuthorizationRequired),
        };

        if !force && !credential.needs_refresh() {
            return Ok(credential.access_token.clone());
        }

        let refresh_token = match credential.refresh_token.clone() {
            Some(token) => token,
            None => {
                tracing::error!("credential expired and has no refresh token");
                *state = CredentialState::Unauthenticated;
                return Err(AuthError::AuthorizationRequired);
            }
        };

        tracing::info!(force, "refreshing access token");
        match self.oauth.refresh_token(&refresh_token).await {
            Ok(response) => {
                credential.apply_refresh(&response);
                let token = credential.access_token.clone();
                if let Err(err) = self.store.save(credential) {
                    // The in-memory token still serves this run.
                    tracing::warn!(error = %err, "could not persist refreshed credential");
                }
                Ok(token)
            }
            Err(err) => {
                if err.is_terminal() {
                    tracing::error!(
                        error = %err,
                        "refresh rejected; interactive re-authorization required"
                    );
                    *state = CredentialState::Unauthenticated;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::storage::Credential;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stored_credential(dir: &TempDir, expires_in: i64, refresh_token: Option<&str>) -> CredentialStore {
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store
            .save(&Credential {
                access_token: "old-token".to_string(),
                refresh_token: refresh_token.map(ToString::to_string),
                expires_at: chrono::Utc::now().timestamp() + expires_in,
                scopes: vec![],
            })
            .unwrap();
        store
    }

    fn manager(server: &MockServer, store: CredentialStore) -> AuthTokenManager {
        let oauth = OAuthClient::new("cid".to_string(), "secret".to_string())
            .with_token_url(format!("{}/token", server.uri()));
        AuthTokenManager::new(oauth, store)
    }

    fn fresh_token_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
    }

    #[tokio::test]
    async fn test_valid_token_passes_through() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(fresh_token_response())
            .expect(0)
            .mount(&server)
            .await;

        let manager = manager(&server, stored_credential(&dir, 3600, Some("rt")));
        assert_eq!(manager.bearer_token().await.unwrap(), "old-token");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(fresh_token_response())
            .expect(1)
            .mount(&server)
            .await;

        let store = stored_credential(&dir, -60, Some("rt"));
        let manager = manager(&server, store.clone());

        assert_eq!(manager.bearer_token().await.unwrap(), "fresh-token");
        // Second call reuses the refreshed token; the expect(1) above
        // fails the test if another refresh goes out.
        assert_eq!(manager.bearer_token().await.unwrap(), "fresh-token");

        let persisted = store.load().unwrap();
        assert_eq!(persisted.access_token, "fresh-token");
        assert_eq!(persisted.refresh_token.as_deref(), Some("rt"));
        assert!(!persisted.needs_refresh());
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_is_terminal() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(fresh_token_response())
            .expect(0)
            .mount(&server)
            .await;

        let manager = manager(&server, stored_credential(&dir, -60, None));

        assert!(matches!(
            manager.bearer_token().await,
            Err(AuthError::AuthorizationRequired)
        ));
        // Sticky: later calls fail fast without touching storage again.
        assert!(matches!(
            manager.bearer_token().await,
            Err(AuthError::AuthorizationRequired)
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_file_is_terminal() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;

        let store = CredentialStore::new(dir.path().join("nope.json"));
        let manager = manager(&server, store);

        assert!(matches!(
            manager.bearer_token().await,
            Err(AuthError::AuthorizationRequired)
        ));
    }

    #[tokio::test]
    async fn test_rejected_refresh_sticks() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server, stored_credential(&dir, -60, Some("revoked")));

        assert!(matches!(
            manager.bearer_token().await,
            Err(AuthError::RefreshFailed { status: 400, .. })
        ));
        // No second attempt against the endpoint.
        assert!(matches!(
            manager.bearer_token().await,
            Err(AuthError::AuthorizationRequired)
        ));
    }

    #[tokio::test]
    async fn test_endpoint_outage_is_retried_on_next_call() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(fresh_token_response())
            .mount(&server)
            .await;

        let manager = manager(&server, stored_credential(&dir, -60, Some("rt")));

        assert!(matches!(
            manager.bearer_token().await,
            Err(AuthError::RefreshFailed { status: 503, .. })
        ));
        assert_eq!(manager.bearer_token().await.unwrap(), "fresh-token");
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_valid_token() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(fresh_token_response())
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server, stored_credential(&dir, 3600, Some("rt")));

        assert_eq!(manager.bearer_token().await.unwrap(), "old-token");
        assert_eq!(manager.force_refresh().await.unwrap(), "fresh-token");
        assert_eq!(manager.bearer_token().await.unwrap(), "fresh-token");
    }
}
