pub mod error;
pub mod manager;
pub mod oauth;
pub mod storage;

pub use error::AuthError;
pub use manager::AuthTokenManager;
pub use oauth::{OAuthClient, TokenResponse};
pub use storage::{Credential, CredentialStore};
