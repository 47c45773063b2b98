pub mod archive;
pub mod config;
pub mod testing;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;

use crate::archive::ArchiveClient;
use crate::config::SessionStoreType;
use crate::types::{ImagingSession, Principal};

/// Name of the cookie carrying the session-authentication token.
pub const SESSION_COOKIE: &str = "JSESSIONID";

#[derive(thiserror::Error, Debug)]
pub enum SessionStoreError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("archive returned unexpected status: {0}")]
    UnexpectedStatus(http::StatusCode),
}

/// Resolves the principal behind a session-authentication token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the authenticated principal, or `None` when the token does
    /// not belong to an active user session.
    async fn authenticate(&self, token: &str) -> Result<Option<Principal>, SessionStoreError>;
}

/// Read-only access to the archive's imaging sessions, scoped to a caller.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the session, or `None` when it does not exist or is not
    /// visible to the principal. The two cases are indistinguishable here;
    /// visibility is enforced by the store.
    async fn find_session(
        &self,
        session_id: &str,
        principal: &Principal,
    ) -> Result<Option<ImagingSession>, SessionStoreError>;
}

/// Builds the identity and session providers selected by the configuration.
pub fn get_providers(
    config: &SessionStoreType,
) -> Result<(Arc<dyn IdentityProvider>, Arc<dyn SessionProvider>), SessionStoreError> {
    match config {
        SessionStoreType::Archive {
            base_url,
            timeout_secs,
        } => {
            let client = Arc::new(ArchiveClient::new(base_url, *timeout_secs)?);
            let identity: Arc<dyn IdentityProvider> = client.clone();
            let sessions: Arc<dyn SessionProvider> = client;
            Ok((identity, sessions))
        }
    }
}
