use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::header::COOKIE;
use serde::Deserialize;

use crate::types::{ImagingSession, Principal};
use crate::{IdentityProvider, SESSION_COOKIE, SessionProvider, SessionStoreError};

#[derive(Deserialize)]
struct UserRecord {
    username: String,
}

#[derive(Deserialize)]
struct SessionRecord {
    id: String,
    project: String,
    #[serde(default)]
    shared_projects: Vec<String>,
    study_instance_uid: Option<String>,
}

/// HTTP client for the archive's REST API. One instance answers both
/// identity and session lookups; all requests carry the caller's session
/// cookie so the archive applies its own visibility rules.
pub struct ArchiveClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SessionStoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(ArchiveClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn session_cookie(token: &str) -> String {
        format!("{SESSION_COOKIE}={token}")
    }
}

#[async_trait]
impl IdentityProvider for ArchiveClient {
    async fn authenticate(&self, token: &str) -> Result<Option<Principal>, SessionStoreError> {
        let url = format!("{}/xapi/users/current", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(COOKIE, Self::session_cookie(token))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let user = response.json::<UserRecord>().await?;
                Ok(Some(Principal::new(user.username, token)))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(SessionStoreError::UnexpectedStatus(status)),
        }
    }
}

#[async_trait]
impl SessionProvider for ArchiveClient {
    async fn find_session(
        &self,
        session_id: &str,
        principal: &Principal,
    ) -> Result<Option<ImagingSession>, SessionStoreError> {
        let url = format!("{}/xapi/sessions/{}", self.base_url, session_id);

        let response = self
            .client
            .get(&url)
            .header(COOKIE, Self::session_cookie(&principal.token))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let record = response.json::<SessionRecord>().await?;
                Ok(Some(ImagingSession {
                    id: record.id,
                    project: record.project,
                    shared_projects: record.shared_projects,
                    study_instance_uid: record.study_instance_uid,
                }))
            }
            // The archive reports missing and inaccessible sessions alike.
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(SessionStoreError::UnexpectedStatus(status)),
        }
    }
}
