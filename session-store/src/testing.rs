//! In-memory providers for tests and development setups.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::types::{ImagingSession, Principal};
use crate::{IdentityProvider, SessionProvider, SessionStoreError};

/// Static in-memory store. Sessions are visible to the users listed in
/// `visible_to`; an empty list means visible to any authenticated caller.
#[derive(Default)]
pub struct StaticSessionStore {
    users: HashMap<String, String>,
    sessions: Vec<StaticSession>,
}

struct StaticSession {
    session: ImagingSession,
    visible_to: Vec<String>,
}

impl StaticSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user<T, U>(mut self, token: T, username: U) -> Self
    where
        T: Into<String>,
        U: Into<String>,
    {
        self.users.insert(token.into(), username.into());
        self
    }

    pub fn with_session(mut self, session: ImagingSession) -> Self {
        self.sessions.push(StaticSession {
            session,
            visible_to: Vec::new(),
        });
        self
    }

    pub fn with_restricted_session(mut self, session: ImagingSession, visible_to: &[&str]) -> Self {
        self.sessions.push(StaticSession {
            session,
            visible_to: visible_to.iter().map(|user| user.to_string()).collect(),
        });
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticSessionStore {
    async fn authenticate(&self, token: &str) -> Result<Option<Principal>, SessionStoreError> {
        Ok(self
            .users
            .get(token)
            .map(|username| Principal::new(username.clone(), token)))
    }
}

#[async_trait]
impl SessionProvider for StaticSessionStore {
    async fn find_session(
        &self,
        session_id: &str,
        principal: &Principal,
    ) -> Result<Option<ImagingSession>, SessionStoreError> {
        Ok(self
            .sessions
            .iter()
            .find(|entry| {
                entry.session.id == session_id
                    && (entry.visible_to.is_empty()
                        || entry.visible_to.iter().any(|user| user == &principal.username))
            })
            .map(|entry| entry.session.clone()))
    }
}
