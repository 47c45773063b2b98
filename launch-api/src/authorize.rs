use std::sync::Arc;

use session_store::SessionProvider;
use session_store::types::{ImagingSession, Principal};

use crate::errors::LaunchError;

/// Outcome of a successful authorization: the session plus its study UID,
/// trimmed and guaranteed non-blank.
#[derive(Clone, Debug)]
pub struct ResolvedSession {
    pub study_instance_uid: String,
    pub session: ImagingSession,
}

/// Gates launch requests. The checks run in a fixed order so that every
/// failure maps to a distinct status, and an unauthenticated caller can
/// never learn whether a session exists.
pub struct AuthorizationResolver {
    sessions: Arc<dyn SessionProvider>,
}

impl AuthorizationResolver {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        AuthorizationResolver { sessions }
    }

    pub async fn resolve(
        &self,
        principal: Option<&Principal>,
        session_id: &str,
        project_id: &str,
    ) -> Result<ResolvedSession, LaunchError> {
        let Some(principal) = principal else {
            tracing::warn!(
                project_id,
                session_id,
                "rejected launch request without an active user session"
            );
            return Err(LaunchError::Unauthenticated);
        };

        let Some(session) = self.sessions.find_session(session_id, principal).await? else {
            tracing::warn!(
                project_id,
                session_id,
                user = %principal.username,
                "session not found or not visible"
            );
            return Err(LaunchError::SessionNotFound);
        };

        if !session.is_in_project(project_id) {
            tracing::warn!(
                project_id,
                session_id,
                owner = %session.project,
                "session does not belong to requested project"
            );
            return Err(LaunchError::ProjectMismatch);
        }

        let study_instance_uid = session
            .study_instance_uid
            .as_deref()
            .map(str::trim)
            .filter(|uid| !uid.is_empty());

        let Some(study_instance_uid) = study_instance_uid else {
            tracing::warn!(project_id, session_id, "session has no study UID");
            return Err(LaunchError::MissingStudyUid);
        };

        Ok(ResolvedSession {
            study_instance_uid: study_instance_uid.to_string(),
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_store::testing::StaticSessionStore;

    fn session(id: &str, project: &str, study_uid: Option<&str>) -> ImagingSession {
        let mut session = ImagingSession::new(id, project);
        session.study_instance_uid = study_uid.map(str::to_string);
        session
    }

    fn resolver() -> AuthorizationResolver {
        let mut shared = session("SHARED", "OTHER", Some("1.2.3"));
        shared.shared_projects = vec!["Proj1".to_string()];

        let store = StaticSessionStore::new()
            .with_user("token-a", "alice")
            .with_session(session("SESS1", "PROJ1", Some("1.2.840.1")))
            .with_session(session("PADDED", "PROJ1", Some("  1.2.840.1  ")))
            .with_session(session("NOUID", "PROJ1", None))
            .with_session(session("BLANK", "PROJ1", Some("   ")))
            .with_session(shared)
            .with_restricted_session(session("PRIVATE", "PROJ1", Some("1.2.3")), &["bob"]);

        AuthorizationResolver::new(Arc::new(store))
    }

    fn alice() -> Principal {
        Principal::new("alice", "token-a")
    }

    #[tokio::test]
    async fn test_missing_principal_is_unauthenticated() {
        let result = resolver().resolve(None, "SESS1", "PROJ1").await;

        assert!(matches!(result, Err(LaunchError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let result = resolver().resolve(Some(&alice()), "MISSING", "PROJ1").await;

        assert!(matches!(result, Err(LaunchError::SessionNotFound)));
    }

    #[tokio::test]
    async fn test_invisible_session_looks_like_a_missing_one() {
        let resolver = resolver();

        let invisible = resolver.resolve(Some(&alice()), "PRIVATE", "PROJ1").await;
        let missing = resolver.resolve(Some(&alice()), "MISSING", "PROJ1").await;

        assert!(matches!(invisible, Err(LaunchError::SessionNotFound)));
        assert!(matches!(missing, Err(LaunchError::SessionNotFound)));
    }

    #[tokio::test]
    async fn test_project_mismatch() {
        let result = resolver().resolve(Some(&alice()), "SESS1", "OTHER").await;

        assert!(matches!(result, Err(LaunchError::ProjectMismatch)));
    }

    #[tokio::test]
    async fn test_project_match_is_case_insensitive() {
        let resolved = resolver()
            .resolve(Some(&alice()), "SESS1", "proj1")
            .await
            .unwrap();

        assert_eq!(resolved.study_instance_uid, "1.2.840.1");
    }

    #[tokio::test]
    async fn test_shared_project_allows_launch() {
        let resolved = resolver()
            .resolve(Some(&alice()), "SHARED", "PROJ1")
            .await
            .unwrap();

        assert_eq!(resolved.session.project, "OTHER");
    }

    #[tokio::test]
    async fn test_missing_or_blank_study_uid() {
        let resolver = resolver();

        let missing = resolver.resolve(Some(&alice()), "NOUID", "PROJ1").await;
        let blank = resolver.resolve(Some(&alice()), "BLANK", "PROJ1").await;

        assert!(matches!(missing, Err(LaunchError::MissingStudyUid)));
        assert!(matches!(blank, Err(LaunchError::MissingStudyUid)));
    }

    #[tokio::test]
    async fn test_study_uid_is_trimmed() {
        let resolved = resolver()
            .resolve(Some(&alice()), "PADDED", "PROJ1")
            .await
            .unwrap();

        assert_eq!(resolved.study_instance_uid, "1.2.840.1");
    }
}
