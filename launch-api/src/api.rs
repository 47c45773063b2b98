use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;

use session_store::{IdentityProvider, SESSION_COOKIE, SessionProvider};

use crate::authorize::AuthorizationResolver;
use crate::config::{Config, Listener};
use crate::errors::{LaunchApiError, LaunchError};
use crate::forwarding::{ObservedAddress, resolve_forwarding_context};
use crate::weasis::build_launch_url;

#[derive(Clone)]
pub struct AppState {
    identity: Arc<dyn IdentityProvider>,
    authorizer: Arc<AuthorizationResolver>,
    listener: Listener,
    context_path: String,
}

impl AppState {
    pub fn new(
        config: &Config,
        identity: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        AppState {
            identity,
            authorizer: Arc::new(AuthorizationResolver::new(sessions)),
            listener: config.listener.clone(),
            context_path: normalize_context_path(&config.context_path),
        }
    }
}

pub async fn serve(
    config: Config,
    identity: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionProvider>,
) -> Result<(), LaunchApiError> {
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let app = router(AppState::new(&config, identity, sessions));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "launch service listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the service router, nested under the context path when one is
/// configured.
pub fn router(state: AppState) -> Router {
    let context_path = state.context_path.clone();

    let routes = Router::new()
        .route(
            "/launch/projects/{project_id}/sessions/{session_id}",
            get(launch_session),
        )
        .route("/health", get(health))
        .with_state(state);

    if context_path.is_empty() {
        routes
    } else {
        Router::new().nest(&context_path, routes)
    }
}

async fn health() -> &'static str {
    "ok\n"
}

async fn launch_session(
    State(state): State<AppState>,
    Path((project_id, session_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<String, LaunchError> {
    tracing::debug!(%project_id, %session_id, "viewer launch requested");

    let Some(token) = session_token(&headers) else {
        tracing::warn!(
            %project_id,
            %session_id,
            "rejected launch request without a session cookie"
        );
        return Err(LaunchError::Unauthenticated);
    };

    let principal = state.identity.authenticate(&token).await?;
    let resolved = state
        .authorizer
        .resolve(principal.as_ref(), &session_id, &project_id)
        .await?;

    let observed = ObservedAddress::from_request(&headers, &state.listener);
    let context = resolve_forwarding_context(observed, &state.context_path, &headers);

    let launch_url = build_launch_url(&context, &project_id, &resolved.study_instance_uid, &token)
        .map_err(|err| {
            tracing::error!(%project_id, %session_id, error = %err, "failed to assemble launch URL");
            err
        })?;

    metrics::counter!("launch.url.generated").increment(1);
    tracing::info!(
        %project_id,
        %session_id,
        study_uid = %resolved.study_instance_uid,
        "generated viewer launch URL"
    );

    Ok(launch_url)
}

/// Extracts the session-authentication token from the Cookie header.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn normalize_context_path(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');

    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl IntoResponse for LaunchError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            LaunchError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            LaunchError::SessionNotFound => (StatusCode::NOT_FOUND, "Session not found"),
            LaunchError::ProjectMismatch => {
                (StatusCode::FORBIDDEN, "Session does not belong to project")
            }
            LaunchError::MissingStudyUid => (StatusCode::BAD_REQUEST, "Session has no study UID"),
            LaunchError::UrlEncoding(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Error generating launch URL")
            }
            LaunchError::Store(err) => {
                tracing::error!(error = %err, "session store lookup failed");
                (StatusCode::BAD_GATEWAY, "Session store unavailable")
            }
        };

        metrics::counter!("launch.request.denied", "reason" => denial_reason(&self)).increment(1);

        (status, body).into_response()
    }
}

fn denial_reason(error: &LaunchError) -> &'static str {
    match error {
        LaunchError::Unauthenticated => "unauthenticated",
        LaunchError::SessionNotFound => "not_found",
        LaunchError::ProjectMismatch => "project_mismatch",
        LaunchError::MissingStudyUid => "missing_study_uid",
        LaunchError::UrlEncoding(_) => "url_encoding",
        LaunchError::Store(_) => "store_unavailable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use session_store::config::SessionStoreType;
    use session_store::testing::StaticSessionStore;
    use session_store::types::ImagingSession;
    use tower::ServiceExt;

    fn test_router(context_path: &str) -> Router {
        let mut no_uid = ImagingSession::new("NOUID", "PROJ1");
        no_uid.study_instance_uid = Some("   ".to_string());

        let mut sess1 = ImagingSession::new("SESS1", "PROJ1");
        sess1.study_instance_uid = Some("1.2.840.1".to_string());

        let store = Arc::new(
            StaticSessionStore::new()
                .with_user("token-1", "alice")
                .with_session(sess1)
                .with_session(no_uid)
                .with_restricted_session(ImagingSession::new("PRIVATE", "PROJ1"), &["bob"]),
        );

        let config = Config {
            listener: Listener::default(),
            context_path: context_path.to_string(),
            session_store: SessionStoreType::Archive {
                base_url: "http://unused.invalid".to_string(),
                timeout_secs: 10,
            },
        };

        router(AppState::new(&config, store.clone(), store))
    }

    fn request(path: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized() {
        let response = test_router("")
            .oneshot(request("/launch/projects/PROJ1/sessions/SESS1", &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, "Unauthorized");
    }

    #[tokio::test]
    async fn test_stale_token_is_unauthorized() {
        let response = test_router("")
            .oneshot(request(
                "/launch/projects/PROJ1/sessions/SESS1",
                &[("cookie", "JSESSIONID=expired")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_and_invisible_sessions_are_identical() {
        let app = test_router("");

        let missing = app
            .clone()
            .oneshot(request(
                "/launch/projects/PROJ1/sessions/MISSING",
                &[("cookie", "JSESSIONID=token-1")],
            ))
            .await
            .unwrap();
        let invisible = app
            .oneshot(request(
                "/launch/projects/PROJ1/sessions/PRIVATE",
                &[("cookie", "JSESSIONID=token-1")],
            ))
            .await
            .unwrap();

        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(invisible.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(missing).await, "Session not found");
        assert_eq!(body_string(invisible).await, "Session not found");
    }

    #[tokio::test]
    async fn test_project_mismatch_is_forbidden() {
        let response = test_router("")
            .oneshot(request(
                "/launch/projects/OTHER/sessions/SESS1",
                &[("cookie", "JSESSIONID=token-1")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_string(response).await,
            "Session does not belong to project"
        );
    }

    #[tokio::test]
    async fn test_blank_study_uid_is_bad_request() {
        let response = test_router("")
            .oneshot(request(
                "/launch/projects/PROJ1/sessions/NOUID",
                &[("cookie", "JSESSIONID=token-1")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Session has no study UID");
    }

    #[tokio::test]
    async fn test_launch_behind_proxy_chain() {
        let response = test_router("/xnat-app")
            .oneshot(request(
                "/xnat-app/launch/projects/PROJ1/sessions/SESS1",
                &[
                    ("cookie", "JSESSIONID=token-1"),
                    ("x-forwarded-proto", "https"),
                    ("x-forwarded-host", "viewer.example.org:9443"),
                    ("x-forwarded-prefix", "/xnat/"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "weasis://?$dicom:rs --url \"https://viewer.example.org:9443/xnat/xnat-app/xapi/dicomweb/projects/PROJ1\" -r \"studyUID=1.2.840.1\" --header \"Cookie: JSESSIONID=token-1\""
        );
    }

    #[tokio::test]
    async fn test_launch_without_proxy() {
        let response = test_router("")
            .oneshot(request(
                "/launch/projects/PROJ1/sessions/SESS1",
                &[("cookie", "JSESSIONID=token-1"), ("host", "localhost")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "weasis://?$dicom:rs --url \"http://localhost/xapi/dicomweb/projects/PROJ1\" -r \"studyUID=1.2.840.1\" --header \"Cookie: JSESSIONID=token-1\""
        );
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router("")
            .oneshot(request("/health", &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok\n");
    }

    #[test]
    fn test_normalize_context_path() {
        assert_eq!(normalize_context_path(""), "");
        assert_eq!(normalize_context_path("/"), "");
        assert_eq!(normalize_context_path("/xnat-app"), "/xnat-app");
        assert_eq!(normalize_context_path("/xnat-app/"), "/xnat-app");
        assert_eq!(normalize_context_path("xnat-app"), "/xnat-app");
    }
}
