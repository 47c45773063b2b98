use session_store::SessionStoreError;
use thiserror::Error;

/// Errors produced while handling a launch request. The first four are
/// authorization outcomes with client-facing statuses; the rest are
/// server-side faults.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("no authenticated user session")]
    Unauthenticated,

    #[error("session not found or not visible to the caller")]
    SessionNotFound,

    #[error("session does not belong to the requested project")]
    ProjectMismatch,

    #[error("session has no study UID")]
    MissingStudyUid,

    #[error("could not assemble launch URL: {0}")]
    UrlEncoding(#[from] url::ParseError),

    #[error("session store error: {0}")]
    Store(#[from] SessionStoreError),
}

/// Errors that take the HTTP service down.
#[derive(Error, Debug)]
pub enum LaunchApiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
