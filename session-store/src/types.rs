use std::fmt;

/// An authenticated caller.
///
/// Carries the session token the archive validated so that caller-scoped
/// lookups can present it. The token is excluded from `Debug` output.
#[derive(Clone)]
pub struct Principal {
    pub username: String,
    pub token: String,
}

impl Principal {
    pub fn new<U, T>(username: U, token: T) -> Self
    where
        U: Into<String>,
        T: Into<String>,
    {
        Principal {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Read-only view of an imaging session as stored in the archive.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagingSession {
    pub id: String,
    pub project: String,
    pub shared_projects: Vec<String>,
    pub study_instance_uid: Option<String>,
}

impl ImagingSession {
    pub fn new<I, P>(id: I, project: P) -> Self
    where
        I: Into<String>,
        P: Into<String>,
    {
        ImagingSession {
            id: id.into(),
            project: project.into(),
            shared_projects: Vec::new(),
            study_instance_uid: None,
        }
    }

    /// True when the session is owned by or shared into the given project.
    /// Project identifiers compare case-insensitively.
    pub fn is_in_project(&self, project_id: &str) -> bool {
        self.project.eq_ignore_ascii_case(project_id)
            || self
                .shared_projects
                .iter()
                .any(|shared| shared.eq_ignore_ascii_case(project_id))
    }
}
