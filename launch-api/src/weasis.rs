//! Assembly of the Weasis launch URL.
//!
//! Weasis parses this string with a fixed grammar, not a general URL
//! parser; the literal tokens and quoting below are a contract with the
//! viewer and must not be reordered or re-escaped.

use url::Url;

use crate::errors::LaunchError;
use crate::forwarding::ForwardingContext;

/// Path of the DICOMweb proxy below the reconstructed service root.
pub const DICOMWEB_PROJECTS_PATH: &str = "/xapi/dicomweb/projects";

/// Builds the `weasis://` launch URL for one study.
///
/// Identifiers are embedded verbatim; the assembled DICOMweb URL is parsed
/// once to reject values that would not survive as a URL.
pub fn build_launch_url(
    context: &ForwardingContext,
    project_id: &str,
    study_instance_uid: &str,
    session_token: &str,
) -> Result<String, LaunchError> {
    let dicomweb_url = format!(
        "{}{}{}/{}",
        context.base_url(),
        context.path_prefix,
        DICOMWEB_PROJECTS_PATH,
        project_id
    );

    Url::parse(&dicomweb_url)?;

    Ok(format!(
        "weasis://?$dicom:rs --url \"{dicomweb_url}\" -r \"studyUID={study_instance_uid}\" --header \"Cookie: JSESSIONID={session_token}\""
    ))
}
