use thiserror::Error;

/// Failure taxonomy for everything that talks to Azure DevOps.
///
/// Resolution during background polling absorbs these (logged, shown as the
/// unknown icon); key-press actions let them propagate so the lifecycle
/// controller can record and display them.
#[derive(Debug, Error)]
pub enum DevOpsError {
    #[error("Azure DevOps is unreachable: {0}")]
    RemoteUnavailable(String),

    #[error("authentication failed - check the access token")]
    AuthenticationFailed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),
}

impl From<reqwest::Error> for DevOpsError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => return DevOpsError::AuthenticationFailed,
                404 => return DevOpsError::NotFound(err.to_string()),
                _ => {}
            }
        }
        DevOpsError::RemoteUnavailable(err.to_string())
    }
}
