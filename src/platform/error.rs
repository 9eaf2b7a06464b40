use thiserror::Error;

/// Failures talking to the virtualization management API.
#[derive(Debug, Error)]
pub(crate) enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("API error [{status}]: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse API response: {0}")]
    Parse(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid trust anchor: {0}")]
    Certificate(String),
}

impl PlatformError {
    /// Map a non-success HTTP status of a request on `path` to an error.
    pub(crate) fn from_status(status: u16, path: &str, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("{status} for {path}")),
            404 => Self::NotFound(path.to_string()),
            _ => Self::Api { status, body },
        }
    }
}
