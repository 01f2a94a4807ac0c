use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PolarisError {
    pub message: String,
    pub sentry: bool,
}

/// Outcome of a failed GET against the Polaris API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unauthorized request to {url}. Please check your API token.")]
    Unauthorized { url: String },

    #[error("GET {url} failed with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Failed to connect to Polaris ({url}): {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Polaris returned an unreadable response for {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-side and connection failures are worth reporting; client errors are not.
    pub fn is_reportable(&self) -> bool {
        match self {
            FetchError::Transport { .. } | FetchError::Decode { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Unauthorized { .. } => false,
        }
    }
}
