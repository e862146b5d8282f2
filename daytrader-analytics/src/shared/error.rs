use thiserror::Error;

/// All errors generated while fetching raw records from the backend.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FetchError {
    #[error("invalid backend base url: {0}")]
    InvalidUrl(String),

    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("request to {endpoint} failed: {message}")]
    Http { endpoint: String, message: String },

    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
}

impl FetchError {
    /// Classify a [`reqwest::Error`] raised while talking to `endpoint`.
    pub fn from_reqwest(endpoint: &str, error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Http {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        }
    }

    /// Determine if the next poll tick could plausibly succeed without any
    /// operator intervention.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Endpoint the error originated from, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            FetchError::Http { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => Some(endpoint),
            FetchError::InvalidUrl(_) | FetchError::Client(_) => None,
        }
    }
}
