use thiserror::Error;

/// Everything that can go wrong between a conversation and the completion API.
///
/// The `Display` text is what ends up in front of the user, either as the
/// `error` field of the relay response or as a chat line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("API key is not configured")]
    MissingCredential,

    /// Upstream answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Unexpected response from completion API: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    InvalidRequest(String),

    /// The hosted relay could not be reached at all.
    #[error("Relay unreachable: {0}")]
    Unreachable(String),

    #[error("Too many requests")]
    RateLimited,
}

impl RelayError {
    pub fn upstream(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("API error: {}", status));
        RelayError::Upstream { status, message }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Upstream { status, .. } => *status,
            RelayError::Unreachable(_) => 502,
            RelayError::RateLimited => 429,
            | RelayError::MissingCredential
            | RelayError::Transport(_)
            | RelayError::InvalidResponse(_)
            | RelayError::InvalidRequest(_) => 500,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RelayError::InvalidResponse(err.to_string())
        } else {
            RelayError::Transport(err.to_string())
        }
    }
}
