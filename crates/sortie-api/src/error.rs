use thiserror::Error;

/// Every way a call against the backend can fail.
///
/// Together with `Ok` this gives callers four outcomes: success, rejected
/// credentials, a server-side error, or a request that never got an answer.
/// Only `Auth` means "stop asking"; the other two are worth retrying later.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Credentials are missing or rejected
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// Server hiccup or connectivity blip, retrying later makes sense
    pub fn is_transient(&self) -> bool {
        !self.is_auth()
    }

    /// HTTP status when the server actually answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth(_) => Some(401),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
