use thiserror::Error;

pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Please login again.";

/// Broad failure classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Request,
    Transport,
    Internal,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("Authentication failed. Please login again.")]
    AuthenticationFailed,
    #[error("{message}")]
    Request { status: u16, message: String },
    #[error("Token refresh failed (HTTP {status})")]
    RefreshRejected { status: u16 },
    #[error("Network request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Failed to read backend response: {0}")]
    ResponseBody(#[source] reqwest::Error),
    #[error("Backend returned an unexpected payload: {0}")]
    Decode(String),
    #[error("Session store error: {0}")]
    Store(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Validation(_) => ErrorCategory::Validation,
            ClientError::AuthenticationFailed => ErrorCategory::Authentication,
            ClientError::Request { .. } | ClientError::RefreshRejected { .. } => {
                ErrorCategory::Request
            }
            ClientError::Transport(_) | ClientError::ResponseBody(_) => ErrorCategory::Transport,
            ClientError::Decode(_) | ClientError::Store(_) | ClientError::Config(_) => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::AuthenticationFailed)
    }

    /// HTTP status attached to the failure, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } | ClientError::RefreshRejected { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        ClientError::Decode(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_message_is_stable() {
        assert_eq!(ClientError::AuthenticationFailed.to_string(), AUTH_FAILED_MESSAGE);
        assert!(ClientError::AuthenticationFailed.is_auth_failure());
    }

    #[test]
    fn request_error_displays_server_message() {
        let err = ClientError::Request {
            status: 409,
            message: "Already joined".to_string(),
        };
        assert_eq!(err.to_string(), "Already joined");
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.category(), ErrorCategory::Request);
    }

    #[test]
    fn validation_errors_have_no_status() {
        let err = ClientError::Validation("Phone number is required".into());
        assert_eq!(err.status(), None);
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
