use thiserror::Error;

use crate::api::ErrorEnvelope;

/// Terminal failure of a command invocation.
///
/// Every variant is reported the same way at the command boundary: a
/// message on stderr and exit code 1.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Schema or cross-field rule violation, raised before any network call
    #[error("{0}")]
    Validation(String),

    /// A resolution call found no entity for the given name
    #[error("{0}")]
    NotFound(String),

    /// Non-2xx response from the vendor API
    #[error("{}", .0.message)]
    Request(ErrorEnvelope),

    /// Network-level failure, message passed through verbatim
    #[error("{0}")]
    Transport(String),

    /// Missing or unsuitable credentials
    #[error("{0}")]
    Auth(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short label used by telemetry and debug logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Request(_) => "request",
            Self::Transport(_) => "transport",
            Self::Auth(_) => "auth",
            Self::Other(_) => "other",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        1
    }
}

impl From<reqwest::Error> for CommandError {
    fn from(err: reqwest::Error) -> Self {
        // Keep the cause chain, e.g. "connection refused" below reqwest's summary
        Self::Transport(format!("{:#}", anyhow::Error::from(err)))
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_displays_envelope_message() {
        let err = CommandError::Request(ErrorEnvelope {
            message: "Access denied".to_string(),
            code: Some("accessDenied".to_string()),
            status: Some(403),
        });
        assert_eq!(err.to_string(), "Access denied");
        assert_eq!(err.kind(), "request");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn other_errors_keep_anyhow_message() {
        let err: CommandError = anyhow::anyhow!("Failed to read config").into();
        assert_eq!(err.to_string(), "Failed to read config");
    }
}
