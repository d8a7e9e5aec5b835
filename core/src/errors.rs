use thiserror::Error;

/// Errors produced while configuring, opening or consuming a chat turn
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Session Error: {0}")]
    SessionError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Stream Error: {0}")]
    StreamError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Coarse classification used at the turn boundary to pick what the user sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential or unusable configuration. Terminal.
    Configuration,
    /// The send could not be initiated. The user may retry.
    Session,
    /// The response failed part way through. The user may retry.
    Stream,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::ConfigError(_) | ChatError::ParsingError(_) => ErrorKind::Configuration,
            ChatError::SessionError(_) | ChatError::HttpError { .. } | ChatError::IoError(_) => {
                ErrorKind::Session
            }
            ChatError::StreamError(_) => ErrorKind::Stream,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::SessionError(format!("Failed to send request: {}", err))
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ChatError::ConfigError("missing key".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ChatError::HttpError {
                status_code: 403,
                message: "denied".to_string()
            }
            .kind(),
            ErrorKind::Session
        );
        assert_eq!(
            ChatError::StreamError("reset".to_string()).kind(),
            ErrorKind::Stream
        );
    }

    #[test]
    fn test_error_display_keeps_detail() {
        let err = ChatError::StreamError("connection reset by peer".to_string());
        assert_eq!(err.to_string(), "Stream Error: connection reset by peer");
    }
}
