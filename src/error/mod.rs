//! Error types for turnloop.

use serde::Serialize;
use strum::Display;
use thiserror::Error;

/// Primary error type for all turnloop operations.
#[derive(Error, Debug)]
pub enum TurnloopError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Malformed endpoint response: {0}")]
    MalformedResponse(String),

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Invalid schema for tool '{tool_name}': {message}")]
    InvalidToolSchema { tool_name: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Conversation invariant violated: {0}")]
    ConversationInvariant(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Transport,
    Configuration,
    Serialization,
    Tool,
    Conversation,
}

/// Kind of a dispatcher-level failure, as reported back to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    ExecutionFailed,
}

impl TurnloopError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::MalformedResponse(_) => ErrorCategory::Transport,
            Self::Configuration(_) | Self::DuplicateTool(_) | Self::InvalidToolSchema { .. } => {
                ErrorCategory::Configuration
            }
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::UnknownTool(_) | Self::InvalidArgument(_) | Self::ToolExecution { .. } => {
                ErrorCategory::Tool
            }
            Self::ConversationInvariant(_) => ErrorCategory::Conversation,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
                | ErrorCategory::Transport
        )
    }

    /// The kind reported to the model when this error is folded into a
    /// function-call output. `None` for errors that are not tool-level.
    pub fn tool_error_kind(&self) -> Option<ToolErrorKind> {
        match self {
            Self::UnknownTool(_) => Some(ToolErrorKind::UnknownTool),
            Self::InvalidArgument(_) => Some(ToolErrorKind::InvalidArguments),
            Self::ToolExecution { .. } => Some(ToolErrorKind::ExecutionFailed),
            _ => None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TurnloopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        assert!(TurnloopError::api(503, "unavailable").is_retryable());
        assert!(!TurnloopError::api(400, "bad request").is_retryable());
        assert_eq!(
            TurnloopError::api(401, "nope").category(),
            ErrorCategory::Authentication
        );
    }

    #[test]
    fn malformed_responses_are_retried_as_transport_errors() {
        let err = TurnloopError::MalformedResponse("response has no output array".into());
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn startup_errors_are_never_retried() {
        assert!(!TurnloopError::DuplicateTool("book_flight".into()).is_retryable());
        assert!(!TurnloopError::Configuration("missing key".into()).is_retryable());
    }

    #[test]
    fn tool_errors_map_to_reported_kinds() {
        assert_eq!(
            TurnloopError::UnknownTool("x".into()).tool_error_kind(),
            Some(ToolErrorKind::UnknownTool)
        );
        assert_eq!(
            TurnloopError::InvalidArgument("x".into()).tool_error_kind(),
            Some(ToolErrorKind::InvalidArguments)
        );
        assert_eq!(
            TurnloopError::ToolExecution {
                tool_name: "t".into(),
                message: "boom".into()
            }
            .tool_error_kind(),
            Some(ToolErrorKind::ExecutionFailed)
        );
        assert_eq!(TurnloopError::Timeout(10).tool_error_kind(), None);
        assert_eq!(ToolErrorKind::InvalidArguments.to_string(), "invalid_arguments");
        assert_eq!(
            serde_json::to_value(ToolErrorKind::ExecutionFailed).unwrap(),
            serde_json::json!("execution_failed")
        );
    }
}
