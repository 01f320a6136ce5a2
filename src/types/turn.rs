//! Conversation turns exchanged with the model endpoint.

use serde::{Deserialize, Serialize};

/// One atomic entry in a conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    /// Text typed by the human.
    UserMessage { text: String },
    /// Terminal text content produced by the model.
    AssistantMessage { text: String },
    /// The model asks for a registered function to be run.
    FunctionCallRequest(FunctionCall),
    /// The result of running a requested function.
    FunctionCallOutput(FunctionCallOutput),
}

impl Turn {
    /// Create a user message turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserMessage { text: text.into() }
    }

    /// Create an assistant message turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::AssistantMessage { text: text.into() }
    }

    /// Create a function-call request turn.
    pub fn call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::FunctionCallRequest(FunctionCall::new(call_id, name, arguments))
    }

    /// Create a successful function-call output turn.
    pub fn output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput(FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
            is_error: false,
        })
    }

    /// The correlation id, for request and output turns.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCallRequest(call) => Some(&call.call_id),
            Self::FunctionCallOutput(output) => Some(&output.call_id),
            Self::UserMessage { .. } | Self::AssistantMessage { .. } => None,
        }
    }

    /// The text of a user or assistant message.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::UserMessage { text } | Self::AssistantMessage { text } => Some(text),
            Self::FunctionCallRequest(_) | Self::FunctionCallOutput(_) => None,
        }
    }

    pub fn as_call(&self) -> Option<&FunctionCall> {
        match self {
            Self::FunctionCallRequest(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::FunctionCallRequest(_))
    }

    pub fn is_output(&self) -> bool {
        matches!(self, Self::FunctionCallOutput(_))
    }

    /// Whether the model is allowed to produce this kind of turn.
    pub fn is_model_authored(&self) -> bool {
        matches!(
            self,
            Self::AssistantMessage { .. } | Self::FunctionCallRequest(_)
        )
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl FunctionCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The correlated result of a [`FunctionCall`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCallOutput {
    pub call_id: String,
    pub output: String,
    #[serde(default)]
    pub is_error: bool,
}
