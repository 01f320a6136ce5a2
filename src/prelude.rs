//! Convenience re-exports for common use.

pub use crate::agent::Conversation;
pub use crate::agent_loop::{Console, LoopState, StdConsole, TurnLoop};
pub use crate::config::{LoopSettings, SessionConfig};
pub use crate::error::{Result, TurnloopError};
pub use crate::provider::{EndpointRequest, ModelEndpoint, OpenAiResponsesEndpoint};
pub use crate::tools::{
    Dispatcher, FunctionTool, Tool, ToolArguments, ToolDescriptor, ToolParameters, ToolRegistry,
};
pub use crate::types::{FunctionCall, FunctionCallOutput, GenerationSettings, Turn};
pub use crate::util::retry::RetryPolicy;
