//! Tool system for function calling.

pub mod arguments;
pub mod builtin;
pub mod dispatcher;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use dispatcher::Dispatcher;
pub use registry::ToolRegistry;
pub use tool::{FunctionTool, Tool, ToolExecutionContext};
pub use types::{ParameterBuilder, ToolDescriptor, ToolParameters};
