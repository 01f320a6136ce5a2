//! Turns a model's function-call request into a correlated output.

use std::sync::Arc;

use serde_json::{json, Value};

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::tool::ToolExecutionContext;
use super::validation::validate_arguments;
use crate::error::{ToolErrorKind, TurnloopError};
use crate::types::{FunctionCall, FunctionCallOutput};

/// Executes function calls against a shared registry.
///
/// Dispatch never fails to its caller: unknown names, bad arguments and
/// handler errors all come back as an output with `is_error` set, carrying
/// the request's `call_id`, so the model can see and react to the failure.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one requested call and produce its output.
    pub fn dispatch(&self, call: &FunctionCall) -> FunctionCallOutput {
        match self.try_dispatch(call) {
            Ok(value) => {
                tracing::debug!(call_id = %call.call_id, tool = %call.name, "Tool call succeeded");
                FunctionCallOutput {
                    call_id: call.call_id.clone(),
                    output: render_value(&value),
                    is_error: false,
                }
            }
            Err(err) => {
                let kind = err
                    .tool_error_kind()
                    .unwrap_or(ToolErrorKind::ExecutionFailed);
                tracing::warn!(
                    call_id = %call.call_id,
                    tool = %call.name,
                    kind = %kind,
                    error = %err,
                    "Tool call failed"
                );
                FunctionCallOutput {
                    call_id: call.call_id.clone(),
                    output: error_payload(kind, &err.to_string()),
                    is_error: true,
                }
            }
        }
    }

    fn try_dispatch(&self, call: &FunctionCall) -> Result<Value, TurnloopError> {
        let tool = self.registry.resolve(&call.name)?;
        let args = ToolArguments::from_call(&call.arguments)?;
        validate_arguments(args.raw(), &tool.parameters().schema)
            .map_err(TurnloopError::InvalidArgument)?;

        let ctx = ToolExecutionContext {
            call_id: call.call_id.clone(),
        };
        tool.execute(&args, &ctx).map_err(|err| match err {
            TurnloopError::InvalidArgument(_) | TurnloopError::ToolExecution { .. } => err,
            other => TurnloopError::ToolExecution {
                tool_name: call.name.clone(),
                message: other.to_string(),
            },
        })
    }
}

/// Serialize a handler result for the model. Strings pass through unquoted.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn error_payload(kind: ToolErrorKind, message: &str) -> String {
    json!({
        "error": {
            "kind": kind,
            "message": message,
        }
    })
    .to_string()
}
