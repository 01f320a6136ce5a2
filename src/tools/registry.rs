//! Name-to-tool registry advertised to the model.

use std::collections::HashMap;
use std::sync::Arc;

use super::tool::Tool;
use super::types::ToolDescriptor;
use super::validation::check_schema;
use crate::error::TurnloopError;

/// Registry mapping function names to their executable tools.
///
/// Built once at startup; the loop only reads from it, so one registry can
/// be shared by several conversations behind an `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), TurnloopError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(TurnloopError::InvalidToolSchema {
                tool_name: name,
                message: "tool name must not be empty".to_string(),
            });
        }
        if self.by_name.contains_key(&name) {
            return Err(TurnloopError::DuplicateTool(name));
        }
        check_schema(&tool.parameters().schema).map_err(|message| {
            TurnloopError::InvalidToolSchema {
                tool_name: name.clone(),
                message,
            }
        })?;

        tracing::debug!(tool = %name, "Registered tool");
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Result<Self, TurnloopError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Look up a tool by the name the model used.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Tool>, TurnloopError> {
        self.by_name
            .get(name)
            .map(|&idx| &self.tools[idx])
            .ok_or_else(|| TurnloopError::UnknownTool(name.to_string()))
    }

    /// Descriptors for every tool, in registration order.
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
