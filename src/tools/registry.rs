//! Name-keyed tool registry
//!
//! Immutable after construction. Lookups are by unique tool name and specs
//! are listed in registration order.

use super::{validate_arguments, Tool, ToolSpec};
use crate::error::AgentError;
use crate::models::ToolInvocationResult;
use crate::Result;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Register a tool. Duplicate names are a construction error, not a
    /// silent overwrite.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.spec().name.to_string();
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    /// Tool specs in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch one tool call: resolve the tool, validate arguments against
    /// its schema, then run it. Validation failures surface as
    /// `InvalidArguments` without running the computation; computation
    /// failures are absorbed into the result payload with `is_error` set.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolInvocationResult> {
        let tool = self.get(name)?;
        let spec = tool.spec();

        if let Err(issues) = validate_arguments(&spec, &arguments) {
            return Err(AgentError::InvalidArguments {
                tool: name.to_string(),
                issues,
            });
        }

        match tool.run(arguments.clone()).await {
            Ok(payload) => Ok(ToolInvocationResult::ok(name, arguments, payload)),
            Err(failure) => Ok(ToolInvocationResult::error(
                name,
                arguments,
                failure.into_payload(),
            )),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
