//! Execution engine for tool calls
//!
//! Member agents hand a tool name and parameters to the engine and always get
//! a [`Finding`] back. Failures are captured, never propagated.

use crate::models::{Finding, FindingStatus, ToolInput};
use crate::tools::ToolRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct ExecutionEngine {
    tool_registry: Arc<ToolRegistry>,
}

impl ExecutionEngine {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self { tool_registry }
    }

    /// Run one tool for `subject` (a ticker or a search query)
    pub async fn execute(&self, tool_name: &str, subject: &str, parameters: Value) -> Finding {
        debug!(%tool_name, %subject, "Executing tool");

        let start = Instant::now();

        let tool_input = ToolInput {
            tool_name: tool_name.to_string(),
            parameters,
        };

        let (status, data) = match self.tool_registry.require(tool_name) {
            Ok(tool) => match tool.execute(&tool_input).await {
                Ok(output) if output.success => (FindingStatus::Success, output.data),
                Ok(output) => {
                    let error = output
                        .error
                        .unwrap_or_else(|| "tool reported failure".to_string());
                    warn!(%tool_name, %subject, %error, "Tool reported failure");
                    (FindingStatus::Failed, json!({ "error": error }))
                }
                Err(e) => {
                    warn!(%tool_name, %subject, error = %e, "Tool execution failed");
                    (FindingStatus::Failed, json!({ "error": e.to_string() }))
                }
            },
            Err(e) => {
                warn!(%tool_name, "Tool not registered");
                (FindingStatus::Failed, json!({ "error": e.to_string() }))
            }
        };

        Finding {
            tool_name: tool_name.to_string(),
            subject: subject.to_string(),
            status,
            data,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}
