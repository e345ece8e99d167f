//! Tool call execution.

use super::{ToolError, ToolRegistry};
use crate::model::{ToolCall, ToolResult};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

/// Execute one tool call.
///
/// Arguments are validated before the tool is touched; a call that fails
/// validation never reaches the tool.
pub async fn execute(call: &ToolCall, registry: &ToolRegistry) -> Result<Value, ToolError> {
    let tool = registry.lookup(&call.tool_name)?;

    tool.spec()
        .validate(&call.arguments)
        .map_err(|problems| ToolError::InvalidArguments {
            tool: call.tool_name.clone(),
            problems,
        })?;

    tool.call(&call.arguments).await
}

/// Execute one call and fold any failure into an error result.
pub async fn execute_to_result(call: &ToolCall, registry: &ToolRegistry) -> ToolResult {
    match execute(call, registry).await {
        Ok(output) => {
            debug!(call_id = %call.id, tool = %call.tool_name, %output, "tool call succeeded");
            ToolResult::success(&call.id, output)
        }
        Err(e) => {
            warn!(call_id = %call.id, tool = %call.tool_name, error = %e, "tool call failed");
            ToolResult::error(&call.id, e.kind(), e.to_string())
        }
    }
}

/// Execute every call of one round concurrently.
///
/// Results come back in request order regardless of completion order.
/// Dropping the returned future drops every outstanding call.
pub async fn execute_round(calls: &[ToolCall], registry: &ToolRegistry) -> Vec<ToolResult> {
    join_all(calls.iter().map(|call| execute_to_result(call, registry))).await
}
