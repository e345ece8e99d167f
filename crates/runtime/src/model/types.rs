//! Conversation and model protocol types (provider-agnostic).

use super::errors::ModelError;
use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;

/// Arguments of a tool call, keyed by parameter name.
pub type Arguments = Map<String, Value>;

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (used to correlate results).
    pub id: String,
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Arguments by parameter name.
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    /// Build a call from literal arguments.
    ///
    /// A non-object `arguments` value gives a call with no arguments. Model
    /// output goes through [`ToolCall::decode`] instead, which rejects it.
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Build a call from arguments a model produced.
    pub fn decode(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Value,
    ) -> Result<Self, ModelError> {
        let tool_name = tool_name.into();
        match arguments {
            Value::Object(arguments) => Ok(Self {
                id: id.into(),
                tool_name,
                arguments,
            }),
            other => Err(ModelError::Malformed(format!(
                "arguments for {tool_name} must be an object, got {other}"
            ))),
        }
    }
}

/// Outcome of a tool execution as seen by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// Tool executed successfully.
    Success { output: Value },
    /// Tool could not be run or failed while running.
    Error { kind: String, message: String },
}

impl ToolOutcome {
    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Render the outcome as the text content handed back to the model.
    pub fn content(&self) -> String {
        match self {
            Self::Success {
                output: Value::String(s),
            } => s.clone(),
            Self::Success { output } => output.to_string(),
            Self::Error { kind, message } => {
                serde_json::json!({ "error": { "kind": kind, "message": message } }).to_string()
            }
        }
    }
}

/// Result of one tool call, paired with the call ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub call_id: String,
    /// Outcome of the execution.
    pub outcome: ToolOutcome,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(call_id: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Success { output },
        }
    }

    /// Create an error result.
    pub fn error(
        call_id: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Error {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }
}

/// A message in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// Input from the caller.
    User { content: String },
    /// A model turn, optionally requesting tool calls.
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// The result of one requested tool call.
    ToolResult(ToolResult),
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant message carrying only text.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Text content of the message.
    pub fn content(&self) -> String {
        match self {
            Self::User { content } | Self::Assistant { content, .. } => content.clone(),
            Self::ToolResult(result) => result.outcome.content(),
        }
    }

    /// Tool calls requested by this message (assistant only).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// Everything needed for a model request.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// What the model decided to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// The model answered; the run is complete.
    FinalAnswer { text: String },
    /// The model wants these tools run before it continues.
    ToolRequest {
        /// Any text the model emitted alongside the calls.
        text: String,
        calls: Vec<ToolCall>,
    },
}

impl ModelResponse {
    /// Classify a decoded reply.
    ///
    /// Tool calls win over text. A reply with neither is malformed.
    pub fn classify(text: String, calls: Vec<ToolCall>) -> Result<Self, ModelError> {
        if !calls.is_empty() {
            return Ok(Self::ToolRequest { text, calls });
        }
        if text.trim().is_empty() {
            return Err(ModelError::Malformed(
                "response carries neither text nor tool calls".into(),
            ));
        }
        Ok(Self::FinalAnswer { text })
    }

    /// The assistant message to record in the transcript.
    pub fn to_message(&self) -> Message {
        match self {
            Self::FinalAnswer { text } => Message::assistant(text.clone()),
            Self::ToolRequest { text, calls } => Message::Assistant {
                content: text.clone(),
                tool_calls: calls.clone(),
            },
        }
    }
}

/// A classified model reply plus accounting.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub response: ModelResponse,
    pub usage: Usage,
}

/// Trait for LLM provider backends (the model client).
pub trait Backend: Send + Sync {
    fn call(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<ModelOutput, ModelError>> + Send;
}
