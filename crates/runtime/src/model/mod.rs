//! Conversation types and the model client trait.

pub mod errors;
mod scripted;
pub mod types;

pub use errors::ModelError;
pub use scripted::ScriptedBackend;
pub use types::{
    Arguments, Backend, Message, ModelOutput, ModelRequest, ModelResponse, ToolCall, ToolOutcome,
    ToolResult, Usage,
};
