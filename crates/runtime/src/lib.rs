//! Abacus runtime: a tool-calling agent loop.
//!
//! This crate provides the model client abstraction, the tool registry and
//! executor, and the loop that ties them together.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Agent**: runs one input through repeated rounds of model query and
//!   tool execution until the model produces a final answer.
//! - **Backend**: a trait abstracting LLM providers (OpenAI, Anthropic, or
//!   a scripted stand-in).
//! - **ToolRegistry**: named tools with explicit parameter schemas, built
//!   once and shared read-only between runs.
//! - **Transcript**: the ordered message log of a single run.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{Agent, OpenAiBackend, arithmetic_registry};
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = OpenAiBackend::builder("sk-...", "gpt-4o-mini").build();
//! let agent = Agent::builder(backend, arithmetic_registry()?)
//!     .max_rounds(10)
//!     .build();
//!
//! let outcome = agent.run("What is 2 + 2?").await?;
//! println!("{}", outcome.output);
//! # Ok(())
//! # }
//! ```

mod agent;
mod error;
pub mod model;
pub mod prompt;
mod providers;
pub mod tools;
mod transcript;

// Loop controller
pub use agent::{Agent, AgentBuilder, DEFAULT_MAX_ROUNDS, RunOutcome};

// Model protocol types (provider-agnostic)
pub use model::{
    Backend, Message, ModelError, ModelOutput, ModelRequest, ModelResponse, ScriptedBackend,
    ToolCall, ToolOutcome, ToolResult, Usage,
};

// Provider backends
pub use providers::{AnthropicBackend, AnthropicBackendBuilder, OpenAiBackend, OpenAiBackendBuilder};

// Tools
pub use tools::{Tool, ToolError, ToolRegistry, ToolSpec, arithmetic_registry};

// Error types
pub use error::{Error, Result};

pub use transcript::Transcript;
