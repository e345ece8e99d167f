use super::spec::ParamType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from tool registration and execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("duplicate tool: {0}")]
    Duplicate(String),
    #[error("tool not found: {0}")]
    Unknown(String),
    #[error("invalid arguments for {tool}: {}", join(.problems))]
    InvalidArguments {
        tool: String,
        problems: Vec<ArgumentProblem>,
    },
    #[error("{tool} failed: {cause}")]
    Execution { tool: String, cause: String },
}

impl ToolError {
    /// Build an execution failure.
    pub fn execution(tool: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::Execution {
            tool: tool.into(),
            cause: cause.to_string(),
        }
    }

    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Duplicate(_) => "duplicate_tool",
            Self::Unknown(_) => "unknown_tool",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Execution { .. } => "tool_execution",
        }
    }
}

/// One parameter that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentProblem {
    pub parameter: String,
    pub reason: ProblemReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ProblemReason {
    Missing,
    WrongType { expected: ParamType },
    Undeclared,
}

impl fmt::Display for ArgumentProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ProblemReason::Missing => write!(f, "{} is required", self.parameter),
            ProblemReason::WrongType { expected } => {
                write!(f, "{} must be {expected}", self.parameter)
            }
            ProblemReason::Undeclared => write!(f, "{} is not a parameter", self.parameter),
        }
    }
}

fn join(problems: &[ArgumentProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
