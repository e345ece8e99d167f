use crate::model::ModelError;
use crate::tools::ToolError;
use thiserror::Error;

/// Errors that end a run.
///
/// Tool failures during a run are not in here: they are handed back to the
/// model as error results. `Tool` only surfaces from registry setup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("exceeded the limit of {0} tool rounds")]
    MaxRoundsExceeded(usize),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("run cancelled")]
    Cancelled,
}

impl Error {
    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Model(ModelError::Unavailable(_)) => "model_unavailable",
            Self::Model(ModelError::Malformed(_)) => "malformed_response",
            Self::Tool(e) => e.kind(),
            Self::MaxRoundsExceeded(_) => "max_rounds_exceeded",
            Self::InvalidState(_) => "invalid_state",
            Self::Cancelled => "cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
