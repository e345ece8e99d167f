//! Tool registry, argument validation and execution.

mod arithmetic;
pub mod errors;
pub mod executor;
mod registry;
mod spec;

pub use arithmetic::{IntegerOp, arithmetic_registry};
pub use errors::{ArgumentProblem, ProblemReason, ToolError};
pub use executor::{execute, execute_round, execute_to_result};
pub use registry::{Tool, ToolRegistry};
pub use spec::{ParamSpec, ParamType, ToolSpec};
