//! Builtin integer arithmetic tools.

use super::{ParamSpec, ParamType, Tool, ToolError, ToolRegistry, ToolSpec};
use crate::model::Arguments;
use async_trait::async_trait;
use serde_json::Value;

/// A binary integer operation over parameters `a` and `b`.
pub struct IntegerOp {
    spec: ToolSpec,
    op: fn(i64, i64) -> Option<i64>,
}

impl IntegerOp {
    fn new(name: &str, description: &str, op: fn(i64, i64) -> Option<i64>) -> Self {
        Self {
            spec: ToolSpec::new(name, description)
                .param(ParamSpec::required("a", ParamType::Integer))
                .param(ParamSpec::required("b", ParamType::Integer)),
            op,
        }
    }

    pub fn add() -> Self {
        Self::new(
            "add",
            "Adds two integers and returns the result.",
            i64::checked_add,
        )
    }

    pub fn multiply() -> Self {
        Self::new(
            "multiply",
            "Multiplies two integers and returns the result.",
            i64::checked_mul,
        )
    }

    fn operand(&self, arguments: &Arguments, name: &str) -> Result<i64, ToolError> {
        arguments
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::execution(&self.spec.name, format!("{name} is out of range")))
    }
}

#[async_trait]
impl Tool for IntegerOp {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let a = self.operand(arguments, "a")?;
        let b = self.operand(arguments, "b")?;
        (self.op)(a, b)
            .map(Value::from)
            .ok_or_else(|| ToolError::execution(&self.spec.name, "integer overflow"))
    }
}

/// Registry holding `multiply` and `add`.
pub fn arithmetic_registry() -> Result<ToolRegistry, ToolError> {
    ToolRegistry::new()
        .with(IntegerOp::multiply())?
        .with(IntegerOp::add())
}
