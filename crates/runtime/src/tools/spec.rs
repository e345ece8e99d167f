//! Tool schema types.

use super::errors::{ArgumentProblem, ProblemReason};
use crate::model::Arguments;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamType {
    /// Whether a JSON value is of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: String::new(),
        }
    }

    /// An optional parameter.
    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON Schema describing the parameters, as providers expect it.
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                let mut property = json!({ "type": p.param_type.as_str() });
                if !p.description.is_empty() {
                    property["description"] = Value::String(p.description.clone());
                }
                (p.name.clone(), property)
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check arguments against the declared parameters.
    ///
    /// Collects every problem rather than stopping at the first: missing
    /// required parameters, values of the wrong type, and names that are not
    /// declared. A `null` optional parameter counts as absent.
    pub fn validate(&self, arguments: &Arguments) -> Result<(), Vec<ArgumentProblem>> {
        let mut problems = Vec::new();

        for param in &self.parameters {
            match arguments.get(&param.name) {
                None | Some(Value::Null) if param.required => problems.push(ArgumentProblem {
                    parameter: param.name.clone(),
                    reason: ProblemReason::Missing,
                }),
                None | Some(Value::Null) => {}
                Some(value) if !param.param_type.accepts(value) => {
                    problems.push(ArgumentProblem {
                        parameter: param.name.clone(),
                        reason: ProblemReason::WrongType {
                            expected: param.param_type,
                        },
                    })
                }
                Some(_) => {}
            }
        }

        for name in arguments.keys() {
            if !self.parameters.iter().any(|p| &p.name == name) {
                problems.push(ArgumentProblem {
                    parameter: name.clone(),
                    reason: ProblemReason::Undeclared,
                });
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}
