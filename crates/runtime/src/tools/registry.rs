//! Tool trait and registry.

use super::{ToolError, ToolSpec};
use crate::model::Arguments;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A callable tool.
///
/// Implementations declare their schema up front and receive arguments
/// that have already been validated against it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declared name, description and parameters.
    fn spec(&self) -> &ToolSpec;

    /// Run the tool.
    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError>;
}

/// Registered tools by name.
///
/// Built once before any run and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), ToolError> {
        let spec = tool.spec().clone();
        if self.tools.contains_key(&spec.name) {
            return Err(ToolError::Duplicate(spec.name));
        }
        self.tools.insert(spec.name.clone(), Arc::new(tool));
        self.specs.push(spec);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: impl Tool + 'static) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))
    }

    /// Specs in registration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamSpec, ParamType};
    use serde_json::json;

    struct Echo(ToolSpec);

    impl Echo {
        fn named(name: &str) -> Self {
            Self(
                ToolSpec::new(name, "Echoes its input.")
                    .param(ParamSpec::required("text", ParamType::String)),
            )
        }
    }

    #[async_trait]
    impl Tool for Echo {
        fn spec(&self) -> &ToolSpec {
            &self.0
        }

        async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
            Ok(arguments.get("text").cloned().unwrap_or(Value::Null))
        }
    }

    #[test]
    fn lookup_returns_registered_spec() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo::named("echo")).unwrap();

        let tool = registry.lookup("echo").unwrap();
        assert_eq!(tool.spec(), &Echo::named("echo").0);
        assert_eq!(registry.specs(), &[Echo::named("echo").0]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo::named("echo")).unwrap();

        let err = registry.register(Echo::named("echo")).unwrap_err();
        assert_eq!(err, ToolError::Duplicate("echo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_name_fails_lookup() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("divide").err().unwrap();
        assert_eq!(err, ToolError::Unknown("divide".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn specs_keep_registration_order() {
        let registry = ToolRegistry::new()
            .with(Echo::named("b"))
            .and_then(|r| r.with(Echo::named("a")))
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[tokio::test]
    async fn registered_tool_is_callable() {
        let registry = ToolRegistry::new().with(Echo::named("echo")).unwrap();
        let args = json!({"text": "hi"}).as_object().cloned().unwrap();
        let output = registry.lookup("echo").unwrap().call(&args).await.unwrap();
        assert_eq!(output, json!("hi"));
    }
}
