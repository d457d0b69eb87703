//! Tool Registry
//!
//! Tools are named async functions the agent runtime may ask us to run. Each
//! tool declares a JSON schema for its arguments, derived from a typed args
//! struct, and always answers with a string.

use futures::{FutureExt, future::BoxFuture};
use openai_realtime_types::ToolSpec;
use schemars::{JsonSchema, SchemaGenerator, generate::SchemaSettings};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fmt, future::Future, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),
    #[error("Tool '{0}' not found")]
    NotFound(String),
    #[error("Invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

type Executor = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>;

/// A callable tool: name, description, argument schema and body.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    parameters: Value,
    executor: Executor,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    /// Creates a tool whose arguments deserialize into `A`.
    ///
    /// The parameter schema is generated from `A`.
    pub fn new<A, F, Fut>(name: impl Into<String>, description: impl Into<String>, execute: F) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        let name = name.into();
        let tool_name = name.clone();
        let execute = Arc::new(execute);
        let executor: Executor = Arc::new(move |raw: Value| {
            let tool_name = tool_name.clone();
            let execute = execute.clone();
            async move {
                let args: A = serde_json::from_value(raw).map_err(|source| ToolError::InvalidArguments {
                    tool: tool_name,
                    source,
                })?;
                Ok(execute(args).await)
            }
            .boxed()
        });
        Self {
            name,
            description: description.into(),
            parameters: parameters_schema::<A>(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub async fn call(&self, args: Value) -> Result<String, ToolError> {
        (self.executor)(args).await
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec::function(&self.name, &self.description, self.parameters.clone())
    }
}

fn parameters_schema<A: JsonSchema>() -> Value {
    let generator = SchemaGenerator::new(SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    }));
    let mut schema = generator.into_root_schema_for::<A>();
    schema.remove("title");
    schema.to_value()
}

/// An ordered set of tools with unique names.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: ToolDefinition) -> Result<(), ToolError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::Duplicate(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: ToolDefinition) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    /// Tool specs in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(ToolDefinition::spec).collect()
    }

    /// Runs a tool from raw JSON arguments as sent by the model.
    ///
    /// Never fails: every error becomes a descriptive string so the model can
    /// see what went wrong.
    pub async fn execute(&self, name: &str, raw_arguments: &str) -> String {
        match self.try_execute(name, raw_arguments).await {
            Ok(output) => {
                info!(tool = %name, "Tool executed");
                output
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                format!("Error: {}", e)
            }
        }
    }

    async fn try_execute(&self, name: &str, raw_arguments: &str) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let args: Value = if raw_arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw_arguments).map_err(|source| ToolError::InvalidArguments {
                tool: name.to_string(),
                source,
            })?
        };
        tool.call(args).await
    }
}
