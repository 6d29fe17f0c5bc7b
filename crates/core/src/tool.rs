//! Tool providers and tool dispatch.
//!
//! Tools are what give the agent the ability to act: arithmetic, file
//! access, and whatever else a [`ToolProvider`] exposes. [`ToolDispatch`]
//! aggregates providers, routes calls by name and caps response size.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// Default cap on tool response text, in characters.
pub const DEFAULT_MAX_RESPONSE_LENGTH: usize = 6000;

/// A single callable operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add", "readFile").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: Value) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A name-indexed family of operations with declared schemas.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Definitions of every operation this provider owns.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run the named operation.
    async fn execute(&self, name: &str, arguments: Value) -> std::result::Result<String, ToolError>;
}

/// A [`ToolProvider`] built from individual [`Tool`] values.
#[derive(Default)]
pub struct ToolSet {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    pub fn push(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolProvider for ToolSet {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    async fn execute(&self, name: &str, arguments: Value) -> std::result::Result<String, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(arguments).await
    }
}

/// Routes tool calls to the provider that declared them.
///
/// The definition list is fixed at construction. Names are unique across
/// all providers and every schema is a JSON object schema.
pub struct ToolDispatch {
    providers: Vec<Arc<dyn ToolProvider>>,
    definitions: Vec<ToolDefinition>,
    /// name -> (provider index, definition index)
    routes: HashMap<String, (usize, usize)>,
    max_response_length: usize,
}

impl ToolDispatch {
    /// Aggregate `providers`, rejecting duplicate names and malformed schemas.
    pub fn new(
        providers: Vec<Arc<dyn ToolProvider>>,
        max_response_length: usize,
    ) -> std::result::Result<Self, ToolError> {
        let mut definitions = Vec::new();
        let mut routes = HashMap::new();

        for (index, provider) in providers.iter().enumerate() {
            for def in provider.definitions() {
                validate_schema(&def)?;
                if routes.insert(def.name.clone(), (index, definitions.len())).is_some() {
                    return Err(ToolError::DuplicateTool(def.name));
                }
                definitions.push(def);
            }
        }

        debug!(tools = definitions.len(), providers = providers.len(), "Tool dispatch assembled");

        Ok(Self {
            providers,
            definitions,
            routes,
            max_response_length,
        })
    }

    /// All tool definitions, in provider registration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn max_response_length(&self) -> usize {
        self.max_response_length
    }

    /// Execute with arguments given as JSON text, the way models return them.
    /// Empty text means "no arguments".
    pub async fn execute_json(&self, name: &str, arguments: &str) -> std::result::Result<String, ToolError> {
        let trimmed = arguments.trim();
        let value = if trimmed.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(trimmed)
                .map_err(|e| ToolError::invalid_arguments(name, format!("malformed JSON: {e}")))?
        };
        self.execute(name, value).await
    }

    /// Route a call by exact name and cap the result length.
    pub async fn execute(&self, name: &str, arguments: Value) -> std::result::Result<String, ToolError> {
        let (provider, def) = *self
            .routes
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        validate_arguments(&self.definitions[def], &arguments)?;

        let output = self.providers[provider].execute(name, arguments).await?;
        Ok(limit_response(&output, self.max_response_length))
    }
}

fn validate_schema(def: &ToolDefinition) -> std::result::Result<(), ToolError> {
    let invalid = |reason: &str| ToolError::InvalidSchema {
        tool_name: def.name.clone(),
        reason: reason.to_string(),
    };

    if def.name.trim().is_empty() {
        return Err(invalid("empty tool name"));
    }
    let schema = def
        .parameters
        .as_object()
        .ok_or_else(|| invalid("parameter schema must be a JSON object"))?;
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(invalid(r#"parameter schema must declare "type": "object""#));
    }
    if let Some(required) = schema.get("required") {
        if !required.as_array().is_some_and(|r| r.iter().all(Value::is_string)) {
            return Err(invalid(r#""required" must be an array of strings"#));
        }
    }
    Ok(())
}

fn validate_arguments(def: &ToolDefinition, arguments: &Value) -> std::result::Result<(), ToolError> {
    let args = arguments
        .as_object()
        .ok_or_else(|| ToolError::invalid_arguments(&def.name, "arguments must be a JSON object"))?;

    let required = def
        .parameters
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    let missing: Vec<&str> = required.into_iter().filter(|key| !args.contains_key(*key)).collect();
    if !missing.is_empty() {
        return Err(ToolError::invalid_arguments(
            &def.name,
            format!("missing required argument(s): {}", missing.join(", ")),
        ));
    }
    Ok(())
}

/// Cap `text` at `max_length` characters.
///
/// Longer text keeps its first 60% and last 30% of `max_length` with a
/// marker naming the omitted count in between; shorter text is returned
/// unchanged. Lengths are counted in characters.
pub fn limit_response(text: &str, max_length: usize) -> String {
    let total = text.chars().count();
    if total <= max_length {
        return text.to_string();
    }

    let head_len = max_length * 6 / 10;
    let tail_len = max_length * 3 / 10;
    let omitted = total - head_len - tail_len;

    let head: String = text.chars().take(head_len).collect();
    let tail: String = text.chars().skip(total - tail_len).collect();

    warn!(total, omitted, "Tool response truncated");
    format!("{head}\n\n... [content truncated, {omitted} characters omitted] ...\n\n{tail}")
}
