use crate::tools::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single handler execution
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest argument preview written to the log
const ARGS_LOG_LIMIT: usize = 200;

/// Trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool declaration advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with already-validated arguments.
    /// Returns the raw output payload; the registry validates it against
    /// the declared output schema before wrapping it in a result.
    async fn execute(&self, params: Value) -> Result<Value, String>;

    /// Returns the tool's name
    fn name(&self) -> String {
        self.definition().name
    }
}

/// Error raised at registry-build time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateTool(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateTool(name) => {
                write!(f, "tool '{}' is already registered", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Registry that holds all available tools.
/// Uses interior mutability (RwLock) so registration takes &self and the
/// registry can be shared behind an Arc between agents.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: RwLock::new(HashMap::new()),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        ToolRegistry {
            tools: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Register a tool. Fails if a tool with the same name is present.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.definition().name;
        let mut tools = self.tools.write();
        if tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        log::info!("[REGISTRY] Registered tool '{}'", name);
        tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Full declaration list for LLM tool advertisement
    pub fn describe(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .read()
            .values()
            .map(|tool| tool.definition())
            .collect();
        // Stable advertisement order keeps prompts deterministic
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Invoke a tool by name.
    ///
    /// Unknown tool, invalid arguments, handler failure, timeout, and
    /// output-schema mismatch all come back as failure results so the agent
    /// loop can fold them into the conversation. Invalid arguments never
    /// reach the handler.
    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolResult {
        let tool = match self.get(name) {
            Some(t) => t,
            None => {
                log::warn!("[REGISTRY] Unknown tool requested: {}", name);
                return ToolResult::error(format!("Unknown tool: {}", name));
            }
        };

        let definition = tool.definition();
        log::info!(
            "[REGISTRY] Invoking '{}' args={}",
            name,
            preview_args(&arguments)
        );

        if let Err(reason) = definition.input_schema.validate(&arguments) {
            log::warn!("[REGISTRY] Invalid arguments for '{}': {}", name, reason);
            return ToolResult::error(format!("Invalid arguments for '{}': {}", name, reason));
        }

        let outcome = tokio::time::timeout(self.timeout, tool.execute(arguments)).await;
        let payload = match outcome {
            Err(_) => {
                log::warn!(
                    "[REGISTRY] Tool '{}' timed out after {:?}",
                    name,
                    self.timeout
                );
                return ToolResult::error(format!(
                    "Tool '{}' timed out after {}s",
                    name,
                    self.timeout.as_secs()
                ));
            }
            Ok(Err(message)) => {
                log::warn!("[REGISTRY] Tool '{}' failed: {}", name, message);
                return ToolResult::error(message);
            }
            Ok(Ok(payload)) => payload,
        };

        if let Err(reason) = definition.output_schema.validate(&payload) {
            log::warn!(
                "[REGISTRY] Tool '{}' returned output violating its schema: {}",
                name,
                reason
            );
            return ToolResult::error(format!(
                "Tool '{}' produced malformed output: {}",
                name, reason
            ));
        }

        log::info!("[REGISTRY] Tool '{}' succeeded", name);
        ToolResult::success(payload)
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.read().contains_key(name)
    }

    /// Get count of registered tools
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn preview_args(arguments: &Value) -> String {
    let rendered = arguments.to_string();
    if rendered.len() <= ARGS_LOG_LIMIT {
        return rendered;
    }
    // serde_json leaves non-ASCII unescaped; the cut must land on a char
    // boundary or slicing panics
    let mut cut = ARGS_LOG_LIMIT;
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &rendered[..cut])
}
