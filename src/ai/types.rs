use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// LLM transport error with status code information.
///
/// Transport errors are fatal for a run: the loop never retries them and
/// reports them upward as a structured failure. Tool failures, by contrast,
/// are folded back into the conversation and never surface as errors.
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error message
    pub message: String,
    /// HTTP status code if available
    pub status_code: Option<u16>,
}

impl LlmError {
    pub fn new(message: impl Into<String>) -> Self {
        LlmError {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        LlmError {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Check if this is a client error (4xx status code)
    pub fn is_client_error(&self) -> bool {
        self.status_code.map(|c| (400..500).contains(&c)).unwrap_or(false)
    }

    /// Check if this is a server error (5xx status code)
    pub fn is_server_error(&self) -> bool {
        self.status_code.map(|c| c >= 500).unwrap_or(false)
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.status_code {
            write!(f, "[HTTP {}] {}", code, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl From<String> for LlmError {
    fn from(s: String) -> Self {
        LlmError::new(s)
    }
}

impl From<&str> for LlmError {
    fn from(s: &str) -> Self {
        LlmError::new(s)
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call within the run
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Arguments as produced by the model, unvalidated
    pub arguments: Value,
}

/// The outcome of one tool execution, attributed back to its call id
/// and sent to the model as structured tool-output content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// ID of the tool call this responds to
    pub tool_call_id: String,
    /// Name of the tool that produced this response
    pub tool_name: String,
    /// JSON content of the response ({"result": ...} or {"error": ...})
    pub content: Value,
    /// Whether the execution failed
    pub is_error: bool,
}

impl ToolResponse {
    pub fn success(tool_call_id: String, tool_name: String, payload: Value) -> Self {
        ToolResponse {
            tool_call_id,
            tool_name,
            content: serde_json::json!({ "result": payload }),
            is_error: false,
        }
    }

    pub fn error(tool_call_id: String, tool_name: String, message: String) -> Self {
        ToolResponse {
            tool_call_id,
            tool_name,
            content: serde_json::json!({ "error": message }),
            is_error: true,
        }
    }
}

/// One completed round of tool calls and their responses.
/// The loop appends one entry per EXECUTING_TOOLS pass so the model always
/// sees every requested result together, never a subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolHistoryEntry {
    /// The tool calls made by the model
    pub tool_calls: Vec<ToolCall>,
    /// The responses from executing those calls, same order
    pub tool_responses: Vec<ToolResponse>,
}

impl ToolHistoryEntry {
    pub fn new(tool_calls: Vec<ToolCall>, tool_responses: Vec<ToolResponse>) -> Self {
        ToolHistoryEntry {
            tool_calls,
            tool_responses,
        }
    }
}

/// Unified model response: final text, zero or more tool calls, or both
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text content of the response (may be empty if only tool calls)
    pub content: String,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    pub fn text(content: String) -> Self {
        LlmResponse {
            content,
            tool_calls: vec![],
        }
    }

    pub fn with_tools(content: String, tool_calls: Vec<ToolCall>) -> Self {
        LlmResponse {
            content,
            tool_calls,
        }
    }

    /// Check if the model wants tools executed before it can answer
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
