//! Single-agent tool-calling loop.
//!
//! One run walks AWAITING_MODEL -> EXECUTING_TOOLS round trips until the
//! model produces a final text answer, the turn budget runs out, or the
//! transport fails. Tool failures never escape the loop; they are folded
//! back into the conversation as failure results so the model can recover
//! conversationally.

use crate::ai::types::{LlmError, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::ai::{LlmClient, Message};
use crate::stores::MemoryStore;
use crate::tools::{ToolRegistry, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const EMPTY_PROMPT_GUIDANCE: &str = "Prompt is empty. Please provide a question.";
const TURN_BUDGET_MESSAGE: &str = "Stopped after too many tool-call turns.";

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The model produced a final text answer
    Complete,
    /// The turn budget ran out; the response is best-effort, not an answer
    TurnBudgetExhausted,
}

/// Final result of a run. Degraded completions carry a response too:
/// some user-facing answer is preferable to none.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub response: String,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn complete(response: String) -> Self {
        RunOutcome {
            response,
            status: RunStatus::Complete,
        }
    }

    pub fn degraded(response: String) -> Self {
        RunOutcome {
            response,
            status: RunStatus::TurnBudgetExhausted,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == RunStatus::TurnBudgetExhausted
    }
}

/// Fatal run failure, reported upward with the stage that failed.
/// Only transport-level problems abort a run.
#[derive(Debug, Clone)]
pub struct AgentError {
    pub stage: String,
    pub error: LlmError,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for AgentError {}

/// Anything that can answer one prompt. Implemented by the single agent,
/// the multi-agent coordinator, and the router coordinator, so callers and
/// the HTTP layer stay agnostic of the execution path.
#[async_trait]
pub trait PromptRunner: Send + Sync {
    async fn run(&self, prompt: &str) -> Result<RunOutcome, AgentError>;
}

/// Observer for tool results as they complete within a run.
/// The multi-agent coordinator uses this to mirror executor progress into
/// the mailbox while the run is still going.
pub trait ToolTrace: Send + Sync {
    fn on_tool_result(&self, call: &ToolCall, result: &ToolResult);
}

/// Agent that orchestrates LLM <-> tools interaction for one role
pub struct ToolAgent {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    system_prompt: Option<String>,
    memory: Option<Arc<dyn MemoryStore>>,
    max_turns: usize,
    label: String,
}

impl ToolAgent {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>, max_turns: usize) -> Self {
        ToolAgent {
            llm,
            registry,
            system_prompt: None,
            memory: None,
            max_turns: max_turns.max(1),
            label: "agent".to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Label used in logs and error stages ("planner", "executor", ...)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn transport_error(&self, error: LlmError) -> AgentError {
        AgentError {
            stage: self.label.clone(),
            error,
        }
    }

    fn remember(&self, prompt: &str, response: &str) {
        if let Some(memory) = &self.memory {
            if let Err(e) = memory.append(prompt, response) {
                // A lost memory entry degrades future context, not this run
                log::error!("[{}] Failed to save memory entry: {}", self.label, e);
            }
        }
    }

    /// Run one prompt through the tool-calling loop and return the outcome
    pub async fn run_traced(
        &self,
        prompt: &str,
        trace: Option<&dyn ToolTrace>,
    ) -> Result<RunOutcome, AgentError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            log::warn!("[{}] Empty prompt received; returning guidance", self.label);
            return Ok(RunOutcome::complete(EMPTY_PROMPT_GUIDANCE.to_string()));
        }

        log::info!(
            "[{}] Run started: prompt_chars={} max_turns={}",
            self.label,
            prompt.len(),
            self.max_turns
        );

        let mut messages: Vec<Message> = Vec::new();
        if let Some(system_prompt) = &self.system_prompt {
            messages.push(Message::system(system_prompt));
        }

        // Recent exchanges, oldest first, as conversational context
        if let Some(memory) = &self.memory {
            match memory.format_for_prompt() {
                Ok(context) if !context.is_empty() => {
                    log::debug!("[{}] Memory context attached: {} chars", self.label, context.len());
                    messages.push(Message::user(format!(
                        "Previous conversation context:\n{}",
                        context
                    )));
                }
                Ok(_) => {}
                Err(e) => log::warn!("[{}] Failed to load memory context: {}", self.label, e),
            }
        }

        messages.push(Message::user(prompt));

        let tools = self.registry.describe();
        let mut tool_history: Vec<ToolHistoryEntry> = Vec::new();

        for turn in 1..=self.max_turns {
            log::info!("[{}] LLM turn {}/{}", self.label, turn, self.max_turns);

            // AWAITING_MODEL: transport failures here are fatal for the run
            let response = self
                .llm
                .send(messages.clone(), tool_history.clone(), tools.clone())
                .await
                .map_err(|e| self.transport_error(e))?;

            if !response.has_tool_calls() {
                // DONE
                log::info!(
                    "[{}] Final response received: {} chars",
                    self.label,
                    response.content.len()
                );
                self.remember(prompt, &response.content);
                return Ok(RunOutcome::complete(response.content));
            }

            // EXECUTING_TOOLS: every requested call runs before the next
            // model turn, results attributed back by call id
            log::info!(
                "[{}] LLM requested {} tool call(s)",
                self.label,
                response.tool_calls.len()
            );
            let mut tool_responses: Vec<ToolResponse> = Vec::new();
            for call in &response.tool_calls {
                let result = self.registry.invoke(&call.name, call.arguments.clone()).await;
                if let Some(trace) = trace {
                    trace.on_tool_result(call, &result);
                }
                tool_responses.push(to_tool_response(call, result));
            }
            tool_history.push(ToolHistoryEntry::new(response.tool_calls, tool_responses));
        }

        // FAILED: turn budget exhausted. Degraded completion, not an error.
        log::warn!(
            "[{}] Turn budget of {} exhausted; returning best-effort answer",
            self.label,
            self.max_turns
        );
        self.remember(prompt, TURN_BUDGET_MESSAGE);
        Ok(RunOutcome::degraded(TURN_BUDGET_MESSAGE.to_string()))
    }
}

#[async_trait]
impl PromptRunner for ToolAgent {
    async fn run(&self, prompt: &str) -> Result<RunOutcome, AgentError> {
        self.run_traced(prompt, None).await
    }
}

fn to_tool_response(call: &ToolCall, result: ToolResult) -> ToolResponse {
    if result.success {
        ToolResponse::success(
            call.id.clone(),
            call.name.clone(),
            result.payload.unwrap_or(Value::Null),
        )
    } else {
        ToolResponse::error(
            call.id.clone(),
            call.name.clone(),
            result.error.unwrap_or_else(|| "tool failed".to_string()),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::types::LlmResponse;
    use crate::db::Database;
    use crate::stores::SqliteMemoryStore;
    use crate::tools::registry::Tool;
    use crate::tools::types::{ObjectSchema, PropertySchema, ToolDefinition};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::collections::VecDeque;

    /// LLM stub that replays a fixed sequence of responses
    pub(crate) struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
        /// Tool declaration counts seen per call, for asserting tool
        /// advertisement
        pub seen_tool_counts: Mutex<Vec<usize>>,
    }

    impl ScriptedLlm {
        pub fn new(responses: Vec<Result<LlmResponse, LlmError>>) -> Self {
            ScriptedLlm {
                responses: Mutex::new(responses.into()),
                seen_tool_counts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn send(
            &self,
            _messages: Vec<Message>,
            _tool_history: Vec<ToolHistoryEntry>,
            tools: Vec<crate::tools::ToolDefinition>,
        ) -> Result<LlmResponse, LlmError> {
            self.seen_tool_counts.lock().push(tools.len());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(LlmResponse::text("exhausted script".to_string())))
        }
    }

    /// Weather stub used for end-to-end loop tests
    pub(crate) struct StubWeatherTool;

    #[async_trait]
    impl Tool for StubWeatherTool {
        fn definition(&self) -> ToolDefinition {
            let mut input = HashMap::new();
            input.insert("location".to_string(), PropertySchema::string("City name"));
            let mut output = HashMap::new();
            output.insert("temp_c".to_string(), PropertySchema::number("Celsius"));
            output.insert("condition".to_string(), PropertySchema::string("Condition"));
            ToolDefinition {
                name: "get_current_weather".to_string(),
                description: "Get the current weather for a city.".to_string(),
                input_schema: ObjectSchema::new(input, vec!["location".to_string()]),
                output_schema: ObjectSchema::new(output, vec![]),
            }
        }

        async fn execute(&self, _params: Value) -> Result<Value, String> {
            Ok(serde_json::json!({"temp_c": 8, "condition": "Cloudy"}))
        }
    }

    pub(crate) fn weather_call() -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: "get_current_weather".to_string(),
            arguments: serde_json::json!({"location": "Tokyo"}),
        }
    }

    fn memory_store() -> Arc<SqliteMemoryStore> {
        Arc::new(SqliteMemoryStore::new(
            Arc::new(Database::new_in_memory().unwrap()),
            10,
        ))
    }

    #[tokio::test]
    async fn test_text_only_run_completes_first_turn() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(LlmResponse::text(
            "Paris is the capital of France.".to_string(),
        ))]));
        let agent = ToolAgent::new(llm, Arc::new(ToolRegistry::new()), 5);

        let outcome = agent.run("capital of France?").await.unwrap();
        assert_eq!(outcome.response, "Paris is the capital of France.");
        assert!(!outcome.is_degraded());
    }

    #[tokio::test]
    async fn test_tool_round_then_final_answer_appends_memory_once() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(StubWeatherTool)).unwrap();

        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(LlmResponse::with_tools(String::new(), vec![weather_call()])),
            Ok(LlmResponse::text(
                "It's 8C and Cloudy in Tokyo.".to_string(),
            )),
        ]));
        let memory = memory_store();
        let agent = ToolAgent::new(llm.clone(), registry, 5).with_memory(memory.clone());

        let outcome = agent.run("What's the weather in Tokyo?").await.unwrap();
        assert!(outcome.response.contains('8'));
        assert!(outcome.response.contains("Cloudy"));

        let entries = memory.recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prompt, "What's the weather in Tokyo?");
        assert_eq!(entries[0].response, "It's 8C and Cloudy in Tokyo.");

        // Tool declarations were advertised on both turns
        assert_eq!(*llm.seen_tool_counts.lock(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_turn_budget_exhaustion_is_degraded_not_hung() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(StubWeatherTool)).unwrap();

        // Model keeps requesting tools forever
        let responses: Vec<Result<LlmResponse, LlmError>> = (0..10)
            .map(|_| Ok(LlmResponse::with_tools(String::new(), vec![weather_call()])))
            .collect();
        let memory = memory_store();
        let agent = ToolAgent::new(Arc::new(ScriptedLlm::new(responses)), registry, 3)
            .with_memory(memory.clone());

        let outcome = agent.run("loop forever").await.unwrap();
        assert!(outcome.is_degraded());
        assert!(!outcome.response.is_empty());

        // Degraded runs still leave a memory entry (best-effort answer)
        assert_eq!(memory.recent(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_failure_is_recoverable() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(StubWeatherTool)).unwrap();

        // First turn requests an unknown tool; loop must fold the failure
        // back and continue to the final answer
        let bad_call = ToolCall {
            id: "call_2".to_string(),
            name: "no_such_tool".to_string(),
            arguments: serde_json::json!({}),
        };
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(LlmResponse::with_tools(String::new(), vec![bad_call])),
            Ok(LlmResponse::text("Sorry, I could not look that up.".to_string())),
        ]));
        let agent = ToolAgent::new(llm, registry, 5);

        let outcome = agent.run("weather?").await.unwrap();
        assert_eq!(outcome.response, "Sorry, I could not look that up.");
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal_with_stage() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmError::with_status(
            "unauthorized",
            401,
        ))]));
        let agent =
            ToolAgent::new(llm, Arc::new(ToolRegistry::new()), 5).with_label("executor");

        let err = agent.run("anything").await.unwrap_err();
        assert_eq!(err.stage, "executor");
        assert!(err.error.is_client_error());
    }

    #[tokio::test]
    async fn test_empty_prompt_short_circuits_without_llm_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let agent = ToolAgent::new(llm.clone(), Arc::new(ToolRegistry::new()), 5);

        let outcome = agent.run("   ").await.unwrap();
        assert!(outcome.response.contains("empty"));
        assert!(llm.seen_tool_counts.lock().is_empty());
    }
}
