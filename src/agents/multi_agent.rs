//! Planner/executor coordination flow.
//!
//! Roles:
//! - planner: tool-free, turns the user request into a short plan and later
//!   synthesizes the final answer.
//! - executor: follows the plan through the tool-calling loop.
//!
//! Every step is appended to the mailbox under one thread_id, including the
//! executor's individual tool results as they complete, so a thread can be
//! replayed after the fact.

use crate::agents::agent::{AgentError, PromptRunner, RunOutcome, ToolAgent, ToolTrace};
use crate::ai::types::ToolCall;
use crate::ai::LlmClient;
use crate::stores::MailboxStore;
use crate::tools::{ToolRegistry, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const PLANNER_SYSTEM_PROMPT: &str = "You are a planner. Produce a short, numbered plan for the \
     executor. Do not call tools.";
const EXECUTOR_SYSTEM_PROMPT: &str = "You are an executor. Follow the plan, call tools when \
     needed, and return results.";

pub struct MultiAgentCoordinator {
    planner: ToolAgent,
    executor: ToolAgent,
    mailbox: Arc<dyn MailboxStore>,
}

/// Mirrors executor tool results into the mailbox while the loop runs
struct MailboxTrace<'a> {
    mailbox: &'a dyn MailboxStore,
    thread_id: &'a str,
}

impl ToolTrace for MailboxTrace<'_> {
    fn on_tool_result(&self, call: &ToolCall, result: &ToolResult) {
        let content = if result.success {
            json!({
                "tool": call.name,
                "arguments": call.arguments,
                "result": result.payload,
            })
        } else {
            json!({
                "tool": call.name,
                "arguments": call.arguments,
                "error": result.error,
            })
        };
        if let Err(e) = self
            .mailbox
            .send("executor", "planner", content, self.thread_id)
        {
            log::error!("[COORDINATOR] Failed to record tool result: {}", e);
        }
    }
}

impl MultiAgentCoordinator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor_registry: Arc<ToolRegistry>,
        mailbox: Arc<dyn MailboxStore>,
        max_turns: usize,
    ) -> Self {
        // The planner never sees tool declarations
        let planner = ToolAgent::new(llm.clone(), Arc::new(ToolRegistry::new()), max_turns)
            .with_system_prompt(PLANNER_SYSTEM_PROMPT)
            .with_label("planner");
        let executor = ToolAgent::new(llm, executor_registry, max_turns)
            .with_system_prompt(EXECUTOR_SYSTEM_PROMPT)
            .with_label("executor");

        MultiAgentCoordinator {
            planner,
            executor,
            mailbox,
        }
    }

    // A lost mailbox entry weakens the trace but never aborts the run
    fn record(&self, sender: &str, recipient: &str, content: Value, thread_id: &str) {
        if let Err(e) = self.mailbox.send(sender, recipient, content, thread_id) {
            log::error!("[COORDINATOR] Mailbox write failed: {}", e);
        }
    }

    /// Render the thread so far for the planner's synthesis step
    fn thread_digest(&self, thread_id: &str) -> String {
        match self.mailbox.thread(thread_id) {
            Ok(messages) => messages
                .iter()
                .map(|m| format!("{} -> {}: {}", m.sender, m.recipient, m.content))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                log::warn!("[COORDINATOR] Failed to read thread for synthesis: {}", e);
                String::new()
            }
        }
    }

    fn preview(text: &str) -> String {
        let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if clean.chars().count() <= 120 {
            clean
        } else {
            let head: String = clean.chars().take(117).collect();
            format!("{}...", head)
        }
    }
}

#[async_trait]
impl PromptRunner for MultiAgentCoordinator {
    async fn run(&self, prompt: &str) -> Result<RunOutcome, AgentError> {
        let thread_id = uuid::Uuid::new_v4().to_string();
        log::info!(
            "[COORDINATOR] Multi-agent run started: thread={} prompt={}",
            thread_id,
            Self::preview(prompt)
        );

        // Step 1: user request enters the mailbox for traceability
        self.record("user", "planner", json!({ "prompt": prompt }), &thread_id);

        // Step 2: planner creates the plan
        let plan = self
            .planner
            .run_traced(
                &format!(
                    "User request:\n{}\n\nReturn a short numbered plan for the executor.",
                    prompt
                ),
                None,
            )
            .await?;
        log::info!(
            "[COORDINATOR] Planner produced plan: {} chars",
            plan.response.len()
        );
        self.record(
            "planner",
            "executor",
            json!({ "plan": plan.response, "prompt": prompt }),
            &thread_id,
        );

        // Step 3: executor follows the plan; each tool result lands in the
        // mailbox as it completes. A failing executor does not abort the
        // thread; the planner synthesizes from whatever was recorded.
        let trace = MailboxTrace {
            mailbox: self.mailbox.as_ref(),
            thread_id: &thread_id,
        };
        let mut degraded = false;
        match self
            .executor
            .run_traced(
                &format!(
                    "User request:\n{}\n\nPlan:\n{}\n\nExecute the plan and provide results.",
                    prompt, plan.response
                ),
                Some(&trace),
            )
            .await
        {
            Ok(outcome) => {
                log::info!(
                    "[COORDINATOR] Executor produced result: {} chars",
                    outcome.response.len()
                );
                degraded = outcome.is_degraded();
                self.record(
                    "executor",
                    "planner",
                    json!({ "result": outcome.response }),
                    &thread_id,
                );
            }
            Err(e) => {
                log::error!("[COORDINATOR] Executor failed: {}", e);
                degraded = true;
                self.record(
                    "executor",
                    "planner",
                    json!({ "error": e.to_string() }),
                    &thread_id,
                );
            }
        }

        // Step 4: planner reads the whole thread and writes the final answer
        let digest = self.thread_digest(&thread_id);
        let final_outcome = self
            .planner
            .run_traced(
                &format!(
                    "User request:\n{}\n\nThread history:\n{}\n\nWrite the final response for the user.",
                    prompt, digest
                ),
                None,
            )
            .await?;
        self.record(
            "planner",
            "user",
            json!({ "final": final_outcome.response }),
            &thread_id,
        );

        log::info!(
            "[COORDINATOR] Multi-agent run completed: thread={} final_chars={}",
            thread_id,
            final_outcome.response.len()
        );

        if degraded {
            Ok(RunOutcome::degraded(final_outcome.response))
        } else {
            Ok(final_outcome)
        }
    }
}
