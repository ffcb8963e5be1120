//! Routing layer that picks an execution path before running anything.
//!
//! The router asks the LLM to classify a prompt as `direct` (single agent,
//! fast path) or `plan` (planner/executor flow, slower but thorough) and
//! delegates accordingly. The model is instructed to answer in JSON but
//! noisy output is tolerated; anything unparseable falls back to `plan`,
//! the path with tool access and a mailbox trace.

use crate::agents::agent::{AgentError, PromptRunner, RunOutcome, ToolAgent};
use crate::ai::LlmClient;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use std::sync::Arc;

const ROUTER_SYSTEM_PROMPT: &str = "You are a router. Decide how to handle the user request. \
     Return JSON only: {\"route\": \"direct\"|\"plan\", \"reason\": \"short explanation\"}. \
     Use 'direct' for simple questions that do not need tools or multi-step planning. \
     Use 'plan' when tools, external data, or multi-step reasoning are likely needed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct,
    Plan,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Direct => "direct",
            Route::Plan => "plan",
        }
    }
}

/// Normalized routing decision, with the raw model output kept for
/// traceability
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub route: Route,
    pub reason: String,
    pub raw: String,
}

fn normalize_route(value: &str) -> Option<Route> {
    match value.trim().to_lowercase().as_str() {
        "direct" | "single" | "fast" => Some(Route::Direct),
        "plan" | "planner" | "multi" | "plan-execute" | "plan_execute" => Some(Route::Plan),
        _ => None,
    }
}

/// Best-effort extraction of a JSON object from model output
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse router model output into a decision. The router is instructed to
/// return JSON but noisy output is tolerated; `None` means the caller must
/// pick the safe fallback.
pub fn parse_router_response(text: &str) -> Option<RouteDecision> {
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(snippet) = extract_json(raw) {
        if let Ok(data) = serde_json::from_str::<serde_json::Value>(snippet) {
            if let Some(route) = data
                .get("route")
                .and_then(|v| v.as_str())
                .and_then(normalize_route)
            {
                let reason = data
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or("No reason provided.")
                    .to_string();
                return Some(RouteDecision {
                    route,
                    reason,
                    raw: raw.to_string(),
                });
            }
        }
    }

    // Fallback keyword detection for non-JSON responses
    let lowered = raw.to_lowercase();
    if lowered.contains("direct") {
        return Some(RouteDecision {
            route: Route::Direct,
            reason: "Fallback: matched keyword 'direct'.".to_string(),
            raw: raw.to_string(),
        });
    }
    if lowered.contains("plan") || lowered.contains("multi") {
        return Some(RouteDecision {
            route: Route::Plan,
            reason: "Fallback: matched keyword 'plan'.".to_string(),
            raw: raw.to_string(),
        });
    }

    None
}

/// LLM-backed router. Tool-free: it only decides on the execution path.
pub struct RouterAgent {
    agent: ToolAgent,
}

impl RouterAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        let agent = ToolAgent::new(llm, Arc::new(ToolRegistry::new()), 1)
            .with_system_prompt(ROUTER_SYSTEM_PROMPT)
            .with_label("router");
        RouterAgent { agent }
    }

    pub async fn decide(&self, prompt: &str) -> Result<RouteDecision, AgentError> {
        let outcome = self
            .agent
            .run_traced(
                &format!("User request:\n{}\n\nReturn routing JSON only.", prompt),
                None,
            )
            .await?;

        let decision = parse_router_response(&outcome.response).unwrap_or_else(|| {
            // Safe default: the plan path is the more capable one
            RouteDecision {
                route: Route::Plan,
                reason: "Fallback: unable to parse router response.".to_string(),
                raw: outcome.response.clone(),
            }
        });
        log::info!(
            "[ROUTER] Decision: route={} reason={}",
            decision.route.as_str(),
            decision.reason
        );
        Ok(decision)
    }
}

/// Routes each prompt to the direct or plan-execute path
pub struct RouterCoordinator {
    router: RouterAgent,
    direct_runner: Arc<dyn PromptRunner>,
    plan_runner: Arc<dyn PromptRunner>,
}

impl RouterCoordinator {
    pub fn new(
        router: RouterAgent,
        direct_runner: Arc<dyn PromptRunner>,
        plan_runner: Arc<dyn PromptRunner>,
    ) -> Self {
        RouterCoordinator {
            router,
            direct_runner,
            plan_runner,
        }
    }
}

#[async_trait]
impl PromptRunner for RouterCoordinator {
    async fn run(&self, prompt: &str) -> Result<RunOutcome, AgentError> {
        let decision = self.router.decide(prompt).await?;
        match decision.route {
            Route::Direct => {
                log::info!("[ROUTER] Routing to direct agent");
                self.direct_runner.run(prompt).await
            }
            Route::Plan => {
                log::info!("[ROUTER] Routing to plan-execute coordinator");
                self.plan_runner.run(prompt).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::agent::tests::ScriptedLlm;
    use crate::ai::types::LlmResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_router_json_direct() {
        let decision =
            parse_router_response(r#"{"route": "direct", "reason": "simple"}"#).unwrap();
        assert_eq!(decision.route, Route::Direct);
        assert!(decision.reason.contains("simple"));
    }

    #[test]
    fn test_parse_router_json_plan_alias() {
        let decision = parse_router_response(r#"{"route": "multi", "reason": "tools"}"#).unwrap();
        assert_eq!(decision.route, Route::Plan);
    }

    #[test]
    fn test_parse_router_json_wrapped_in_prose() {
        let decision = parse_router_response(
            "Sure! Here is my answer:\n{\"route\": \"plan\", \"reason\": \"needs tools\"}\nHope that helps.",
        )
        .unwrap();
        assert_eq!(decision.route, Route::Plan);
        assert_eq!(decision.reason, "needs tools");
    }

    #[test]
    fn test_parse_router_unknown_route_falls_through() {
        // {"route": "maybe"} is not a valid route; keyword fallback does not
        // match either
        assert!(parse_router_response(r#"{"route": "maybe"}"#).is_none());
    }

    #[test]
    fn test_parse_router_fallback_keyword() {
        let decision = parse_router_response("I think this needs a plan with tools.").unwrap();
        assert_eq!(decision.route, Route::Plan);
    }

    #[test]
    fn test_parse_router_failure_returns_none() {
        assert!(parse_router_response("no keywords here").is_none());
        assert!(parse_router_response("").is_none());
    }

    struct CountingRunner {
        calls: AtomicUsize,
        reply: &'static str,
    }

    impl CountingRunner {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(CountingRunner {
                calls: AtomicUsize::new(0),
                reply,
            })
        }
    }

    #[async_trait]
    impl PromptRunner for CountingRunner {
        async fn run(&self, _prompt: &str) -> Result<RunOutcome, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RunOutcome::complete(self.reply.to_string()))
        }
    }

    fn coordinator_with_router_reply(
        reply: &str,
    ) -> (RouterCoordinator, Arc<CountingRunner>, Arc<CountingRunner>) {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(LlmResponse::text(
            reply.to_string(),
        ))]));
        let direct = CountingRunner::new("from direct");
        let plan = CountingRunner::new("from plan");
        let coordinator =
            RouterCoordinator::new(RouterAgent::new(llm), direct.clone(), plan.clone());
        (coordinator, direct, plan)
    }

    #[tokio::test]
    async fn test_direct_decision_delegates_to_single_agent() {
        let (coordinator, direct, plan) =
            coordinator_with_router_reply(r#"{"route":"direct","reason":"weather lookup"}"#);

        let outcome = coordinator.run("capital of France?").await.unwrap();
        assert_eq!(outcome.response, "from direct");
        assert_eq!(direct.calls.load(Ordering::SeqCst), 1);
        assert_eq!(plan.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_decision_defaults_to_plan() {
        let (coordinator, direct, plan) = coordinator_with_router_reply("gibberish ????");

        let outcome = coordinator.run("whatever").await.unwrap();
        assert_eq!(outcome.response, "from plan");
        assert_eq!(direct.calls.load(Ordering::SeqCst), 0);
        assert_eq!(plan.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_route_value_defaults_to_plan() {
        let (coordinator, _direct, plan) =
            coordinator_with_router_reply(r#"{"route": "maybe"}"#);

        coordinator.run("whatever").await.unwrap();
        assert_eq!(plan.calls.load(Ordering::SeqCst), 1);
    }
}
