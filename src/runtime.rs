//! Runtime composition.
//!
//! Wires tools, stores, the LLM client, and the agent mode into a single
//! [`PromptRunner`], so the HTTP layer and the CLI share one setup path.

use crate::agents::{
    MultiAgentCoordinator, PromptRunner, RouterAgent, RouterCoordinator, ToolAgent,
};
use crate::ai::gemini::GeminiClient;
use crate::ai::LlmClient;
use crate::config::Config;
use crate::db::Database;
use crate::stores::{SqliteMailboxStore, SqliteMemoryStore};
use crate::tools;
use std::sync::Arc;

const ASSISTANT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the available tools \
     when they help answer the question, and answer concisely.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    Single,
    Multi,
    Router,
}

impl AgentMode {
    /// Unknown values fall back to multi, the most capable path
    pub fn resolve(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "single" => AgentMode::Single,
            "multi" => AgentMode::Multi,
            "router" => AgentMode::Router,
            other => {
                log::warn!("[RUNTIME] Unknown AGENT_MODE '{}'. Fallback to 'multi'.", other);
                AgentMode::Multi
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Single => "single",
            AgentMode::Multi => "multi",
            AgentMode::Router => "router",
        }
    }
}

/// Build the runner for the configured mode.
/// Returns the runner together with the resolved mode so callers can report
/// what actually runs.
pub fn build_runner(
    config: &Config,
    db: Arc<Database>,
) -> Result<(Arc<dyn PromptRunner>, AgentMode), String> {
    let mode = AgentMode::resolve(&config.agent_mode);
    log::info!("[RUNTIME] Building runner: mode={}", mode.as_str());

    let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(
        &config.llm_api_key,
        &config.llm_endpoint,
        &config.model,
    )?);
    let registry = Arc::new(tools::create_default_registry(config));
    log::info!("[RUNTIME] Tool registry initialized: {} tools", registry.len());

    let memory = Arc::new(SqliteMemoryStore::new(db.clone(), config.memory_max_entries));

    let single_agent = || {
        ToolAgent::new(llm.clone(), registry.clone(), config.max_turns)
            .with_system_prompt(ASSISTANT_SYSTEM_PROMPT)
            .with_memory(memory.clone())
    };
    let coordinator = || {
        MultiAgentCoordinator::new(
            llm.clone(),
            registry.clone(),
            Arc::new(SqliteMailboxStore::new(db.clone())),
            config.max_turns,
        )
    };

    let runner: Arc<dyn PromptRunner> = match mode {
        AgentMode::Single => Arc::new(single_agent()),
        AgentMode::Multi => Arc::new(coordinator()),
        AgentMode::Router => Arc::new(RouterCoordinator::new(
            RouterAgent::new(llm.clone()),
            Arc::new(single_agent()),
            Arc::new(coordinator()),
        )),
    };

    log::info!("[RUNTIME] Runner created: {}", mode.as_str());
    Ok((runner, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_resolution() {
        assert_eq!(AgentMode::resolve("single"), AgentMode::Single);
        assert_eq!(AgentMode::resolve("MULTI"), AgentMode::Multi);
        assert_eq!(AgentMode::resolve("router"), AgentMode::Router);
        assert_eq!(AgentMode::resolve("banana"), AgentMode::Multi);
        assert_eq!(AgentMode::resolve(""), AgentMode::Multi);
    }
}
